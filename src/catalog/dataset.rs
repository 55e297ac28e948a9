//! On-disk dataset schema and its normalization into [`StatsCatalog`].

use super::{
    loose_key, slugify, CatalogMetadata, DeltaStat, GameMap, GlobalStat, Hero, HeroId,
    HeroStatRecord, MapId, MatchupStat, Role, StatsCatalog,
};
use crate::error::AppError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const COMBINED_FILE: &str = "hero_data_combined.json";
pub const HEROES_FILE: &str = "heroes.json";
pub const MAPS_FILE: &str = "maps.json";

/// Accepts JSON numbers, numeric strings and null. Provider exports are not consistent.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(NumberOrText::Number(n)) => Ok(n),
        Some(NumberOrText::Text(text)) => {
            let text = text.trim().trim_end_matches('%');
            if text.is_empty() {
                Ok(0.0)
            } else {
                text.parse::<f64>().map_err(serde::de::Error::custom)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaRecord {
    #[serde(default, deserialize_with = "lenient_number")]
    pub games: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub wins: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub losses: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub win_rate: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub delta: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lower_confidence_delta: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub upper_confidence_delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_adjusted_delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bans: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ban_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_rate: Option<f64>,
}

impl DeltaRecord {
    fn game_count(&self) -> u32 {
        let games = if self.games > 0.0 {
            self.games
        } else {
            self.wins + self.losses
        };
        games.max(0.0).round() as u32
    }

    fn scoring_delta(&self) -> f64 {
        self.confidence_adjusted_delta.unwrap_or(self.delta)
    }

    fn to_delta_stat(&self) -> Option<DeltaStat> {
        let games = self.game_count();
        if games == 0 {
            return None;
        }
        Some(DeltaStat {
            win_rate: self.win_rate,
            delta: self.scoring_delta(),
            games,
        })
    }

    fn to_global_stat(&self) -> GlobalStat {
        GlobalStat {
            win_rate: self.win_rate,
            delta: self.scoring_delta(),
            games: self.game_count(),
            popularity: self.popularity.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchupRecord {
    #[serde(default, alias = "as_ally", skip_serializing_if = "Option::is_none")]
    pub ally: Option<DeltaRecord>,
    #[serde(default, alias = "as_enemy", skip_serializing_if = "Option::is_none")]
    pub enemy: Option<DeltaRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedHero {
    pub global: DeltaRecord,
    #[serde(default, alias = "per_map")]
    pub maps: BTreeMap<String, DeltaRecord>,
    #[serde(default)]
    pub matchups: BTreeMap<String, MatchupRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedMetadata {
    #[serde(default)]
    pub stats_patch: Option<String>,
    #[serde(default)]
    pub matchups_patch: Option<String>,
    #[serde(default)]
    pub game_type: Option<String>,
    #[serde(default)]
    pub confidence_level: Option<f64>,
    #[serde(default)]
    pub z_score: Option<f64>,
    #[serde(default)]
    pub min_games_threshold: Option<u32>,
    #[serde(default)]
    pub max_delta_cap: Option<f64>,
    #[serde(default)]
    pub combined_at: Option<String>,
}

/// `hero_data_combined.json`, keyed by hero display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedDataset {
    #[serde(default)]
    pub metadata: CombinedMetadata,
    pub heroes: BTreeMap<String, CombinedHero>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeroEntry {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, alias = "new_role")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapEntry {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::JsonError(format!("Failed to parse {}: {}", path.display(), e)))
}

fn read_optional_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, AppError> {
    if !path.exists() {
        debug!("{} not present, deriving registry from stats", path.display());
        return Ok(None);
    }
    read_json(path).map(Some)
}

pub fn load_catalog(dir: &Path) -> Result<StatsCatalog, AppError> {
    let dataset: CombinedDataset = read_json(&dir.join(COMBINED_FILE))?;
    let heroes: Option<Vec<HeroEntry>> = read_optional_json(&dir.join(HEROES_FILE))?;
    let maps: Option<Vec<MapEntry>> = read_optional_json(&dir.join(MAPS_FILE))?;

    let catalog = build_catalog(
        dataset,
        heroes.unwrap_or_default(),
        maps.unwrap_or_default(),
    );
    info!(
        "Loaded catalog: {} heroes, {} maps from {}",
        catalog.list_heroes().len(),
        catalog.list_maps().len(),
        dir.display()
    );
    Ok(catalog)
}

/// Name-keyed registry that hands out ids, registering unknown names on first sight.
struct Registry<T> {
    items: Vec<T>,
    by_key: HashMap<String, usize>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Registry {
            items: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    fn find(&self, name: &str) -> Option<&T> {
        self.by_key.get(&loose_key(name)).map(|&idx| &self.items[idx])
    }

    fn insert(&mut self, keys: &[&str], item: T) {
        let idx = self.items.len();
        self.items.push(item);
        for key in keys {
            self.by_key.entry(loose_key(key)).or_insert(idx);
        }
    }
}

pub fn build_catalog(
    dataset: CombinedDataset,
    hero_entries: Vec<HeroEntry>,
    map_entries: Vec<MapEntry>,
) -> StatsCatalog {
    let mut heroes: Registry<Hero> = Registry::new();
    for entry in hero_entries {
        if heroes.find(&entry.name).is_some() {
            continue;
        }
        let id = entry
            .slug
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| slugify(&entry.name));
        let role = entry.role.as_deref().and_then(|r| match r.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                debug!("Unknown role '{}' for {}", r, entry.name);
                None
            }
        });
        let hero = Hero {
            id: id.clone(),
            name: entry.name.clone(),
            role,
        };
        heroes.insert(&[entry.name.as_str(), id.as_str()], hero);
    }

    let mut maps: Registry<GameMap> = Registry::new();
    for entry in map_entries {
        if maps.find(&entry.name).is_some() {
            continue;
        }
        let id = entry
            .slug
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| slugify(&entry.name));
        let map = GameMap {
            id: id.clone(),
            name: entry.name.clone(),
        };
        maps.insert(&[entry.name.as_str(), id.as_str()], map);
    }

    // Every hero with stats needs an id before matchups can be resolved.
    for name in dataset.heroes.keys() {
        if heroes.find(name).is_none() {
            let id = slugify(name);
            heroes.insert(
                &[name.as_str(), id.as_str()],
                Hero {
                    id: id.clone(),
                    name: name.clone(),
                    role: None,
                },
            );
        }
    }

    let mut records: HashMap<HeroId, HeroStatRecord> = HashMap::new();
    for (name, hero) in &dataset.heroes {
        let Some(hero_id) = heroes.find(name).map(|h| h.id.clone()) else {
            continue;
        };

        let mut per_map: HashMap<MapId, DeltaStat> = HashMap::new();
        for (map_name, record) in &hero.maps {
            let map_id = match maps.find(map_name) {
                Some(map) => map.id.clone(),
                None => {
                    let id = slugify(map_name);
                    maps.insert(
                        &[map_name.as_str(), id.as_str()],
                        GameMap {
                            id: id.clone(),
                            name: map_name.clone(),
                        },
                    );
                    id
                }
            };
            if let Some(stat) = record.to_delta_stat() {
                per_map.insert(map_id, stat);
            }
        }

        let mut matchups: HashMap<HeroId, MatchupStat> = HashMap::new();
        for (other_name, matchup) in &hero.matchups {
            let Some(other) = heroes.find(other_name) else {
                warn!("Skipping matchup {} vs unknown hero {}", name, other_name);
                continue;
            };
            let stat = MatchupStat {
                as_enemy: matchup.enemy.as_ref().and_then(DeltaRecord::to_delta_stat),
                as_ally: matchup.ally.as_ref().and_then(DeltaRecord::to_delta_stat),
            };
            if stat.as_enemy.is_some() || stat.as_ally.is_some() {
                matchups.insert(other.id.clone(), stat);
            }
        }

        records.insert(
            hero_id,
            HeroStatRecord {
                global: hero.global.to_global_stat(),
                per_map,
                matchups,
            },
        );
    }

    let metadata = CatalogMetadata {
        stats_patch: dataset.metadata.stats_patch.clone(),
        game_type: dataset.metadata.game_type.clone(),
    };
    StatsCatalog::from_parts(heroes.items, maps.items, records).with_metadata(metadata)
}
