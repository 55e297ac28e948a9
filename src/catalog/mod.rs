//! Read-only hero, map and matchup statistics for a draft session.
//!
//! Everything here is normalized at load time: names are resolved to ids and
//! every delta is the confidence-adjusted value, so scoring never has to care
//! which variant of the dataset it came from.

pub mod combine;
pub mod dataset;

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub type HeroId = String;
pub type MapId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Tank,
    Bruiser,
    Healer,
    Support,
    RangedAssassin,
    MeleeAssassin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Tank,
        Role::Bruiser,
        Role::Healer,
        Role::Support,
        Role::RangedAssassin,
        Role::MeleeAssassin,
    ];
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "tank" => Ok(Role::Tank),
            "bruiser" => Ok(Role::Bruiser),
            "healer" => Ok(Role::Healer),
            "support" => Ok(Role::Support),
            "rangedassassin" | "ranged" => Ok(Role::RangedAssassin),
            "meleeassassin" | "melee" => Ok(Role::MeleeAssassin),
            _ => Err(AppError::NotFoundInCatalog(format!("role {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Tank => "Tank",
            Role::Bruiser => "Bruiser",
            Role::Healer => "Healer",
            Role::Support => "Support",
            Role::RangedAssassin => "Ranged Assassin",
            Role::MeleeAssassin => "Melee Assassin",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    pub id: HeroId,
    pub name: String,
    pub role: Option<Role>,
}

impl Hero {
    pub fn new(id: &str, name: &str, role: Option<Role>) -> Self {
        Hero {
            id: id.to_string(),
            name: name.to_string(),
            role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMap {
    pub id: MapId,
    pub name: String,
}

impl GameMap {
    pub fn new(id: &str, name: &str) -> Self {
        GameMap {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Win rate over some sample plus its delta from the relevant baseline, in percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeltaStat {
    pub win_rate: f64,
    pub delta: f64,
    pub games: u32,
}

impl DeltaStat {
    pub fn new(delta: f64, games: u32) -> Self {
        DeltaStat {
            win_rate: 50.0 + delta,
            delta,
            games,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GlobalStat {
    pub win_rate: f64,
    pub delta: f64,
    pub games: u32,
    pub popularity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchupStat {
    pub as_enemy: Option<DeltaStat>,
    pub as_ally: Option<DeltaStat>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeroStatRecord {
    pub global: GlobalStat,
    pub per_map: HashMap<MapId, DeltaStat>,
    pub matchups: HashMap<HeroId, MatchupStat>,
}

impl HeroStatRecord {
    pub fn with_global(delta: f64, games: u32) -> Self {
        HeroStatRecord {
            global: GlobalStat {
                win_rate: 50.0 + delta,
                delta,
                games,
                popularity: 0.0,
            },
            ..HeroStatRecord::default()
        }
    }

    pub fn on_map(mut self, map_id: &str, delta: f64) -> Self {
        self.per_map
            .insert(map_id.to_string(), DeltaStat::new(delta, 1000));
        self
    }

    pub fn vs_enemy(mut self, enemy_id: &str, delta: f64) -> Self {
        self.matchups.entry(enemy_id.to_string()).or_default().as_enemy =
            Some(DeltaStat::new(delta, 1000));
        self
    }

    pub fn with_ally(mut self, ally_id: &str, delta: f64) -> Self {
        self.matchups.entry(ally_id.to_string()).or_default().as_ally =
            Some(DeltaStat::new(delta, 1000));
        self
    }

    pub fn map_delta(&self, map_id: &str) -> Option<f64> {
        self.per_map.get(map_id).map(|s| s.delta)
    }

    pub fn enemy_delta(&self, enemy_id: &str) -> Option<f64> {
        self.matchups
            .get(enemy_id)
            .and_then(|m| m.as_enemy)
            .map(|s| s.delta)
    }

    pub fn ally_delta(&self, ally_id: &str) -> Option<f64> {
        self.matchups
            .get(ally_id)
            .and_then(|m| m.as_ally)
            .map(|s| s.delta)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub stats_patch: Option<String>,
    pub game_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StatsCatalog {
    heroes: Vec<Hero>,
    maps: Vec<GameMap>,
    records: HashMap<HeroId, HeroStatRecord>,
    metadata: CatalogMetadata,
}

impl StatsCatalog {
    pub fn from_parts(
        mut heroes: Vec<Hero>,
        mut maps: Vec<GameMap>,
        records: HashMap<HeroId, HeroStatRecord>,
    ) -> Self {
        heroes.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        maps.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        StatsCatalog {
            heroes,
            maps,
            records,
            metadata: CatalogMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: CatalogMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Loads the combined dataset plus the optional hero and map registries from `dir`.
    pub fn load(dir: &Path) -> Result<Self, AppError> {
        dataset::load_catalog(dir)
    }

    pub fn hero_record(&self, hero_id: &str) -> Result<&HeroStatRecord, AppError> {
        self.records
            .get(hero_id)
            .ok_or_else(|| AppError::NotFoundInCatalog(format!("hero {}", hero_id)))
    }

    /// Lookup for scoring: absent records simply contribute nothing.
    pub fn record(&self, hero_id: &str) -> Option<&HeroStatRecord> {
        self.records.get(hero_id)
    }

    pub fn list_heroes(&self) -> &[Hero] {
        &self.heroes
    }

    pub fn list_maps(&self) -> &[GameMap] {
        &self.maps
    }

    pub fn metadata(&self) -> &CatalogMetadata {
        &self.metadata
    }

    pub fn hero(&self, hero_id: &str) -> Option<&Hero> {
        self.heroes.iter().find(|h| h.id == hero_id)
    }

    pub fn map(&self, map_id: &str) -> Option<&GameMap> {
        self.maps.iter().find(|m| m.id == map_id)
    }

    pub fn hero_name<'a>(&'a self, hero_id: &'a str) -> &'a str {
        self.hero(hero_id).map(|h| h.name.as_str()).unwrap_or(hero_id)
    }

    pub fn map_name<'a>(&'a self, map_id: &'a str) -> &'a str {
        self.map(map_id).map(|m| m.name.as_str()).unwrap_or(map_id)
    }

    /// Accepts an id, a display name (any case) or a loose slug such as `liming`.
    pub fn resolve_hero(&self, query: &str) -> Option<&Hero> {
        let query = query.trim();
        let key = loose_key(query);
        self.hero(query).or_else(|| {
            self.heroes.iter().find(|h| {
                h.name.eq_ignore_ascii_case(query) || loose_key(&h.name) == key || loose_key(&h.id) == key
            })
        })
    }

    pub fn resolve_map(&self, query: &str) -> Option<&GameMap> {
        let query = query.trim();
        let key = loose_key(query);
        self.map(query).or_else(|| {
            self.maps.iter().find(|m| {
                m.name.eq_ignore_ascii_case(query) || loose_key(&m.name) == key || loose_key(&m.id) == key
            })
        })
    }

    pub fn require_hero(&self, query: &str) -> Result<&Hero, AppError> {
        self.resolve_hero(query)
            .ok_or_else(|| AppError::NotFoundInCatalog(format!("hero {}", query)))
    }

    pub fn require_map(&self, query: &str) -> Result<&GameMap, AppError> {
        self.resolve_map(query)
            .ok_or_else(|| AppError::NotFoundInCatalog(format!("map {}", query)))
    }
}

/// Lowercase alphanumerics only: `"Li-Ming"`, `"li-ming"` and `"liming"` all agree.
pub fn loose_key(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Id for names that arrive without a slug: lowercase words joined by dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if (c == ' ' || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_catalog;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Cursed Hollow"), "cursed-hollow");
        assert_eq!(slugify("Anub'arak"), "anubarak");
        assert_eq!(slugify("Lt. Morales"), "lt-morales");
        assert_eq!(slugify("Li-Ming"), "li-ming");
    }

    #[test]
    fn test_resolve_hero_by_id_name_and_slug() {
        let catalog = sample_catalog();
        assert_eq!(catalog.resolve_hero("jaina").unwrap().id, "jaina");
        assert_eq!(catalog.resolve_hero("LI LI").unwrap().id, "lili");
        assert_eq!(catalog.resolve_hero("Li-Li").unwrap().id, "lili");
        assert!(catalog.resolve_hero("Nobody").is_none());
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let catalog = sample_catalog();
        assert!(matches!(
            catalog.hero_record("nobody"),
            Err(AppError::NotFoundInCatalog(_))
        ));
        assert!(catalog.record("nobody").is_none());
    }

    #[test]
    fn test_heroes_listed_by_name() {
        let catalog = sample_catalog();
        let names: Vec<&str> = catalog.list_heroes().iter().map(|h| h.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort_by_key(|n| n.to_lowercase());
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Ranged Assassin".parse::<Role>().unwrap(), Role::RangedAssassin);
        assert_eq!("healer".parse::<Role>().unwrap(), Role::Healer);
        assert!("Specialist".parse::<Role>().is_err());
    }
}
