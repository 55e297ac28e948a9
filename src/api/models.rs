use crate::analysis::profile_store::{GameTypeBucket, HeroPerformance, PlayerProfile};
use crate::catalog::dataset::lenient_number;
use crate::catalog::{slugify, StatsCatalog};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

// Player/Hero/All response: game type -> hero name -> stats, plus an optional MMR block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerHeroesResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_mmr: Option<serde_json::Value>,
    #[serde(flatten)]
    pub game_types: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeroPerformanceDto {
    #[serde(default, deserialize_with = "lenient_number")]
    pub wins: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub losses: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub games_played: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub win_rate: f64,
    #[serde(default, alias = "player_mmr", deserialize_with = "lenient_number")]
    pub mmr: f64,
}

impl HeroPerformanceDto {
    pub fn to_performance(&self) -> HeroPerformance {
        let wins = self.wins.max(0.0).round() as u32;
        let losses = self.losses.max(0.0).round() as u32;
        let games_played = (self.games_played.max(0.0).round() as u32).max(wins + losses);
        let win_rate = if self.win_rate > 0.0 || games_played == 0 {
            self.win_rate
        } else {
            wins as f64 / games_played as f64 * 100.0
        };
        HeroPerformance {
            wins,
            losses,
            games_played,
            win_rate,
            mmr: (self.mmr > 0.0).then_some(self.mmr),
        }
    }
}

impl PlayerHeroesResponse {
    /// Folds the per-game-type tables into the two buckets, resolving hero names
    /// through the catalog. Unsupported game types are skipped; heroes the catalog
    /// doesn't know keep a slug of their name.
    pub fn into_profile(self, identifier: &str, catalog: &StatsCatalog) -> PlayerProfile {
        let mut profile = PlayerProfile::new(identifier);

        for (game_type, table) in self.game_types {
            let Some(bucket) = GameTypeBucket::from_game_type(&game_type) else {
                debug!("Skipping game type {} for {}", game_type, identifier);
                continue;
            };
            let heroes: BTreeMap<String, HeroPerformanceDto> = match serde_json::from_value(table) {
                Ok(heroes) => heroes,
                Err(e) => {
                    warn!("Unreadable {} stats for {}: {}", game_type, identifier, e);
                    continue;
                }
            };
            for (hero_name, dto) in heroes {
                let hero_id = match catalog.resolve_hero(&hero_name) {
                    Some(hero) => hero.id.clone(),
                    None => {
                        debug!("Unknown hero '{}' in profile of {}", hero_name, identifier);
                        slugify(&hero_name)
                    }
                };
                profile.add_record(bucket, &hero_id, dto.to_performance());
            }
        }

        if let Some(mmr) = self.player_mmr {
            profile.set_player_mmr(mmr);
        }
        profile
    }
}
