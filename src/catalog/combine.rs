//! Builds the combined dataset from raw win/loss counts.
//!
//! Every win rate becomes a delta against a baseline (50% for the global
//! record, the hero's own global win rate for maps and matchups). Alongside the
//! raw delta we keep the bounds of a Wilson score interval and a
//! confidence-adjusted delta: whichever of the three sits closest to zero.
//! Small samples therefore regress toward "no effect".

use super::dataset::{
    lenient_number, CombinedDataset, CombinedHero, CombinedMetadata, DeltaRecord, MatchupRecord,
};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const GLOBAL_BASELINE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombineOptions {
    pub confidence_level: f64,
    pub min_games: u32,
    pub max_delta: f64,
}

impl Default for CombineOptions {
    fn default() -> Self {
        CombineOptions {
            confidence_level: 0.80,
            min_games: 100,
            max_delta: 5.0,
        }
    }
}

impl CombineOptions {
    pub fn z_score(&self) -> f64 {
        z_score_for(self.confidence_level)
    }
}

pub fn z_score_for(confidence_level: f64) -> f64 {
    const TABLE: [(f64, f64); 5] = [
        (0.80, 1.282),
        (0.85, 1.440),
        (0.90, 1.645),
        (0.95, 1.960),
        (0.99, 2.576),
    ];
    TABLE
        .iter()
        .find(|(level, _)| (level - confidence_level).abs() < 1e-9)
        .map(|&(_, z)| z)
        .unwrap_or(1.282)
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCounts {
    #[serde(default, deserialize_with = "lenient_number")]
    pub wins: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub losses: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub bans: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub ban_rate: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub popularity: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub pick_rate: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetadata {
    #[serde(default)]
    pub minor_patch: Option<String>,
    #[serde(default)]
    pub game_type: Option<String>,
    #[serde(default)]
    pub fetched_at: Option<String>,
}

/// `hero_stats.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHeroStats {
    #[serde(default)]
    pub metadata: RawMetadata,
    #[serde(default)]
    pub global_stats: BTreeMap<String, RawCounts>,
    /// map name -> hero name -> counts
    #[serde(default)]
    pub map_stats: BTreeMap<String, BTreeMap<String, RawCounts>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAllyCounts {
    #[serde(default, deserialize_with = "lenient_number")]
    pub wins_with: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub losses_with: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEnemyCounts {
    #[serde(default, deserialize_with = "lenient_number")]
    pub wins_against: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub losses_against: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPairCounts {
    #[serde(default)]
    pub ally: RawAllyCounts,
    #[serde(default)]
    pub enemy: RawEnemyCounts,
}

/// `hero_matchups.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMatchups {
    #[serde(default)]
    pub metadata: RawMetadata,
    /// hero name -> other hero name -> counts
    #[serde(default)]
    pub matchups: BTreeMap<String, BTreeMap<String, RawPairCounts>>,
}

/// Wilson score interval as percentages: `(win_rate, lower, upper)`.
pub fn wilson_interval(wins: u32, total: u32, z: f64) -> (f64, f64, f64) {
    if total == 0 {
        return (50.0, 50.0, 50.0);
    }
    let n = total as f64;
    let p = wins as f64 / n;
    let z2 = z * z;

    let denominator = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denominator;
    let margin = z * ((p * (1.0 - p) / n) + z2 / (4.0 * n * n)).sqrt() / denominator;

    let lower = (center - margin).max(0.0);
    let upper = (center + margin).min(1.0);
    (p * 100.0, lower * 100.0, upper * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn closest_to_zero(values: [f64; 3]) -> f64 {
    values
        .into_iter()
        .fold(values[0], |best, v| if v.abs() < best.abs() { v } else { best })
}

/// Delta record for `wins` out of `total` against `baseline`.
///
/// Below `min_games` (or with no games) the record is neutral. `max_delta` caps
/// every delta symmetrically when given.
pub fn delta_with_confidence(
    wins: u32,
    total: u32,
    baseline: f64,
    z: f64,
    min_games: u32,
    max_delta: Option<f64>,
) -> DeltaRecord {
    if total == 0 || total < min_games {
        return DeltaRecord {
            games: total as f64,
            wins: wins as f64,
            losses: total.saturating_sub(wins) as f64,
            win_rate: baseline,
            confidence_adjusted_delta: Some(0.0),
            ..DeltaRecord::default()
        };
    }

    let (win_rate, lower, upper) = wilson_interval(wins, total, z);
    let mut delta = win_rate - baseline;
    let mut lower_delta = lower - baseline;
    let mut upper_delta = upper - baseline;
    let mut adjusted = closest_to_zero([delta, lower_delta, upper_delta]);

    if let Some(cap) = max_delta {
        delta = delta.clamp(-cap, cap);
        lower_delta = lower_delta.clamp(-cap, cap);
        upper_delta = upper_delta.clamp(-cap, cap);
        adjusted = adjusted.clamp(-cap, cap);
    }

    DeltaRecord {
        games: total as f64,
        wins: wins as f64,
        losses: (total - wins) as f64,
        win_rate: round2(win_rate),
        delta: round2(delta),
        lower_confidence_delta: round2(lower_delta),
        upper_confidence_delta: round2(upper_delta),
        confidence_adjusted_delta: Some(round2(adjusted)),
        ..DeltaRecord::default()
    }
}

fn counts(wins: f64, losses: f64) -> (u32, u32) {
    let wins = wins.max(0.0).round() as u32;
    let losses = losses.max(0.0).round() as u32;
    (wins, wins + losses)
}

fn with_extras(mut record: DeltaRecord, raw: &RawCounts) -> DeltaRecord {
    record.bans = Some(raw.bans);
    record.ban_rate = Some(raw.ban_rate);
    record.popularity = Some(raw.popularity);
    record.pick_rate = Some(raw.pick_rate);
    record
}

pub fn combine(stats: &RawHeroStats, matchups: &RawMatchups, options: &CombineOptions) -> CombinedDataset {
    let z = options.z_score();
    let mut heroes: BTreeMap<String, CombinedHero> = BTreeMap::new();

    for (hero_name, raw_global) in &stats.global_stats {
        debug!("Combining {}", hero_name);
        let (wins, games) = counts(raw_global.wins, raw_global.losses);
        let global = with_extras(
            delta_with_confidence(wins, games, GLOBAL_BASELINE, z, 0, None),
            raw_global,
        );
        let global_wr = global.win_rate;

        let mut maps = BTreeMap::new();
        for (map_name, map_heroes) in &stats.map_stats {
            if let Some(raw) = map_heroes.get(hero_name) {
                let (wins, games) = counts(raw.wins, raw.losses);
                let record = delta_with_confidence(wins, games, global_wr, z, 0, None);
                maps.insert(map_name.clone(), with_extras(record, raw));
            }
        }

        let mut hero_matchups = BTreeMap::new();
        if let Some(pairs) = matchups.matchups.get(hero_name) {
            for (other_name, pair) in pairs {
                let (ally_wins, ally_games) = counts(pair.ally.wins_with, pair.ally.losses_with);
                let (enemy_wins, enemy_games) =
                    counts(pair.enemy.wins_against, pair.enemy.losses_against);
                hero_matchups.insert(
                    other_name.clone(),
                    MatchupRecord {
                        ally: Some(delta_with_confidence(
                            ally_wins,
                            ally_games,
                            global_wr,
                            z,
                            options.min_games,
                            Some(options.max_delta),
                        )),
                        enemy: Some(delta_with_confidence(
                            enemy_wins,
                            enemy_games,
                            global_wr,
                            z,
                            options.min_games,
                            Some(options.max_delta),
                        )),
                    },
                );
            }
        }

        heroes.insert(
            hero_name.clone(),
            CombinedHero {
                global,
                maps,
                matchups: hero_matchups,
            },
        );
    }

    CombinedDataset {
        metadata: CombinedMetadata {
            stats_patch: stats.metadata.minor_patch.clone(),
            matchups_patch: matchups.metadata.minor_patch.clone(),
            game_type: Some(
                stats
                    .metadata
                    .game_type
                    .clone()
                    .unwrap_or_else(|| "Storm League".to_string()),
            ),
            confidence_level: Some(options.confidence_level),
            z_score: Some(z),
            min_games_threshold: Some(options.min_games),
            max_delta_cap: Some(options.max_delta),
            combined_at: stats.metadata.fetched_at.clone(),
        },
        heroes,
    }
}

/// Reads the two raw exports, combines them and writes pretty JSON to `output`.
pub fn combine_files(
    stats_path: &Path,
    matchups_path: &Path,
    output_path: &Path,
    options: &CombineOptions,
) -> Result<CombinedDataset, AppError> {
    let stats: RawHeroStats = serde_json::from_str(&fs::read_to_string(stats_path)?)
        .map_err(|e| AppError::JsonError(format!("Failed to parse {}: {}", stats_path.display(), e)))?;
    let matchups: RawMatchups = serde_json::from_str(&fs::read_to_string(matchups_path)?)
        .map_err(|e| {
            AppError::JsonError(format!("Failed to parse {}: {}", matchups_path.display(), e))
        })?;

    let combined = combine(&stats, &matchups, options);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(&combined)
        .map_err(|e| AppError::JsonError(format!("Failed to serialize combined data: {}", e)))?;
    fs::write(output_path, json)?;

    info!(
        "Combined {} heroes into {}",
        combined.heroes.len(),
        output_path.display()
    );
    Ok(combined)
}
