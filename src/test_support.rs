//! Fixtures shared by the unit tests.

use crate::analysis::profile_store::{
    GameTypeBucket, HeroPerformance, PlayerProfile, ProfileFetcher,
};
use crate::catalog::{GameMap, Hero, HeroStatRecord, Role, StatsCatalog};
use crate::error::AppError;
use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

/// Seven heroes and two maps with hand-picked deltas.
pub(crate) fn sample_catalog() -> StatsCatalog {
    let heroes = vec![
        Hero::new("jaina", "Jaina", Some(Role::RangedAssassin)),
        Hero::new("lili", "Li Li", Some(Role::Healer)),
        Hero::new("valla", "Valla", Some(Role::RangedAssassin)),
        Hero::new("muradin", "Muradin", Some(Role::Tank)),
        Hero::new("hero-a", "Hero A", Some(Role::Bruiser)),
        Hero::new("hero-b", "Hero B", Some(Role::Support)),
        Hero::new("abathur", "Abathur", None),
    ];
    let maps = vec![
        GameMap::new("cursed-hollow", "Cursed Hollow"),
        GameMap::new("towers-of-doom", "Towers of Doom"),
    ];

    let mut records = HashMap::new();
    records.insert(
        "jaina".to_string(),
        HeroStatRecord::with_global(1.0, 50_000)
            .on_map("cursed-hollow", -1.0)
            .vs_enemy("muradin", 3.5)
            .vs_enemy("valla", -4.0)
            .with_ally("lili", 3.0)
            .with_ally("muradin", 1.5),
    );
    records.insert(
        "lili".to_string(),
        HeroStatRecord::with_global(3.5, 40_000).vs_enemy("jaina", -2.0),
    );
    records.insert(
        "valla".to_string(),
        HeroStatRecord::with_global(-0.5, 60_000)
            .on_map("towers-of-doom", 2.0)
            .vs_enemy("jaina", 4.0),
    );
    records.insert("muradin".to_string(), HeroStatRecord::with_global(1.5, 45_000));
    records.insert(
        "hero-a".to_string(),
        HeroStatRecord::with_global(2.0, 20_000).on_map("cursed-hollow", 4.0),
    );
    records.insert("hero-b".to_string(), HeroStatRecord::with_global(0.5, 20_000));

    StatsCatalog::from_parts(heroes, maps, records)
}

/// Ranked-bucket profile from `(hero, games, win rate %)` rows.
pub(crate) fn profile(identifier: &str, rows: &[(&str, u32, f64)]) -> PlayerProfile {
    let mut p = PlayerProfile::new(identifier);
    for &(hero, games, win_rate) in rows {
        let wins = (games as f64 * win_rate / 100.0).round() as u32;
        p.add_record(
            GameTypeBucket::Ranked,
            hero,
            HeroPerformance {
                wins,
                losses: games - wins,
                games_played: games,
                win_rate,
                mmr: None,
            },
        );
    }
    p
}

/// In-memory fetcher. Unknown identifiers get an empty profile.
#[derive(Debug, Default)]
pub(crate) struct StubFetcher {
    profiles: HashMap<String, PlayerProfile>,
    failing: HashSet<String>,
    delays: HashMap<String, u64>,
}

impl StubFetcher {
    pub(crate) fn with_profile(mut self, profile: PlayerProfile) -> Self {
        self.profiles.insert(profile.identifier().to_string(), profile);
        self
    }

    pub(crate) fn failing(mut self, identifier: &str) -> Self {
        self.failing.insert(identifier.to_string());
        self
    }

    pub(crate) fn with_delay(mut self, identifier: &str, millis: u64) -> Self {
        self.delays.insert(identifier.to_string(), millis);
        self
    }
}

impl ProfileFetcher for StubFetcher {
    fn fetch_profile(&self, identifier: &str, _catalog: &StatsCatalog) -> Result<PlayerProfile, AppError> {
        if let Some(millis) = self.delays.get(identifier) {
            thread::sleep(Duration::from_millis(*millis));
        }
        if self.failing.contains(identifier) {
            return Err(AppError::ProfileFetch {
                identifier: identifier.to_string(),
                reason: "stub failure".to_string(),
            });
        }
        Ok(self
            .profiles
            .get(identifier)
            .cloned()
            .unwrap_or_else(|| PlayerProfile::new(identifier)))
    }
}
