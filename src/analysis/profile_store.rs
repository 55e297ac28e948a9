use crate::catalog::{HeroId, StatsCatalog};
use crate::draft::{DraftState, TeamSide, TEAM_SIZE};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::thread;
use tracing::{debug, info, warn};

/// Personal stats only count once a player has this many games on a hero.
pub const MIN_HERO_GAMES: u32 = 25;
/// Personal deltas are capped so small samples can't outweigh the aggregate data.
pub const MAX_PLAYER_DELTA: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GameTypeBucket {
    Casual,
    Ranked,
}

impl GameTypeBucket {
    /// Ranked first: it wins ties on game count.
    pub const PREFERENCE: [GameTypeBucket; 2] = [GameTypeBucket::Ranked, GameTypeBucket::Casual];

    pub fn from_game_type(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "storm league" | "hero league" | "team league" => Some(GameTypeBucket::Ranked),
            "quick match" | "unranked draft" => Some(GameTypeBucket::Casual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeroPerformance {
    pub wins: u32,
    pub losses: u32,
    pub games_played: u32,
    /// Percentage, 0-100.
    pub win_rate: f64,
    pub mmr: Option<f64>,
}

impl HeroPerformance {
    pub fn from_record(wins: u32, losses: u32) -> Self {
        let games = wins + losses;
        HeroPerformance {
            wins,
            losses,
            games_played: games,
            win_rate: if games == 0 {
                0.0
            } else {
                wins as f64 / games as f64 * 100.0
            },
            mmr: None,
        }
    }

    pub fn games(&self) -> u32 {
        self.games_played.max(self.wins + self.losses)
    }

    pub fn merge(&mut self, other: &HeroPerformance) {
        let (mine, theirs) = (self.games(), other.games());
        self.mmr = match (self.mmr, other.mmr) {
            (Some(a), Some(b)) => Some(if theirs > mine { b } else { a }),
            (a, b) => a.or(b),
        };
        let total = mine + theirs;
        if total > 0 {
            self.win_rate = (self.win_rate * mine as f64 + other.win_rate * theirs as f64) / total as f64;
        }
        self.wins += other.wins;
        self.losses += other.losses;
        self.games_played = total;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProfile {
    identifier: String,
    buckets: BTreeMap<GameTypeBucket, HashMap<HeroId, HeroPerformance>>,
    player_mmr: Option<serde_json::Value>,
}

impl PlayerProfile {
    pub fn new(identifier: &str) -> Self {
        PlayerProfile {
            identifier: identifier.to_string(),
            buckets: BTreeMap::new(),
            player_mmr: None,
        }
    }

    /// Adds a record, summing with whatever the bucket already holds for that hero.
    pub fn with_record(mut self, bucket: GameTypeBucket, hero_id: &str, record: HeroPerformance) -> Self {
        self.add_record(bucket, hero_id, record);
        self
    }

    pub fn add_record(&mut self, bucket: GameTypeBucket, hero_id: &str, record: HeroPerformance) {
        let heroes = self.buckets.entry(bucket).or_default();
        match heroes.get_mut(hero_id) {
            Some(existing) => existing.merge(&record),
            None => {
                heroes.insert(hero_id.to_string(), record);
            }
        }
    }

    pub fn set_player_mmr(&mut self, block: serde_json::Value) {
        self.player_mmr = Some(block);
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn record(&self, bucket: GameTypeBucket, hero_id: &str) -> Option<&HeroPerformance> {
        self.buckets.get(&bucket).and_then(|heroes| heroes.get(hero_id))
    }

    pub fn bucket(&self, bucket: GameTypeBucket) -> Option<&HashMap<HeroId, HeroPerformance>> {
        self.buckets.get(&bucket)
    }

    pub fn player_mmr(&self) -> Option<&serde_json::Value> {
        self.player_mmr.as_ref()
    }

    /// Best-effort read of `player_mmr[game_type].mmr`.
    pub fn mmr_for(&self, game_type: &str) -> Option<f64> {
        let entry = self.player_mmr.as_ref()?.get(game_type)?;
        let mmr = entry.get("mmr").unwrap_or(entry);
        mmr.as_f64()
            .or_else(|| mmr.as_str().and_then(|s| s.trim().parse().ok()))
    }
}

/// The player's win rate minus 50 on `hero_id`, clamped to ±5.
///
/// Zero unless some bucket has at least 25 games; otherwise taken from the
/// bucket with the most games.
pub fn min_games_hero_win_rate_delta(profile: &PlayerProfile, hero_id: &str) -> f64 {
    let mut best: Option<&HeroPerformance> = None;
    for bucket in GameTypeBucket::PREFERENCE {
        if let Some(record) = profile.record(bucket, hero_id) {
            if best.map_or(true, |b| record.games() > b.games()) {
                best = Some(record);
            }
        }
    }

    match best {
        Some(record) if record.games() >= MIN_HERO_GAMES => {
            (record.win_rate - 50.0).clamp(-MAX_PLAYER_DELTA, MAX_PLAYER_DELTA)
        }
        _ => 0.0,
    }
}

/// Source of player profiles, normally the stats provider.
pub trait ProfileFetcher {
    fn fetch_profile(&self, identifier: &str, catalog: &StatsCatalog) -> Result<PlayerProfile, AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileStatus {
    Pending,
    Ready(PlayerProfile),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSlot {
    pub identifier: String,
    pub status: ProfileStatus,
}

impl PlayerSlot {
    pub fn profile(&self) -> Option<&PlayerProfile> {
        match &self.status {
            ProfileStatus::Ready(profile) => Some(profile),
            _ => None,
        }
    }

    /// Personal delta for `hero_id`; players without a loaded profile contribute nothing.
    pub fn hero_delta(&self, hero_id: &str) -> f64 {
        self.profile()
            .map(|p| min_games_hero_win_rate_delta(p, hero_id))
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamRoster {
    slots: [Option<PlayerSlot>; TEAM_SIZE],
}

impl TeamRoster {
    pub fn slot(&self, index: usize) -> Option<&PlayerSlot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn players(&self) -> impl Iterator<Item = (usize, &PlayerSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|s| (idx, s)))
    }

    pub fn occupied(&self) -> [bool; TEAM_SIZE] {
        let mut occupied = [false; TEAM_SIZE];
        for (idx, _) in self.players() {
            occupied[idx] = true;
        }
        occupied
    }

    pub fn len(&self) -> usize {
        self.players().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, identifier: &str) -> Option<usize> {
        let identifier = identifier.trim();
        self.players()
            .find(|(_, s)| s.identifier.eq_ignore_ascii_case(identifier))
            .map(|(idx, _)| idx)
    }

    /// Identifiers in slot order.
    pub fn identifiers(&self) -> Vec<String> {
        self.players().map(|(_, s)| s.identifier.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerProfileStore {
    rosters: [TeamRoster; 2],
}

impl PlayerProfileStore {
    pub fn new() -> Self {
        PlayerProfileStore::default()
    }

    pub fn roster(&self, side: TeamSide) -> &TeamRoster {
        &self.rosters[side.index()]
    }

    /// Claims the first free slot for `identifier` with a pending profile.
    pub fn reserve(&mut self, side: TeamSide, identifier: &str) -> Result<usize, AppError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(AppError::InvalidBattletag(identifier.to_string()));
        }
        let roster = &mut self.rosters[side.index()];
        if roster.position(identifier).is_some() {
            return Err(AppError::DuplicatePlayer {
                side,
                identifier: identifier.to_string(),
            });
        }
        let slot = roster
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(AppError::TeamFull { side })?;
        roster.slots[slot] = Some(PlayerSlot {
            identifier: identifier.to_string(),
            status: ProfileStatus::Pending,
        });
        debug!("Reserved {} slot {} for {}", side, slot, identifier);
        Ok(slot)
    }

    /// Stores a fetch result in its reserved slot.
    ///
    /// Returns false when the slot no longer belongs to `identifier` (the player
    /// was removed while the fetch was in flight); the result is then dropped.
    pub fn complete(
        &mut self,
        side: TeamSide,
        slot: usize,
        identifier: &str,
        result: &Result<PlayerProfile, AppError>,
    ) -> bool {
        let Some(Some(player)) = self.rosters[side.index()].slots.get_mut(slot) else {
            return false;
        };
        if !player.identifier.eq_ignore_ascii_case(identifier.trim()) {
            return false;
        }
        player.status = match result {
            Ok(profile) => ProfileStatus::Ready(profile.clone()),
            Err(e) => {
                warn!("Profile for {} unavailable: {}", identifier, e);
                ProfileStatus::Failed(e.to_string())
            }
        };
        true
    }

    /// Reserves a slot and fetches the profile.
    ///
    /// A failed fetch leaves the player in place, marked failed, and returns the error.
    pub fn add_player<F>(
        &mut self,
        side: TeamSide,
        identifier: &str,
        fetcher: &F,
        catalog: &StatsCatalog,
    ) -> Result<usize, AppError>
    where
        F: ProfileFetcher + ?Sized,
    {
        let slot = self.reserve(side, identifier)?;
        let result = fetcher.fetch_profile(identifier.trim(), catalog);
        self.complete(side, slot, identifier, &result);
        result.map(|_| slot)
    }

    /// Adds several players, fetching their profiles concurrently.
    ///
    /// Slots are reserved in input order before any fetch starts, so the final
    /// slot order matches `identifiers` whatever order the fetches finish in.
    pub fn add_players<F>(
        &mut self,
        side: TeamSide,
        identifiers: &[String],
        fetcher: &F,
        catalog: &StatsCatalog,
    ) -> Vec<Result<usize, AppError>>
    where
        F: ProfileFetcher + Sync + ?Sized,
    {
        let reservations: Vec<Result<(usize, String), AppError>> = identifiers
            .iter()
            .map(|id| self.reserve(side, id).map(|slot| (slot, id.trim().to_string())))
            .collect();

        let fetched: Vec<Option<Result<PlayerProfile, AppError>>> = thread::scope(|scope| {
            let handles: Vec<_> = reservations
                .iter()
                .map(|reservation| {
                    reservation.as_ref().ok().map(|(_, identifier)| {
                        let identifier = identifier.as_str();
                        scope.spawn(move || fetcher.fetch_profile(identifier, catalog))
                    })
                })
                .collect();
            handles
                .into_iter()
                .zip(&reservations)
                .map(|(handle, reservation)| {
                    handle.map(|h| {
                        h.join().unwrap_or_else(|_| {
                            let identifier = reservation
                                .as_ref()
                                .map(|(_, id)| id.clone())
                                .unwrap_or_default();
                            Err(AppError::ProfileFetch {
                                identifier,
                                reason: "fetch thread panicked".to_string(),
                            })
                        })
                    })
                })
                .collect()
        });

        let mut results = Vec::with_capacity(identifiers.len());
        for (reservation, outcome) in reservations.into_iter().zip(fetched) {
            match (reservation, outcome) {
                (Ok((slot, identifier)), Some(result)) => {
                    self.complete(side, slot, &identifier, &result);
                    results.push(result.map(|_| slot));
                }
                (Err(e), _) => results.push(Err(e)),
                (Ok((slot, _)), None) => results.push(Ok(slot)),
            }
        }
        info!(
            "{} roster now has {} players",
            side,
            self.roster(side).len()
        );
        results
    }

    /// Frees the player's slot and drops any draft assignment that pointed at it.
    pub fn remove_player(
        &mut self,
        side: TeamSide,
        identifier: &str,
        draft: &mut DraftState,
    ) -> Result<usize, AppError> {
        let roster = &mut self.rosters[side.index()];
        let slot = roster
            .position(identifier)
            .ok_or_else(|| AppError::PlayerNotFound(identifier.to_string()))?;
        roster.slots[slot] = None;
        draft.release_player(side, slot);
        Ok(slot)
    }

    pub fn clear(&mut self) {
        *self = PlayerProfileStore::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{profile, sample_catalog, StubFetcher};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_delta_needs_minimum_games() {
        // 24 games is one short, however lopsided the record.
        let p = profile("A#1", &[("jaina", 24, 10.0)])
            .with_record(GameTypeBucket::Casual, "valla", HeroPerformance::from_record(20, 0));
        assert_eq!(min_games_hero_win_rate_delta(&p, "jaina"), 0.0);
        assert_eq!(min_games_hero_win_rate_delta(&p, "valla"), 0.0);
        assert_eq!(min_games_hero_win_rate_delta(&p, "nobody"), 0.0);
    }

    #[test]
    fn test_delta_is_clamped() {
        let p = profile("A#1", &[("jaina", 30, 60.0), ("valla", 40, 45.0), ("lili", 100, 52.5)]);
        assert_eq!(min_games_hero_win_rate_delta(&p, "jaina"), 5.0);
        assert_eq!(min_games_hero_win_rate_delta(&p, "valla"), -5.0);
        assert_eq!(min_games_hero_win_rate_delta(&p, "lili"), 2.5);
    }

    #[test]
    fn test_delta_uses_bucket_with_most_games() {
        let p = PlayerProfile::new("A#1")
            .with_record(
                GameTypeBucket::Casual,
                "jaina",
                HeroPerformance { wins: 0, losses: 0, games_played: 80, win_rate: 53.0, mmr: None },
            )
            .with_record(
                GameTypeBucket::Ranked,
                "jaina",
                HeroPerformance { wins: 0, losses: 0, games_played: 30, win_rate: 40.0, mmr: None },
            );
        assert_eq!(min_games_hero_win_rate_delta(&p, "jaina"), 3.0);
    }

    #[test]
    fn test_bucket_tie_prefers_ranked() {
        let p = PlayerProfile::new("A#1")
            .with_record(
                GameTypeBucket::Casual,
                "jaina",
                HeroPerformance { games_played: 30, win_rate: 52.0, ..HeroPerformance::default() },
            )
            .with_record(
                GameTypeBucket::Ranked,
                "jaina",
                HeroPerformance { games_played: 30, win_rate: 48.0, ..HeroPerformance::default() },
            );
        assert_eq!(min_games_hero_win_rate_delta(&p, "jaina"), -2.0);
    }

    #[test]
    fn test_merge_sums_game_types() {
        let mut a = HeroPerformance::from_record(6, 4);
        a.merge(&HeroPerformance::from_record(4, 6));
        assert_eq!(a.games(), 20);
        assert_eq!(a.wins, 10);
        assert!((a.win_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_mmr_lookup() {
        let mut p = PlayerProfile::new("A#1");
        p.set_player_mmr(serde_json::json!({
            "Storm League": {"mmr": 2650.5, "games_played": 120},
            "Quick Match": {"mmr": "2400"}
        }));
        assert_eq!(p.mmr_for("Storm League"), Some(2650.5));
        assert_eq!(p.mmr_for("Quick Match"), Some(2400.0));
        assert_eq!(p.mmr_for("ARAM"), None);
    }

    #[test]
    fn test_team_full_and_duplicates() {
        let catalog = sample_catalog();
        let fetcher = StubFetcher::default();
        let mut store = PlayerProfileStore::new();
        for i in 0..TEAM_SIZE {
            store
                .add_player(TeamSide::Blue, &format!("P{}#{}", i, i), &fetcher, &catalog)
                .unwrap();
        }
        let before = store.clone();
        assert!(matches!(
            store.add_player(TeamSide::Blue, "P1#1", &fetcher, &catalog),
            Err(AppError::DuplicatePlayer { .. })
        ));
        assert!(matches!(
            store.add_player(TeamSide::Blue, "New#9", &fetcher, &catalog),
            Err(AppError::TeamFull { side: TeamSide::Blue })
        ));
        assert_eq!(store, before);

        // The same player may be on the other side.
        assert!(store.add_player(TeamSide::Red, "P1#1", &fetcher, &catalog).is_ok());
    }

    #[test]
    fn test_failed_fetch_keeps_slot_marked_failed() {
        let catalog = sample_catalog();
        let fetcher = StubFetcher::default().failing("Broken#1");
        let mut store = PlayerProfileStore::new();

        let err = store
            .add_player(TeamSide::Red, "Broken#1", &fetcher, &catalog)
            .unwrap_err();
        assert!(matches!(err, AppError::ProfileFetch { .. }));

        let slot = store.roster(TeamSide::Red).slot(0).unwrap();
        assert!(matches!(slot.status, ProfileStatus::Failed(_)));
        assert_eq!(slot.hero_delta("jaina"), 0.0);
    }

    #[test]
    fn test_add_players_preserves_order() {
        let catalog = sample_catalog();
        let fetcher = StubFetcher::default()
            .with_profile(profile("Slow#1", &[]))
            .failing("Broken#2")
            .with_delay("Slow#1", 50);
        let mut store = PlayerProfileStore::new();
        let ids: Vec<String> = ["Slow#1", "Fast#3", "Broken#2", "Fast#3"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let results = store.add_players(TeamSide::Blue, &ids, &fetcher, &catalog);
        assert_eq!(results.len(), 4);
        assert_eq!(*results[0].as_ref().unwrap(), 0);
        assert_eq!(*results[1].as_ref().unwrap(), 1);
        assert!(matches!(results[2], Err(AppError::ProfileFetch { .. })));
        assert!(matches!(results[3], Err(AppError::DuplicatePlayer { .. })));

        assert_eq!(
            store.roster(TeamSide::Blue).identifiers(),
            vec!["Slow#1".to_string(), "Fast#3".to_string(), "Broken#2".to_string()]
        );
    }

    #[test]
    fn test_stale_completion_ignored() {
        let mut store = PlayerProfileStore::new();
        let mut draft = DraftState::new();
        let slot = store.reserve(TeamSide::Blue, "Gone#1").unwrap();
        store.remove_player(TeamSide::Blue, "Gone#1", &mut draft).unwrap();
        store.reserve(TeamSide::Blue, "Other#2").unwrap();

        let applied = store.complete(TeamSide::Blue, slot, "Gone#1", &Ok(PlayerProfile::new("Gone#1")));
        assert!(!applied);
        let other = store.roster(TeamSide::Blue).slot(slot).unwrap();
        assert_eq!(other.status, ProfileStatus::Pending);
    }

    #[test]
    fn test_remove_player_clears_assignment() {
        let mut store = PlayerProfileStore::new();
        let mut draft = DraftState::new();
        store.reserve(TeamSide::Blue, "A#1").unwrap();
        store.reserve(TeamSide::Blue, "B#2").unwrap();
        draft.pick_hero(TeamSide::Blue, 0, "jaina").unwrap();
        draft
            .assign_player(TeamSide::Blue, 0, 1, &store.roster(TeamSide::Blue).occupied())
            .unwrap();

        assert_eq!(store.remove_player(TeamSide::Blue, "b#2", &mut draft).unwrap(), 1);
        assert_eq!(draft.team(TeamSide::Blue).assignments()[0], None);
        assert!(matches!(
            store.remove_player(TeamSide::Blue, "B#2", &mut draft),
            Err(AppError::PlayerNotFound(_))
        ));
    }
}
