//! Draft controller: every mutation goes through here so assignments and
//! recommendations for both sides are rebuilt afterwards.

use super::{DraftState, MatchContext, TeamSide};
use crate::analysis::assignment::AssignmentResolver;
use crate::analysis::profile_store::{PlayerProfileStore, ProfileFetcher};
use crate::analysis::recommender::{Recommendation, RecommendationRanker};
use crate::analysis::scoring::{ScoringEngine, ScoringSettings};
use crate::api::endpoints::parse_battletag;
use crate::catalog::{HeroId, MapId, Role, StatsCatalog};
use crate::error::AppError;
use crate::teams::RecentTeam;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct DraftSession {
    catalog: Arc<StatsCatalog>,
    settings: ScoringSettings,
    draft: DraftState,
    context: MatchContext,
    players: PlayerProfileStore,
    recommendations: [Vec<Recommendation>; 2],
}

impl DraftSession {
    pub fn new(catalog: Arc<StatsCatalog>, settings: ScoringSettings) -> Self {
        DraftSession {
            catalog,
            settings,
            draft: DraftState::new(),
            context: MatchContext::new(),
            players: PlayerProfileStore::new(),
            recommendations: [Vec::new(), Vec::new()],
        }
    }

    pub fn catalog(&self) -> &StatsCatalog {
        &self.catalog
    }

    pub fn draft(&self) -> &DraftState {
        &self.draft
    }

    pub fn context(&self) -> &MatchContext {
        &self.context
    }

    pub fn players(&self) -> &PlayerProfileStore {
        &self.players
    }

    pub fn recommendations(&self, side: TeamSide) -> &[Recommendation] {
        &self.recommendations[side.index()]
    }

    /// Re-resolves assignments and re-ranks both sides from the current state.
    pub fn refresh(&mut self) {
        for side in TeamSide::ALL {
            AssignmentResolver::resolve(side, &mut self.draft, &self.players);
        }
        let ranker = RecommendationRanker::new(ScoringEngine::new(&self.catalog, self.settings));
        for side in TeamSide::ALL {
            self.recommendations[side.index()] = ranker.rank(
                side,
                &self.draft,
                &self.context,
                &self.players,
                self.context.role_filter(side),
            );
        }
        debug!(
            "Refreshed: {} blue / {} red recommendations",
            self.recommendations[0].len(),
            self.recommendations[1].len()
        );
    }

    fn hero_id(&self, query: &str) -> Result<HeroId, AppError> {
        Ok(self.catalog.require_hero(query)?.id.clone())
    }

    pub fn pick_hero(&mut self, side: TeamSide, slot: usize, hero: &str) -> Result<HeroId, AppError> {
        let hero_id = self.hero_id(hero)?;
        self.draft.pick_hero(side, slot, &hero_id)?;
        info!("{} picks {} in slot {}", side, hero_id, slot);
        self.refresh();
        Ok(hero_id)
    }

    pub fn pick_next(&mut self, side: TeamSide, hero: &str) -> Result<usize, AppError> {
        let hero_id = self.hero_id(hero)?;
        let slot = self.draft.pick_next(side, &hero_id)?;
        info!("{} picks {} in slot {}", side, hero_id, slot);
        self.refresh();
        Ok(slot)
    }

    pub fn unpick_hero(&mut self, side: TeamSide, slot: usize) -> Result<HeroId, AppError> {
        let hero_id = self.draft.unpick_hero(side, slot)?;
        self.refresh();
        Ok(hero_id)
    }

    pub fn ban_hero(&mut self, side: TeamSide, slot: usize, hero: &str) -> Result<HeroId, AppError> {
        let hero_id = self.hero_id(hero)?;
        self.draft.ban_hero(side, slot, &hero_id)?;
        info!("{} bans {}", side, hero_id);
        self.refresh();
        Ok(hero_id)
    }

    pub fn ban_next(&mut self, side: TeamSide, hero: &str) -> Result<usize, AppError> {
        let hero_id = self.hero_id(hero)?;
        let slot = self.draft.ban_next(side, &hero_id)?;
        info!("{} bans {}", side, hero_id);
        self.refresh();
        Ok(slot)
    }

    pub fn unban_hero(&mut self, side: TeamSide, slot: usize) -> Result<HeroId, AppError> {
        let hero_id = self.draft.unban_hero(side, slot)?;
        self.refresh();
        Ok(hero_id)
    }

    /// `None` clears the map.
    pub fn select_map(&mut self, map: Option<&str>) -> Result<Option<MapId>, AppError> {
        let map_id = match map {
            Some(query) => Some(self.catalog.require_map(query)?.id.clone()),
            None => None,
        };
        self.context.select_map(map_id.clone());
        self.refresh();
        Ok(map_id)
    }

    pub fn set_role_filter(&mut self, side: TeamSide, roles: BTreeSet<Role>) {
        self.context.set_role_filter(side, roles);
        self.refresh();
    }

    pub fn add_player<F>(&mut self, side: TeamSide, identifier: &str, fetcher: &F) -> Result<usize, AppError>
    where
        F: ProfileFetcher + ?Sized,
    {
        parse_battletag(identifier)?;
        let result = self.players.add_player(side, identifier, fetcher, &self.catalog);
        self.refresh();
        result
    }

    /// Adds several players at once; results line up with `identifiers`.
    pub fn add_players<F>(
        &mut self,
        side: TeamSide,
        identifiers: &[String],
        fetcher: &F,
    ) -> Vec<Result<usize, AppError>>
    where
        F: ProfileFetcher + Sync + ?Sized,
    {
        let mut results: Vec<Option<Result<usize, AppError>>> = Vec::with_capacity(identifiers.len());
        let mut valid = Vec::new();
        for identifier in identifiers {
            match parse_battletag(identifier) {
                Ok(_) => {
                    valid.push(identifier.clone());
                    results.push(None);
                }
                Err(e) => results.push(Some(Err(e))),
            }
        }

        let mut fetched = self
            .players
            .add_players(side, &valid, fetcher, &self.catalog)
            .into_iter();
        self.refresh();

        results
            .into_iter()
            .map(|result| {
                result.or_else(|| fetched.next()).unwrap_or_else(|| {
                    Err(AppError::InvalidDraftMutation("missing add result".to_string()))
                })
            })
            .collect()
    }

    pub fn remove_player(&mut self, side: TeamSide, identifier: &str) -> Result<usize, AppError> {
        let slot = self.players.remove_player(side, identifier, &mut self.draft)?;
        info!("Removed {} from {}", identifier, side);
        self.refresh();
        Ok(slot)
    }

    /// Manually binds a player to a picked hero, swapping with whoever held them.
    pub fn assign_player(&mut self, side: TeamSide, pick_slot: usize, player_slot: usize) -> Result<(), AppError> {
        let occupied = self.players.roster(side).occupied();
        self.draft.assign_player(side, pick_slot, player_slot, &occupied)?;
        self.refresh();
        Ok(())
    }

    /// Drops a manual binding and lets the resolver choose again.
    pub fn clear_assignment(&mut self, side: TeamSide, pick_slot: usize) -> Result<(), AppError> {
        self.draft.clear_manual_assignment(side, pick_slot)?;
        self.refresh();
        Ok(())
    }

    /// Adds a saved roster's players in their stored order.
    pub fn restore_team<F>(&mut self, side: TeamSide, team: &RecentTeam, fetcher: &F) -> Vec<Result<usize, AppError>>
    where
        F: ProfileFetcher + Sync + ?Sized,
    {
        info!("Restoring team {} to {}", team.name, side);
        self.add_players(side, &team.battletags, fetcher)
    }

    pub fn reset(&mut self) {
        self.draft.reset();
        self.context.reset();
        self.players.clear();
        self.recommendations = [Vec::new(), Vec::new()];
    }
}
