pub mod session;

use crate::catalog::{HeroId, MapId, Role};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const BAN_SLOTS: usize = 3;
pub const PICK_SLOTS: usize = 5;
pub const TEAM_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamSide {
    Blue,
    Red,
}

impl TeamSide {
    pub const ALL: [TeamSide; 2] = [TeamSide::Blue, TeamSide::Red];

    pub fn opponent(self) -> TeamSide {
        match self {
            TeamSide::Blue => TeamSide::Red,
            TeamSide::Red => TeamSide::Blue,
        }
    }

    pub fn index(self) -> usize {
        match self {
            TeamSide::Blue => 0,
            TeamSide::Red => 1,
        }
    }
}

impl fmt::Display for TeamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamSide::Blue => write!(f, "blue"),
            TeamSide::Red => write!(f, "red"),
        }
    }
}

impl FromStr for TeamSide {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" | "1" | "left" => Ok(TeamSide::Blue),
            "red" | "2" | "right" => Ok(TeamSide::Red),
            other => Err(AppError::InvalidDraftMutation(format!(
                "unknown side '{}', expected blue or red",
                other
            ))),
        }
    }
}

/// One side of the draft board.
///
/// `assignments[i]` is the player slot bound to pick slot `i`; `manual_assignment[i]`
/// marks bindings the user set explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamDraftState {
    bans: [Option<HeroId>; BAN_SLOTS],
    picks: [Option<HeroId>; PICK_SLOTS],
    assignments: [Option<usize>; PICK_SLOTS],
    manual_assignment: [bool; PICK_SLOTS],
}

impl TeamDraftState {
    pub fn bans(&self) -> &[Option<HeroId>; BAN_SLOTS] {
        &self.bans
    }

    pub fn picks(&self) -> &[Option<HeroId>; PICK_SLOTS] {
        &self.picks
    }

    pub fn assignments(&self) -> &[Option<usize>; PICK_SLOTS] {
        &self.assignments
    }

    pub fn manual_assignment(&self) -> &[bool; PICK_SLOTS] {
        &self.manual_assignment
    }

    pub fn picked_heroes(&self) -> impl Iterator<Item = &HeroId> {
        self.picks.iter().flatten()
    }

    pub fn banned_heroes(&self) -> impl Iterator<Item = &HeroId> {
        self.bans.iter().flatten()
    }

    pub fn has_picks(&self) -> bool {
        self.picks.iter().any(Option::is_some)
    }

    /// Pick slot currently bound to `player_slot`, if any.
    pub fn slot_of_player(&self, player_slot: usize) -> Option<usize> {
        self.assignments.iter().position(|a| *a == Some(player_slot))
    }

    /// True when the player is bound to a slot that already holds a hero.
    pub fn is_player_committed(&self, player_slot: usize) -> bool {
        self.slot_of_player(player_slot)
            .map(|slot| self.picks[slot].is_some())
            .unwrap_or(false)
    }

    pub(crate) fn set_assignments(
        &mut self,
        assignments: [Option<usize>; PICK_SLOTS],
        manual: [bool; PICK_SLOTS],
    ) {
        self.assignments = assignments;
        self.manual_assignment = manual;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftState {
    teams: [TeamDraftState; 2],
}

fn check_slot(slot: usize, len: usize, what: &str) -> Result<(), AppError> {
    if slot >= len {
        return Err(AppError::InvalidDraftMutation(format!(
            "{} slot {} out of range (0-{})",
            what,
            slot,
            len - 1
        )));
    }
    Ok(())
}

impl DraftState {
    pub fn new() -> Self {
        DraftState::default()
    }

    pub fn team(&self, side: TeamSide) -> &TeamDraftState {
        &self.teams[side.index()]
    }

    pub(crate) fn team_mut(&mut self, side: TeamSide) -> &mut TeamDraftState {
        &mut self.teams[side.index()]
    }

    /// A hero may appear in at most one pick or ban slot across both sides.
    pub fn is_drafted(&self, hero_id: &str) -> bool {
        self.teams.iter().any(|team| {
            team.picked_heroes().any(|h| h == hero_id) || team.banned_heroes().any(|h| h == hero_id)
        })
    }

    pub fn has_any_pick(&self) -> bool {
        self.teams.iter().any(TeamDraftState::has_picks)
    }

    fn ensure_available(&self, hero_id: &str) -> Result<(), AppError> {
        if self.is_drafted(hero_id) {
            return Err(AppError::InvalidDraftMutation(format!(
                "{} is already picked or banned",
                hero_id
            )));
        }
        Ok(())
    }

    pub fn pick_hero(&mut self, side: TeamSide, slot: usize, hero_id: &str) -> Result<(), AppError> {
        check_slot(slot, PICK_SLOTS, "pick")?;
        self.ensure_available(hero_id)?;
        let team = self.team_mut(side);
        if let Some(existing) = &team.picks[slot] {
            return Err(AppError::InvalidDraftMutation(format!(
                "{} pick slot {} already holds {}",
                side, slot, existing
            )));
        }
        team.picks[slot] = Some(hero_id.to_string());
        Ok(())
    }

    /// Picks into the first empty slot and returns it.
    pub fn pick_next(&mut self, side: TeamSide, hero_id: &str) -> Result<usize, AppError> {
        let slot = self
            .team(side)
            .picks
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| AppError::InvalidDraftMutation(format!("{} has no empty pick slot", side)))?;
        self.pick_hero(side, slot, hero_id)?;
        Ok(slot)
    }

    pub fn unpick_hero(&mut self, side: TeamSide, slot: usize) -> Result<HeroId, AppError> {
        check_slot(slot, PICK_SLOTS, "pick")?;
        self.team_mut(side).picks[slot]
            .take()
            .ok_or_else(|| AppError::InvalidDraftMutation(format!("{} pick slot {} is empty", side, slot)))
    }

    pub fn ban_hero(&mut self, side: TeamSide, slot: usize, hero_id: &str) -> Result<(), AppError> {
        check_slot(slot, BAN_SLOTS, "ban")?;
        self.ensure_available(hero_id)?;
        let team = self.team_mut(side);
        if let Some(existing) = &team.bans[slot] {
            return Err(AppError::InvalidDraftMutation(format!(
                "{} ban slot {} already holds {}",
                side, slot, existing
            )));
        }
        team.bans[slot] = Some(hero_id.to_string());
        Ok(())
    }

    pub fn ban_next(&mut self, side: TeamSide, hero_id: &str) -> Result<usize, AppError> {
        let slot = self
            .team(side)
            .bans
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| AppError::InvalidDraftMutation(format!("{} has no empty ban slot", side)))?;
        self.ban_hero(side, slot, hero_id)?;
        Ok(slot)
    }

    pub fn unban_hero(&mut self, side: TeamSide, slot: usize) -> Result<HeroId, AppError> {
        check_slot(slot, BAN_SLOTS, "ban")?;
        self.team_mut(side).bans[slot]
            .take()
            .ok_or_else(|| AppError::InvalidDraftMutation(format!("{} ban slot {} is empty", side, slot)))
    }

    /// Binds `player_slot` to `pick_slot` as a manual choice.
    ///
    /// If another pick slot held that player, it takes over this slot's previous
    /// player so nobody ends up in two slots.
    pub fn assign_player(
        &mut self,
        side: TeamSide,
        pick_slot: usize,
        player_slot: usize,
        occupied_players: &[bool; TEAM_SIZE],
    ) -> Result<(), AppError> {
        check_slot(pick_slot, PICK_SLOTS, "pick")?;
        check_slot(player_slot, TEAM_SIZE, "player")?;
        if !occupied_players[player_slot] {
            return Err(AppError::InvalidDraftMutation(format!(
                "{} player slot {} is empty",
                side, player_slot
            )));
        }
        let team = self.team_mut(side);
        if team.picks[pick_slot].is_none() {
            return Err(AppError::InvalidDraftMutation(format!(
                "{} pick slot {} has no hero to assign",
                side, pick_slot
            )));
        }

        let previous = team.assignments[pick_slot];
        if let Some(other) = team.slot_of_player(player_slot) {
            if other != pick_slot {
                team.assignments[other] = previous;
                team.manual_assignment[other] = false;
            }
        }
        team.assignments[pick_slot] = Some(player_slot);
        team.manual_assignment[pick_slot] = true;
        Ok(())
    }

    pub fn clear_manual_assignment(&mut self, side: TeamSide, pick_slot: usize) -> Result<(), AppError> {
        check_slot(pick_slot, PICK_SLOTS, "pick")?;
        let team = self.team_mut(side);
        team.manual_assignment[pick_slot] = false;
        team.assignments[pick_slot] = None;
        Ok(())
    }

    /// Drops every binding that points at `player_slot`.
    pub fn release_player(&mut self, side: TeamSide, player_slot: usize) {
        let team = self.team_mut(side);
        for idx in 0..PICK_SLOTS {
            if team.assignments[idx] == Some(player_slot) {
                team.assignments[idx] = None;
                team.manual_assignment[idx] = false;
            }
        }
    }

    pub fn reset(&mut self) {
        *self = DraftState::default();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchContext {
    selected_map: Option<MapId>,
    role_filters: [BTreeSet<Role>; 2],
}

impl MatchContext {
    pub fn new() -> Self {
        MatchContext::default()
    }

    pub fn selected_map(&self) -> Option<&str> {
        self.selected_map.as_deref()
    }

    pub fn select_map(&mut self, map_id: Option<MapId>) {
        self.selected_map = map_id;
    }

    pub fn role_filter(&self, side: TeamSide) -> &BTreeSet<Role> {
        &self.role_filters[side.index()]
    }

    pub fn set_role_filter(&mut self, side: TeamSide, roles: BTreeSet<Role>) {
        self.role_filters[side.index()] = roles;
    }

    pub fn reset(&mut self) {
        *self = MatchContext::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PLAYERS: [bool; TEAM_SIZE] = [true; TEAM_SIZE];

    #[test]
    fn test_side_parsing() {
        assert_eq!("Blue".parse::<TeamSide>().unwrap(), TeamSide::Blue);
        assert_eq!("red".parse::<TeamSide>().unwrap(), TeamSide::Red);
        assert!("green".parse::<TeamSide>().is_err());
        assert_eq!(TeamSide::Blue.opponent(), TeamSide::Red);
    }

    #[test]
    fn test_hero_drafted_once_across_both_sides() {
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 0, "jaina").unwrap();
        assert!(draft.pick_hero(TeamSide::Red, 0, "jaina").is_err());
        assert!(draft.ban_hero(TeamSide::Red, 0, "jaina").is_err());
        assert!(draft.pick_hero(TeamSide::Blue, 1, "jaina").is_err());

        draft.ban_hero(TeamSide::Red, 0, "muradin").unwrap();
        assert!(draft.pick_hero(TeamSide::Blue, 1, "muradin").is_err());
        assert!(draft.is_drafted("muradin"));
    }

    #[test]
    fn test_occupied_slot_rejected_and_state_unchanged() {
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 0, "jaina").unwrap();
        let before = draft.clone();

        let err = draft.pick_hero(TeamSide::Blue, 0, "valla").unwrap_err();
        assert!(matches!(err, AppError::InvalidDraftMutation(_)));
        assert_eq!(draft, before);

        assert!(draft.pick_hero(TeamSide::Blue, PICK_SLOTS, "valla").is_err());
        assert!(draft.ban_hero(TeamSide::Blue, BAN_SLOTS, "valla").is_err());
        assert_eq!(draft, before);
    }

    #[test]
    fn test_pick_next_fills_first_empty_slot() {
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Red, 0, "a").unwrap();
        draft.pick_hero(TeamSide::Red, 2, "c").unwrap();
        assert_eq!(draft.pick_next(TeamSide::Red, "b").unwrap(), 1);
        assert_eq!(draft.pick_next(TeamSide::Red, "d").unwrap(), 3);
        assert_eq!(draft.pick_next(TeamSide::Red, "e").unwrap(), 4);
        assert!(draft.pick_next(TeamSide::Red, "f").is_err());
    }

    #[test]
    fn test_unpick_and_unban() {
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 1, "jaina").unwrap();
        draft.ban_next(TeamSide::Blue, "valla").unwrap();
        assert_eq!(draft.unpick_hero(TeamSide::Blue, 1).unwrap(), "jaina");
        assert_eq!(draft.unban_hero(TeamSide::Blue, 0).unwrap(), "valla");
        assert!(draft.unpick_hero(TeamSide::Blue, 1).is_err());
        assert!(!draft.has_any_pick());
    }

    #[test]
    fn test_manual_assignment_swaps_instead_of_duplicating() {
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 0, "jaina").unwrap();
        draft.pick_hero(TeamSide::Blue, 1, "muradin").unwrap();
        draft
            .team_mut(TeamSide::Blue)
            .set_assignments([Some(0), Some(1), None, None, None], [false; PICK_SLOTS]);

        draft.assign_player(TeamSide::Blue, 0, 1, &ALL_PLAYERS).unwrap();
        let team = draft.team(TeamSide::Blue);
        assert_eq!(team.assignments()[0], Some(1));
        assert_eq!(team.assignments()[1], Some(0));
        assert!(team.manual_assignment()[0]);
        assert!(!team.manual_assignment()[1]);
    }

    #[test]
    fn test_manual_assignment_validation() {
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 0, "jaina").unwrap();
        let mut occupied = [false; TEAM_SIZE];
        occupied[0] = true;

        assert!(draft.assign_player(TeamSide::Blue, 0, 1, &occupied).is_err());
        assert!(draft.assign_player(TeamSide::Blue, 1, 0, &occupied).is_err());
        assert!(draft.assign_player(TeamSide::Blue, 0, 0, &occupied).is_ok());
    }

    #[test]
    fn test_release_player_clears_bindings() {
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 0, "jaina").unwrap();
        draft.assign_player(TeamSide::Blue, 0, 2, &ALL_PLAYERS).unwrap();
        draft.release_player(TeamSide::Blue, 2);
        let team = draft.team(TeamSide::Blue);
        assert_eq!(team.assignments()[0], None);
        assert!(!team.manual_assignment()[0]);
    }

    #[test]
    fn test_role_filter_per_side() {
        let mut context = MatchContext::new();
        context.set_role_filter(TeamSide::Red, [Role::Healer].into_iter().collect());
        assert!(context.role_filter(TeamSide::Blue).is_empty());
        assert!(context.role_filter(TeamSide::Red).contains(&Role::Healer));
        context.select_map(Some("cursed-hollow".into()));
        context.reset();
        assert_eq!(context, MatchContext::default());
    }
}
