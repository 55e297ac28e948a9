//! Binding drafted hero slots to the players on a team.
//!
//! The resolver never patches the previous result. It rebuilds the whole
//! assignment array from the picks, the roster and the manual choices, so
//! running it twice, or after fetches complete in any order, gives the same answer.

use super::profile_store::{PlayerProfileStore, TeamRoster};
use crate::draft::{DraftState, TeamDraftState, TeamSide, PICK_SLOTS, TEAM_SIZE};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedAssignments {
    pub assignments: [Option<usize>; PICK_SLOTS],
    pub manual: [bool; PICK_SLOTS],
}

pub struct AssignmentResolver;

impl AssignmentResolver {
    /// Computes assignments for one team without touching the draft.
    pub fn compute(team: &TeamDraftState, roster: &TeamRoster) -> ResolvedAssignments {
        let occupied = roster.occupied();
        let mut resolved = ResolvedAssignments::default();
        let mut claimed = [false; TEAM_SIZE];

        // Manual choices survive while their hero and player are both still there.
        for slot in 0..PICK_SLOTS {
            if !team.manual_assignment()[slot] || team.picks()[slot].is_none() {
                continue;
            }
            if let Some(player) = team.assignments()[slot] {
                if player < TEAM_SIZE && occupied[player] && !claimed[player] {
                    resolved.assignments[slot] = Some(player);
                    resolved.manual[slot] = true;
                    claimed[player] = true;
                }
            }
        }

        // Picked heroes go to whoever plays them best; ties go to the lowest player slot.
        for slot in 0..PICK_SLOTS {
            if resolved.assignments[slot].is_some() {
                continue;
            }
            let Some(hero_id) = &team.picks()[slot] else {
                continue;
            };
            let best = roster
                .players()
                .filter(|(idx, _)| !claimed[*idx])
                .map(|(idx, player)| (idx, player.hero_delta(hero_id)))
                .fold(None, |best: Option<(usize, f64)>, (idx, delta)| match best {
                    Some((_, best_delta)) if best_delta >= delta => best,
                    _ => Some((idx, delta)),
                });
            if let Some((player, delta)) = best {
                debug!("Pick slot {} ({}) -> player {} ({:+.1})", slot, hero_id, player, delta);
                resolved.assignments[slot] = Some(player);
                claimed[player] = true;
            }
        }

        // Everyone left fills the open slots in order.
        for slot in 0..PICK_SLOTS {
            if team.picks()[slot].is_some() || resolved.assignments[slot].is_some() {
                continue;
            }
            if let Some(player) = (0..TEAM_SIZE).find(|&p| occupied[p] && !claimed[p]) {
                resolved.assignments[slot] = Some(player);
                claimed[player] = true;
            }
        }

        resolved
    }

    /// Recomputes and stores the assignments for `side`.
    pub fn resolve(
        side: TeamSide,
        draft: &mut DraftState,
        players: &PlayerProfileStore,
    ) -> [Option<usize>; PICK_SLOTS] {
        let resolved = Self::compute(draft.team(side), players.roster(side));
        draft
            .team_mut(side)
            .set_assignments(resolved.assignments, resolved.manual);
        resolved.assignments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{profile, sample_catalog, StubFetcher};
    use pretty_assertions::assert_eq;

    fn store_with(players: Vec<crate::analysis::profile_store::PlayerProfile>) -> PlayerProfileStore {
        let catalog = sample_catalog();
        let mut fetcher = StubFetcher::default();
        let ids: Vec<String> = players.iter().map(|p| p.identifier().to_string()).collect();
        for p in players {
            fetcher = fetcher.with_profile(p);
        }
        let mut store = PlayerProfileStore::new();
        for id in ids {
            store.add_player(TeamSide::Blue, &id, &fetcher, &catalog).unwrap();
        }
        store
    }

    fn assert_unique(assignments: &[Option<usize>; PICK_SLOTS]) {
        let mut seen = [false; TEAM_SIZE];
        for player in assignments.iter().flatten() {
            assert!(!seen[*player], "player {} assigned twice: {:?}", player, assignments);
            seen[*player] = true;
        }
    }

    #[test]
    fn test_empty_slots_filled_in_order() {
        let store = store_with(vec![profile("A#1", &[]), profile("B#2", &[]), profile("C#3", &[])]);
        let mut draft = DraftState::new();
        let assignments = AssignmentResolver::resolve(TeamSide::Blue, &mut draft, &store);
        assert_eq!(assignments, [Some(0), Some(1), Some(2), None, None]);
    }

    #[test]
    fn test_best_player_gets_the_hero() {
        let store = store_with(vec![
            profile("A#1", &[]),
            profile("B#2", &[("jaina", 40, 58.0)]),
            profile("C#3", &[("jaina", 40, 53.0)]),
        ]);
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 0, "jaina").unwrap();

        let assignments = AssignmentResolver::resolve(TeamSide::Blue, &mut draft, &store);
        assert_eq!(assignments, [Some(1), Some(0), Some(2), None, None]);
    }

    #[test]
    fn test_no_preference_falls_back_to_first_free_player() {
        let store = store_with(vec![profile("A#1", &[]), profile("B#2", &[])]);
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 3, "valla").unwrap();

        let assignments = AssignmentResolver::resolve(TeamSide::Blue, &mut draft, &store);
        assert_eq!(assignments, [Some(1), None, None, Some(0), None]);
    }

    #[test]
    fn test_player_moves_off_empty_slot_without_duplication() {
        let store = store_with(vec![profile("A#1", &[]), profile("B#2", &[("muradin", 50, 60.0)])]);
        let mut draft = DraftState::new();
        AssignmentResolver::resolve(TeamSide::Blue, &mut draft, &store);
        assert_eq!(draft.team(TeamSide::Blue).assignments()[1], Some(1));

        draft.pick_hero(TeamSide::Blue, 0, "muradin").unwrap();
        let assignments = AssignmentResolver::resolve(TeamSide::Blue, &mut draft, &store);
        assert_eq!(assignments, [Some(1), Some(0), None, None, None]);
        assert_unique(&assignments);
    }

    #[test]
    fn test_manual_assignment_preserved() {
        let store = store_with(vec![profile("A#1", &[("jaina", 50, 60.0)]), profile("B#2", &[])]);
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 0, "jaina").unwrap();
        AssignmentResolver::resolve(TeamSide::Blue, &mut draft, &store);
        assert_eq!(draft.team(TeamSide::Blue).assignments()[0], Some(0));

        draft
            .assign_player(TeamSide::Blue, 0, 1, &store.roster(TeamSide::Blue).occupied())
            .unwrap();
        let assignments = AssignmentResolver::resolve(TeamSide::Blue, &mut draft, &store);
        assert_eq!(assignments[0], Some(1));
        assert!(draft.team(TeamSide::Blue).manual_assignment()[0]);
        assert_unique(&assignments);
    }

    #[test]
    fn test_manual_flag_cleared_when_pick_removed() {
        let store = store_with(vec![profile("A#1", &[]), profile("B#2", &[])]);
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 2, "jaina").unwrap();
        draft
            .assign_player(TeamSide::Blue, 2, 1, &store.roster(TeamSide::Blue).occupied())
            .unwrap();
        AssignmentResolver::resolve(TeamSide::Blue, &mut draft, &store);

        draft.unpick_hero(TeamSide::Blue, 2).unwrap();
        let assignments = AssignmentResolver::resolve(TeamSide::Blue, &mut draft, &store);
        assert_eq!(draft.team(TeamSide::Blue).manual_assignment(), &[false; PICK_SLOTS]);
        assert_eq!(assignments, [Some(0), Some(1), None, None, None]);
    }

    #[test]
    fn test_resolve_is_idempotent_and_unique() {
        let store = store_with(vec![
            profile("A#1", &[("valla", 60, 55.0)]),
            profile("B#2", &[("valla", 60, 57.0), ("jaina", 30, 52.0)]),
            profile("C#3", &[("muradin", 80, 51.0)]),
            profile("D#4", &[]),
        ]);
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 1, "valla").unwrap();
        draft.pick_hero(TeamSide::Blue, 4, "jaina").unwrap();
        draft.pick_hero(TeamSide::Blue, 0, "muradin").unwrap();

        let first = AssignmentResolver::resolve(TeamSide::Blue, &mut draft, &store);
        let snapshot = draft.clone();
        let second = AssignmentResolver::resolve(TeamSide::Blue, &mut draft, &store);
        assert_eq!(first, second);
        assert_eq!(draft, snapshot);
        assert_unique(&first);
        assert_eq!(first, [Some(2), Some(0), Some(3), None, Some(1)]);
    }
}
