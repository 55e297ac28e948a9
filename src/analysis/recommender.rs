use super::profile_store::PlayerProfileStore;
use super::scoring::{ScoreBreakdown, ScoreTag, ScoringEngine};
use crate::catalog::{Hero, Role};
use crate::draft::{DraftState, MatchContext, TeamSide};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub hero: Hero,
    pub total_delta: f64,
    pub expected_win_rate: f64,
    pub breakdown: ScoreBreakdown,
    pub tags: Vec<ScoreTag>,
    pub player: Option<String>,
}

pub struct RecommendationRanker<'a> {
    engine: ScoringEngine<'a>,
}

impl<'a> RecommendationRanker<'a> {
    pub fn new(engine: ScoringEngine<'a>) -> Self {
        RecommendationRanker { engine }
    }

    /// True when there is something to rank against: a map or at least one pick.
    pub fn has_signal(draft: &DraftState, context: &MatchContext) -> bool {
        context.selected_map().is_some() || draft.has_any_pick()
    }

    /// Scores every undrafted hero for `side`, best expected win rate first.
    ///
    /// An empty `role_filter` means every role. Heroes without a role are only
    /// shown when no filter is set.
    pub fn rank(
        &self,
        side: TeamSide,
        draft: &DraftState,
        context: &MatchContext,
        players: &PlayerProfileStore,
        role_filter: &BTreeSet<Role>,
    ) -> Vec<Recommendation> {
        if !Self::has_signal(draft, context) {
            debug!("No map or picks yet, nothing to rank for {}", side);
            return Vec::new();
        }

        let mut recommendations: Vec<Recommendation> = self
            .engine
            .catalog()
            .list_heroes()
            .iter()
            .filter(|hero| !draft.is_drafted(&hero.id))
            .filter(|hero| {
                role_filter.is_empty() || hero.role.map_or(false, |role| role_filter.contains(&role))
            })
            .map(|hero| {
                let score = self.engine.score(&hero.id, side, draft, context, players);
                Recommendation {
                    hero: hero.clone(),
                    total_delta: score.total,
                    expected_win_rate: score.expected_win_rate,
                    breakdown: score.breakdown,
                    tags: score.tags,
                    player: score.player,
                }
            })
            .collect();

        recommendations.sort_by(|a, b| {
            b.expected_win_rate
                .total_cmp(&a.expected_win_rate)
                .then_with(|| a.hero.id.cmp(&b.hero.id))
        });

        debug!("Ranked {} heroes for {}", recommendations.len(), side);
        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::scoring::ScoringSettings;
    use crate::test_support::sample_catalog;
    use pretty_assertions::assert_eq;

    fn ids(recommendations: &[Recommendation]) -> Vec<&str> {
        recommendations.iter().map(|r| r.hero.id.as_str()).collect()
    }

    #[test]
    fn test_no_signal_gives_empty_list() {
        let catalog = sample_catalog();
        let ranker = RecommendationRanker::new(ScoringEngine::new(&catalog, ScoringSettings::default()));
        let mut draft = DraftState::new();
        draft.ban_hero(TeamSide::Blue, 0, "valla").unwrap();

        for side in TeamSide::ALL {
            let ranked = ranker.rank(side, &draft, &MatchContext::new(), &PlayerProfileStore::new(), &BTreeSet::new());
            assert!(ranked.is_empty());
        }
    }

    #[test]
    fn test_drafted_heroes_excluded_for_both_sides() {
        let catalog = sample_catalog();
        let ranker = RecommendationRanker::new(ScoringEngine::new(&catalog, ScoringSettings::default()));
        let mut draft = DraftState::new();
        draft.pick_hero(TeamSide::Blue, 0, "jaina").unwrap();
        draft.ban_hero(TeamSide::Red, 0, "valla").unwrap();

        for side in TeamSide::ALL {
            let ranked = ranker.rank(side, &draft, &MatchContext::new(), &PlayerProfileStore::new(), &BTreeSet::new());
            assert!(!ranked.is_empty());
            assert!(ranked.iter().all(|r| r.hero.id != "jaina" && r.hero.id != "valla"));
        }
    }

    #[test]
    fn test_sorted_by_expected_win_rate_then_id() {
        let catalog = sample_catalog();
        let ranker = RecommendationRanker::new(ScoringEngine::new(&catalog, ScoringSettings::default()));
        let mut context = MatchContext::new();
        context.select_map(Some("cursed-hollow".to_string()));

        let ranked = ranker.rank(TeamSide::Blue, &DraftState::new(), &context, &PlayerProfileStore::new(), &BTreeSet::new());
        for pair in ranked.windows(2) {
            let ordered = pair[0].expected_win_rate > pair[1].expected_win_rate
                || (pair[0].expected_win_rate == pair[1].expected_win_rate && pair[0].hero.id < pair[1].hero.id);
            assert!(ordered, "{} before {}", pair[0].hero.id, pair[1].hero.id);
        }
        assert_eq!(ranked[0].hero.id, "hero-a");
        assert!((ranked[0].expected_win_rate - 56.0).abs() < 1e-9);
    }

    #[test]
    fn test_role_filter() {
        let catalog = sample_catalog();
        let ranker = RecommendationRanker::new(ScoringEngine::new(&catalog, ScoringSettings::default()));
        let mut context = MatchContext::new();
        context.select_map(Some("cursed-hollow".to_string()));
        let roles: BTreeSet<Role> = [Role::RangedAssassin].into_iter().collect();

        let ranked = ranker.rank(TeamSide::Red, &DraftState::new(), &context, &PlayerProfileStore::new(), &roles);
        let mut heroes = ids(&ranked);
        heroes.sort();
        assert_eq!(heroes, vec!["jaina", "valla"]);

        // Heroes with no known role only show up unfiltered.
        let unfiltered = ranker.rank(TeamSide::Red, &DraftState::new(), &context, &PlayerProfileStore::new(), &BTreeSet::new());
        assert!(ids(&unfiltered).contains(&"abathur"));
    }
}
