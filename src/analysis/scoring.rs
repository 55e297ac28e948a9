//! Win-rate-delta scoring for a single candidate hero.
//!
//! A hero's score is the sum of five deltas, all in percentage points:
//! global, map, vs enemies, with allies and personal. The expected win rate is
//! simply `50 + total`. Missing data contributes zero; scoring never fails.

use super::profile_store::PlayerProfileStore;
use crate::catalog::{HeroId, StatsCatalog};
use crate::draft::{DraftState, MatchContext, TeamSide};
use serde::Serialize;
use tracing::debug;

pub const TAG_THRESHOLD: f64 = 3.0;
pub const PLAYER_TAG_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringSettings {
    pub tag_threshold: f64,
    pub player_tag_threshold: f64,
    pub component_clamp: Option<f64>,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        ScoringSettings {
            tag_threshold: TAG_THRESHOLD,
            player_tag_threshold: PLAYER_TAG_THRESHOLD,
            component_clamp: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub global: f64,
    pub map: f64,
    pub vs_enemies: f64,
    pub with_allies: f64,
    pub player_delta: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.global + self.map + self.vs_enemies + self.with_allies + self.player_delta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TagKind {
    Global,
    Map,
    Enemy,
    Ally,
    Player,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreTag {
    pub text: String,
    pub value: f64,
    pub kind: TagKind,
}

impl ScoreTag {
    pub fn is_positive(&self) -> bool {
        self.value > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeroScore {
    pub hero_id: HeroId,
    pub total: f64,
    pub expected_win_rate: f64,
    pub breakdown: ScoreBreakdown,
    pub tags: Vec<ScoreTag>,
    /// Player whose personal stats supplied `player_delta`.
    pub player: Option<String>,
}

pub struct ScoringEngine<'a> {
    catalog: &'a StatsCatalog,
    settings: ScoringSettings,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(catalog: &'a StatsCatalog, settings: ScoringSettings) -> Self {
        ScoringEngine { catalog, settings }
    }

    pub fn catalog(&self) -> &'a StatsCatalog {
        self.catalog
    }

    fn clamp_component(&self, value: f64) -> f64 {
        match self.settings.component_clamp {
            Some(cap) => value.clamp(-cap, cap),
            None => value,
        }
    }

    fn tag(&self, tags: &mut Vec<ScoreTag>, kind: TagKind, value: f64, positive: String, negative: String) {
        let threshold = match kind {
            TagKind::Player => self.settings.player_tag_threshold,
            _ => self.settings.tag_threshold,
        };
        if value.abs() >= threshold {
            tags.push(ScoreTag {
                text: if value > 0.0 { positive } else { negative },
                value,
                kind,
            });
        }
    }

    /// Tags for a summed matchup component. Item values are scaled so they
    /// add up to the (possibly clamped) component. If no single item reaches
    /// the threshold but the component does, one tag names every item pulling
    /// the same way.
    fn matchup_tags(
        &self,
        tags: &mut Vec<ScoreTag>,
        kind: TagKind,
        items: &[(&str, f64)],
        component: f64,
        label: impl Fn(bool, &str) -> String,
    ) {
        let raw: f64 = items.iter().map(|(_, d)| d).sum();
        let scale = if raw != 0.0 { component / raw } else { 1.0 };
        let before = tags.len();
        for &(name, delta) in items {
            self.tag(tags, kind, delta * scale, label(true, name), label(false, name));
        }

        if tags.len() == before && component.abs() >= self.settings.tag_threshold {
            let names: Vec<&str> = items
                .iter()
                .filter(|(_, d)| *d != 0.0 && d.signum() == component.signum())
                .map(|(name, _)| *name)
                .collect();
            tags.push(ScoreTag {
                text: label(component > 0.0, &names.join(", ")),
                value: component,
                kind,
            });
        }
    }

    pub fn score(
        &self,
        hero_id: &str,
        side: TeamSide,
        draft: &DraftState,
        context: &MatchContext,
        players: &PlayerProfileStore,
    ) -> HeroScore {
        let mut breakdown = ScoreBreakdown::default();
        let mut tags = Vec::new();
        let record = self.catalog.record(hero_id);

        if let Some(record) = record {
            breakdown.global = record.global.delta;
            self.tag(
                &mut tags,
                TagKind::Global,
                breakdown.global,
                "Strong pick overall".to_string(),
                "Weak pick overall".to_string(),
            );

            if let Some(map_id) = context.selected_map() {
                if let Some(delta) = record.map_delta(map_id) {
                    breakdown.map = self.clamp_component(delta);
                    let map_name = self.catalog.map_name(map_id);
                    self.tag(
                        &mut tags,
                        TagKind::Map,
                        breakdown.map,
                        format!("Strong on {}", map_name),
                        format!("Weak on {}", map_name),
                    );
                }
            }

            let enemies: Vec<(&str, f64)> = draft
                .team(side.opponent())
                .picked_heroes()
                .filter_map(|enemy| record.enemy_delta(enemy).map(|d| (self.catalog.hero_name(enemy), d)))
                .collect();
            breakdown.vs_enemies = self.clamp_component(enemies.iter().map(|(_, d)| d).sum());
            self.matchup_tags(&mut tags, TagKind::Enemy, &enemies, breakdown.vs_enemies, |good, names| {
                if good {
                    format!("Counters {}", names)
                } else {
                    format!("Countered by {}", names)
                }
            });

            let allies: Vec<(&str, f64)> = draft
                .team(side)
                .picked_heroes()
                .filter(|a| a.as_str() != hero_id)
                .filter_map(|ally| record.ally_delta(ally).map(|d| (self.catalog.hero_name(ally), d)))
                .collect();
            breakdown.with_allies = self.clamp_component(allies.iter().map(|(_, d)| d).sum());
            self.matchup_tags(&mut tags, TagKind::Ally, &allies, breakdown.with_allies, |good, names| {
                if good {
                    format!("Synergy with {}", names)
                } else {
                    format!("Poor synergy with {}", names)
                }
            });
        }

        let player = self.best_available_player(hero_id, side, draft, players);
        if let Some((identifier, delta)) = &player {
            breakdown.player_delta = *delta;
            self.tag(
                &mut tags,
                TagKind::Player,
                *delta,
                format!("Comfort pick for {}", identifier),
                format!("Weak pick for {}", identifier),
            );
        }

        let total = breakdown.total();
        debug!(
            "{} for {}: {:+.2} (global {:+.2}, map {:+.2}, enemies {:+.2}, allies {:+.2}, player {:+.2})",
            hero_id,
            side,
            total,
            breakdown.global,
            breakdown.map,
            breakdown.vs_enemies,
            breakdown.with_allies,
            breakdown.player_delta
        );

        HeroScore {
            hero_id: hero_id.to_string(),
            total,
            expected_win_rate: 50.0 + total,
            breakdown,
            tags,
            player: player
                .filter(|(_, delta)| *delta != 0.0)
                .map(|(identifier, _)| identifier),
        }
    }

    /// Largest-magnitude personal delta among players not yet bound to a picked
    /// hero. Ties go to the lowest player slot.
    fn best_available_player(
        &self,
        hero_id: &str,
        side: TeamSide,
        draft: &DraftState,
        players: &PlayerProfileStore,
    ) -> Option<(String, f64)> {
        let team = draft.team(side);
        let mut best: Option<(String, f64)> = None;
        for (slot, player) in players.roster(side).players() {
            if team.is_player_committed(slot) {
                continue;
            }
            let delta = player.hero_delta(hero_id);
            if best.as_ref().map_or(true, |(_, b)| delta.abs() > b.abs()) {
                best = Some((player.identifier.clone(), delta));
            }
        }
        best
    }
}
