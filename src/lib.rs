//! # hots_draft
//!
//! Pick and ban recommendations for a 5v5 hero draft.
//!
//! - **catalog**: hero, map and matchup statistics (plus the combine step that builds them)
//! - **draft**: the pick/ban board and the session controller that drives it
//! - **analysis**: player profiles, hero-to-player assignment, scoring and ranking
//! - **api**: Heroes Profile client for player profiles
//! - **cache** / **teams**: on-disk profile cache and saved rosters

pub mod analysis;
pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod display;
pub mod draft;
pub mod error;
pub mod teams;

#[cfg(test)]
mod test_support;
