use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MAX_RECENT_TEAMS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentTeam {
    pub name: String,
    pub battletags: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Rosters saved between sessions, newest first.
#[derive(Debug)]
pub struct RecentTeams {
    path: PathBuf,
    teams: Vec<RecentTeam>,
}

impl RecentTeams {
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hots_draft")
            .join("recent_teams.json")
    }

    /// Reads the file at `path`; a missing file is an empty list.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let teams = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                AppError::JsonError(format!("Failed to parse recent teams: {}", e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(RecentTeams {
            path: path.to_path_buf(),
            teams,
        })
    }

    pub fn save(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.teams)
            .map_err(|e| AppError::JsonError(format!("Failed to serialize recent teams: {}", e)))?;
        fs::write(&self.path, json)?;
        debug!("Saved {} recent teams to {}", self.teams.len(), self.path.display());
        Ok(())
    }

    /// Records a roster. The same battletag list replaces its older entry.
    pub fn add(&mut self, name: &str, battletags: &[String]) -> &RecentTeam {
        let battletags: Vec<String> = battletags.iter().map(|b| b.trim().to_string()).collect();
        self.teams.retain(|team| team.battletags != battletags);
        self.teams.insert(
            0,
            RecentTeam {
                name: name.trim().to_string(),
                battletags,
                timestamp: Utc::now(),
            },
        );
        self.teams.truncate(MAX_RECENT_TEAMS);
        &self.teams[0]
    }

    pub fn list(&self) -> &[RecentTeam] {
        &self.teams
    }

    pub fn find(&self, name: &str) -> Option<&RecentTeam> {
        let name = name.trim();
        self.teams.iter().find(|team| team.name.eq_ignore_ascii_case(name))
    }

    pub fn require(&self, name: &str) -> Result<&RecentTeam, AppError> {
        self.find(name)
            .ok_or_else(|| AppError::TeamNotFound(name.trim().to_string()))
    }
}
