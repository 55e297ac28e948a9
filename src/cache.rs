use crate::api::models::PlayerHeroesResponse;
use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Identifies one cached profile response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileCacheKey {
    pub identifier: String,
    pub region: String,
    pub game_type: String,
    pub date_range: String,
}

impl ProfileCacheKey {
    pub fn new(identifier: &str, region: &str, game_type: &str, date_range: &str) -> Self {
        ProfileCacheKey {
            identifier: identifier.trim().to_string(),
            region: region.to_string(),
            game_type: game_type.to_string(),
            date_range: date_range.to_string(),
        }
    }

    fn file_name(&self) -> String {
        let raw = format!(
            "{}_{}_{}_{}",
            self.identifier, self.region, self.game_type, self.date_range
        );
        let safe: String = raw
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{}.json", safe.to_lowercase())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CachedProfile {
    pub key: ProfileCacheKey,
    pub fetched_at: DateTime<Utc>,
    pub response: PlayerHeroesResponse,
}

impl CachedProfile {
    pub fn is_stale(&self, ttl: Duration) -> bool {
        Utc::now().signed_duration_since(self.fetched_at) >= ttl
    }
}

/// On-disk JSON cache of player profile responses.
#[derive(Debug, Clone)]
pub struct ProfileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ProfileCache {
    pub fn new(dir: PathBuf, ttl_days: i64) -> Self {
        ProfileCache {
            dir,
            ttl: Duration::days(ttl_days),
        }
    }

    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hots_draft")
            .join("profiles")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &ProfileCacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Fresh cached response, if any. Unreadable entries count as misses.
    pub fn get(&self, key: &ProfileCacheKey) -> Option<PlayerHeroesResponse> {
        let path = self.path_for(key);
        let content = fs::read_to_string(&path).ok()?;
        let cached: CachedProfile = match serde_json::from_str(&content) {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                return None;
            }
        };
        if cached.key != *key {
            return None;
        }
        if cached.is_stale(self.ttl) {
            debug!("Cache entry for {} is stale", key.identifier);
            return None;
        }
        debug!("Cache hit for {}", key.identifier);
        Some(cached.response)
    }

    pub fn put(&self, key: &ProfileCacheKey, response: &PlayerHeroesResponse) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir)?;
        let cached = CachedProfile {
            key: key.clone(),
            fetched_at: Utc::now(),
            response: response.clone(),
        };
        let json = serde_json::to_string_pretty(&cached)
            .map_err(|e| AppError::JsonError(format!("Failed to serialize cache: {}", e)))?;
        fs::write(self.path_for(key), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn response() -> PlayerHeroesResponse {
        serde_json::from_str(r#"{"Storm League": {"Jaina": {"wins": 3, "losses": 2}}}"#).unwrap()
    }

    #[test]
    fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let cache = ProfileCache::new(dir.path().join("profiles"), 14);
        let key = ProfileCacheKey::new("Player#1234", "us", "all", "latest");

        assert!(cache.get(&key).is_none());
        cache.put(&key, &response()).unwrap();
        assert_eq!(cache.get(&key), Some(response()));

        let other_region = ProfileCacheKey::new("Player#1234", "eu", "all", "latest");
        assert!(cache.get(&other_region).is_none());
    }

    #[test]
    fn test_stale_entries_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ProfileCache::new(dir.path().to_path_buf(), 0);
        let key = ProfileCacheKey::new("Player#1234", "us", "all", "latest");
        cache.put(&key, &response()).unwrap();
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ProfileCache::new(dir.path().to_path_buf(), 14);
        let key = ProfileCacheKey::new("Player#1234", "us", "all", "latest");
        fs::write(dir.path().join(key.file_name()), "{not json").unwrap();
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_file_name_is_filesystem_safe() {
        let key = ProfileCacheKey::new("Ünï Côde#42", "us", "all", "latest");
        let name = key.file_name();
        assert!(!name.contains('#'));
        assert!(!name.contains(' '));
        assert!(name.ends_with(".json"));
    }
}
