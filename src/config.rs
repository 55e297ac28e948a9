use crate::analysis::scoring::ScoringSettings;
use crate::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "https://api.heroesprofile.com/api";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: Option<String>,
    pub region: String,
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub cache_ttl_days: i64,
    pub requests_per_second: u32,
    /// Symmetric cap on the map, enemy and ally components. `None` leaves them raw.
    pub component_clamp: Option<f64>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup("HEROES_PROFILE_TOKEN").filter(|t| !t.trim().is_empty());
        let region = lookup("HEROES_PROFILE_REGION").unwrap_or_else(|| "us".to_string());
        let api_base_url =
            lookup("HEROES_PROFILE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let data_dir = lookup("HOTS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let cache_ttl_days: i64 = parse_var(&lookup, "HOTS_CACHE_TTL_DAYS")?.unwrap_or(14);
        let requests_per_second: u32 = parse_var(&lookup, "HOTS_REQUESTS_PER_SECOND")?.unwrap_or(2);
        if requests_per_second == 0 {
            return Err(AppError::ConfigError(
                "HOTS_REQUESTS_PER_SECOND must be at least 1".to_string(),
            ));
        }

        let component_clamp: Option<f64> = parse_var(&lookup, "HOTS_COMPONENT_CLAMP")?;
        if let Some(clamp) = component_clamp {
            if clamp <= 0.0 || !clamp.is_finite() {
                return Err(AppError::ConfigError(
                    "HOTS_COMPONENT_CLAMP must be a positive number".to_string(),
                ));
            }
        }

        Ok(Config {
            api_token,
            region,
            api_base_url,
            data_dir,
            cache_ttl_days,
            requests_per_second,
            component_clamp,
        })
    }

    pub fn api_token(&self) -> Result<&str, AppError> {
        self.api_token.as_deref().ok_or_else(|| {
            AppError::ConfigError("HEROES_PROFILE_TOKEN not found in .env file".to_string())
        })
    }

    pub fn scoring_settings(&self) -> ScoringSettings {
        ScoringSettings {
            component_clamp: self.component_clamp,
            ..ScoringSettings::default()
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::ConfigError(format!("{} has an invalid value: {}", key, raw))),
    }
}
