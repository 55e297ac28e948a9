// Heroes Profile endpoint paths and query builders

use crate::error::AppError;

pub const PLAYER_HEROES_PATH: &str = "Player/Hero/All";
pub const USER_AGENT: &str = concat!("hots_draft/", env!("CARGO_PKG_VERSION"));

/// Game type and date range used for every profile request.
pub const ALL_GAME_TYPES: &str = "all";
pub const LATEST_DATE_RANGE: &str = "latest";

/// Numeric region code used by the API. Accepts the code itself too.
pub fn region_code(region: &str) -> Result<u8, AppError> {
    match region.trim().to_ascii_lowercase().as_str() {
        "us" | "na" | "1" => Ok(1),
        "eu" | "2" => Ok(2),
        "kr" | "3" => Ok(3),
        "cn" | "5" => Ok(5),
        other => Err(AppError::ConfigError(format!(
            "Unknown region '{}', expected us, eu, kr or cn",
            other
        ))),
    }
}

/// Splits `Name#1234` into its name and numeric suffix.
pub fn parse_battletag(battletag: &str) -> Result<(&str, &str), AppError> {
    let battletag = battletag.trim();
    let invalid = || AppError::InvalidBattletag(battletag.to_string());

    let (name, digits) = battletag.split_once('#').ok_or_else(invalid)?;
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    Ok((name, digits))
}

pub fn player_heroes_url(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), PLAYER_HEROES_PATH)
}

/// Query pairs for the player hero endpoint; ureq encodes the `#`.
pub fn player_heroes_query(battletag: &str, region: u8, api_token: &str) -> Vec<(&'static str, String)> {
    vec![
        ("mode", "json".to_string()),
        ("battletag", battletag.trim().to_string()),
        ("region", region.to_string()),
        ("api_token", api_token.to_string()),
    ]
}
