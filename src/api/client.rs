use crate::analysis::profile_store::{PlayerProfile, ProfileFetcher};
use crate::cache::{ProfileCache, ProfileCacheKey};
use crate::catalog::StatsCatalog;
use crate::config::Config;
use crate::error::AppError;
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::endpoints::{
    parse_battletag, player_heroes_query, player_heroes_url, region_code, ALL_GAME_TYPES,
    LATEST_DATE_RANGE, USER_AGENT,
};
use super::models::PlayerHeroesResponse;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HeroesProfileClient {
    agent: ureq::Agent,
    base_url: String,
    api_token: String,
    region: String,
    region_code: u8,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    cache: Option<ProfileCache>,
    bypass_cache: bool,
}

impl HeroesProfileClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let api_token = config.api_token()?.to_string();
        let region_code = region_code(&config.region)?;
        let per_second = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            AppError::ConfigError("HOTS_REQUESTS_PER_SECOND must be at least 1".to_string())
        })?;
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build();

        Ok(HeroesProfileClient {
            agent,
            base_url: config.api_base_url.clone(),
            api_token,
            region: config.region.to_ascii_lowercase(),
            region_code,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
            cache: None,
            bypass_cache: false,
        })
    }

    pub fn with_cache(mut self, cache: ProfileCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Skips cache reads; fresh responses are still written back.
    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    fn wait_for_slot(&self) {
        let clock = DefaultClock::default();
        while let Err(not_until) = self.rate_limiter.check() {
            thread::sleep(not_until.wait_time_from(clock.now()));
        }
    }

    fn execute_request(&self, battletag: &str) -> Result<String, AppError> {
        let url = player_heroes_url(&self.base_url);
        let query = player_heroes_query(battletag, self.region_code, &self.api_token);
        let fetch_error = |reason: String| AppError::ProfileFetch {
            identifier: battletag.to_string(),
            reason,
        };

        let mut retry_count = 0;
        loop {
            self.wait_for_slot();
            let mut request = self.agent.get(&url);
            for (name, value) in &query {
                request = request.query(name, value);
            }

            match request.call() {
                Ok(resp) => {
                    return resp.into_string().map_err(|e| fetch_error(e.to_string()));
                }
                Err(ureq::Error::Status(429, _)) => {
                    if retry_count >= MAX_RETRIES {
                        return Err(AppError::RateLimited);
                    }
                    let wait_ms = 2000 * (retry_count + 1) as u64;
                    warn!("Rate limited, waiting {}ms before retry...", wait_ms);
                    thread::sleep(Duration::from_millis(wait_ms));
                    retry_count += 1;
                }
                Err(ureq::Error::Status(code, _)) => {
                    return Err(fetch_error(format!("HTTP status {}", code)));
                }
                Err(e) => {
                    return Err(fetch_error(e.to_string()));
                }
            }
        }
    }

    pub fn fetch_player_heroes(&self, battletag: &str) -> Result<PlayerHeroesResponse, AppError> {
        parse_battletag(battletag)?;
        let battletag = battletag.trim();
        let key = ProfileCacheKey::new(battletag, &self.region, ALL_GAME_TYPES, LATEST_DATE_RANGE);

        if !self.bypass_cache {
            if let Some(response) = self.cache.as_ref().and_then(|c| c.get(&key)) {
                return Ok(response);
            }
        }

        info!("Fetching profile for {}", battletag);
        let body = self.execute_request(battletag)?;
        let response: PlayerHeroesResponse =
            serde_json::from_str(&body).map_err(|e| AppError::ProfileFetch {
                identifier: battletag.to_string(),
                reason: format!("unexpected response: {}", e),
            })?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&key, &response) {
                warn!("Could not cache profile for {}: {}", battletag, e);
            }
        }
        debug!("{} game types for {}", response.game_types.len(), battletag);
        Ok(response)
    }
}

impl ProfileFetcher for HeroesProfileClient {
    fn fetch_profile(&self, identifier: &str, catalog: &StatsCatalog) -> Result<PlayerProfile, AppError> {
        let response = self.fetch_player_heroes(identifier)?;
        Ok(response.into_profile(identifier.trim(), catalog))
    }
}
