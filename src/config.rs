use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Weekday;
use dotenvy::dotenv;

use crate::engine::EngineSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting, 0 disables it
    pub rate_protected_per_min: u32,

    pub rest_days: Vec<Weekday>,
    pub shift_cache_ttl_secs: u64,
    pub log_level: tracing::Level,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed<T>(key: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}"))
}

/// Comma separated weekday names, e.g. `Sat,Sun`. Empty means no rest days.
pub fn parse_rest_days(raw: &str) -> Result<Vec<Weekday>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Weekday>()
                .map_err(|_| anyhow::anyhow!("unknown weekday {s:?} in REST_DAYS"))
        })
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", "1000")?,

            rest_days: parse_rest_days(&env::var("REST_DAYS").unwrap_or_else(|_| "Sun".to_string()))?,
            shift_cache_ttl_secs: parsed("SHIFT_CACHE_TTL_SECS", "300")?,
            log_level: parsed("LOG_LEVEL", "debug")?,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            rest_days: self.rest_days.clone(),
            shift_cache_ttl: Duration::from_secs(self.shift_cache_ttl_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_days_parse() {
        assert_eq!(
            parse_rest_days("Sat, Sun").unwrap(),
            vec![Weekday::Sat, Weekday::Sun]
        );
        assert_eq!(parse_rest_days("").unwrap(), vec![]);
        assert!(parse_rest_days("Sun,Funday").is_err());
    }
}
