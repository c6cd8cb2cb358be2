//! Environment-driven application configuration.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use std::env;
use std::time::Duration;

use crate::api::Credentials;
use crate::db::DbConfig;

/// Login endpoint of the brokerage API (demo environment).
pub const DEFAULT_BASE_URL: &str = "https://demo-kabuka.e-shiten.jp/e_api_v4r3/";

/// Cadence of the board polling loop.
const DEFAULT_POLL_INTERVAL_MS: u64 = 125;

/// Upper bound on concurrently in-flight fetch+persist cycles.
const DEFAULT_MAX_WORKERS: usize = 10;

/// Tokyo session close; the loop drains after crossing it.
const DEFAULT_SESSION_CLOSE: &str = "15:00";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub broker: Credentials,
    pub base_url: String,
    pub poll_interval: Duration,
    pub max_workers: usize,
    pub session_close: NaiveTime,
    /// Explicit code list override; when absent the codes assigned to
    /// `api_id` are looked up from the master table at startup.
    pub target_codes: Option<Vec<String>>,
    pub api_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db = Self::db_from_env()?;

        let broker = Credentials {
            user_id: required("TACHIBANA_USERID")?,
            password: required("TACHIBANA_PASSWORD")?,
            password_sec: required("TACHIBANA_PASSWORD2")?,
        };

        let base_url =
            env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let poll_interval_ms = env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_MS.to_string())
            .parse()
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        let max_workers = env::var("MAX_WORKERS")
            .unwrap_or_else(|_| DEFAULT_MAX_WORKERS.to_string())
            .parse()
            .unwrap_or(DEFAULT_MAX_WORKERS);

        let session_close_raw =
            env::var("SESSION_CLOSE").unwrap_or_else(|_| DEFAULT_SESSION_CLOSE.to_string());
        let session_close = parse_close_time(&session_close_raw)
            .with_context(|| format!("invalid SESSION_CLOSE value: {session_close_raw:?}"))?;

        let target_codes = env::var("TARGET_CODES").ok().map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        // The grouping id defaults to the broker user id: each account polls
        // the codes that were assigned to it.
        let api_id = env::var("API_ID").unwrap_or_else(|_| broker.user_id.clone());

        Ok(Self {
            db,
            broker,
            base_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_workers: max_workers.max(1),
            session_close,
            target_codes,
            api_id,
        })
    }

    /// Database-only subset used by the batch binaries, which have no
    /// business requiring broker credentials.
    pub fn db_from_env() -> Result<DbConfig> {
        dotenv::dotenv().ok();
        Ok(DbConfig {
            host: required("POSTGRES_HOST")?,
            database: required("POSTGRES_DB")?,
            user: required("POSTGRES_USER")?,
            password: required("POSTGRES_PASSWORD")?,
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("missing required environment variable {name}"))
}

/// Accepts `HH:MM` or `HH:MM:SS`.
fn parse_close_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_time_accepts_both_layouts() {
        assert_eq!(
            parse_close_time("15:00"),
            NaiveTime::from_hms_opt(15, 0, 0)
        );
        assert_eq!(
            parse_close_time("11:30:15"),
            NaiveTime::from_hms_opt(11, 30, 15)
        );
        assert_eq!(parse_close_time("25:00"), None);
        assert_eq!(parse_close_time("1500"), None);
    }
}
