//! Configuration module for the JobSwipe backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::triage::SwipeThresholds;

/// Default pause between a decision and the next card.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 250;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Gesture thresholds used by the classifier
    pub thresholds: SwipeThresholds,
    /// Pause after a decision before the cursor advances
    pub settle_delay: Duration,
    /// Put a card back at the end of the queue when its decision write fails
    pub requeue_failed: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("JOBSWIPE_API_PSK").ok().filter(|s| !s.is_empty());

        let db_path = env::var("JOBSWIPE_DB_PATH")
            .unwrap_or_else(|_| "./data/jobswipe.sqlite".to_string())
            .into();

        let index_path = env::var("JOBSWIPE_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = env::var("JOBSWIPE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| format!("Invalid JOBSWIPE_BIND_ADDR format: {}", e))?;

        let log_level = env::var("JOBSWIPE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = SwipeThresholds::default();
        let thresholds = SwipeThresholds {
            distance: positive("JOBSWIPE_SWIPE_DISTANCE", defaults.distance)?,
            velocity: positive("JOBSWIPE_SWIPE_VELOCITY", defaults.velocity)?,
        };

        let settle_delay = Duration::from_millis(parse_var(
            "JOBSWIPE_SETTLE_DELAY_MS",
            DEFAULT_SETTLE_DELAY_MS,
        )?);

        let requeue_failed = parse_var("JOBSWIPE_REQUEUE_FAILED", false)?;

        Ok(Self {
            api_psk,
            db_path,
            index_path,
            bind_addr,
            log_level,
            thresholds,
            settle_delay,
            requeue_failed,
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {} value {:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

/// Parse a threshold that must be finite and greater than zero.
fn positive(name: &str, default: f64) -> Result<f64, String> {
    let value = parse_var(name, default)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{} must be a positive number, got {}", name, value))
    }
}
