use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_LAB_SUFFIX: &str = " (Lab)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend_url: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
    pub lab_indicator_suffix: String,
}

impl AppConfig {
    /// Applies a `.env` file when present, then reads the process environment.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let config = Self {
            backend_url: env::var("WORKLIST_BACKEND_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("WORKLIST_BACKEND_URL not set, using empty value");
                    String::new()
                }),
            api_key: env::var("WORKLIST_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("WORKLIST_API_KEY not set, using empty value");
                    String::new()
                }),
            request_timeout_secs: env::var("WORKLIST_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|raw| match raw.trim().parse::<u64>() {
                    Ok(secs) if secs > 0 => Some(secs),
                    _ => {
                        warn!("WORKLIST_REQUEST_TIMEOUT_SECS is not a positive integer: {}", raw);
                        None
                    }
                })
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            lab_indicator_suffix: env::var("WORKLIST_LAB_SUFFIX")
                .unwrap_or_else(|_| DEFAULT_LAB_SUFFIX.to_string()),
        };

        if !config.is_configured() {
            warn!("Worklist client not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.backend_url.is_empty() && !self.api_key.is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            api_key: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            lab_indicator_suffix: DEFAULT_LAB_SUFFIX.to_string(),
        }
    }
}

/// Installs a global `tracing` subscriber driven by `RUST_LOG` (default `info`).
/// Calling it more than once is harmless; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the environment is not mutated concurrently.
    #[test]
    fn test_from_env_reads_and_defaults() {
        env::set_var("WORKLIST_BACKEND_URL", "https://clinic.example.org/");
        env::set_var("WORKLIST_API_KEY", "secret");
        env::set_var("WORKLIST_REQUEST_TIMEOUT_SECS", "zero");
        env::remove_var("WORKLIST_LAB_SUFFIX");

        let config = AppConfig::from_env();

        assert_eq!(config.backend_url, "https://clinic.example.org");
        assert!(config.is_configured());
        assert_eq!(config.request_timeout(), Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
        assert_eq!(config.lab_indicator_suffix, " (Lab)");

        env::set_var("WORKLIST_REQUEST_TIMEOUT_SECS", "30");
        assert_eq!(AppConfig::from_env().request_timeout_secs, 30);

        env::remove_var("WORKLIST_API_KEY");
        assert!(!AppConfig::from_env().is_configured());
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
