//! Central module for application-wide configuration settings.
//!
//! Settings come from the environment: the provider URL and anon key, the
//! optional administrator registration code, and where tab-scoped session
//! snapshots live.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),

    #[error("invalid {key} value: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub admin_secret_code: Option<String>,
    pub session_dir: PathBuf,
    pub tab_id: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `load` uses the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let supabase_url = required("SUPABASE_URL")?;
        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;
        let admin_secret_code = lookup("ADMIN_SECRET_CODE").filter(|v| !v.is_empty());
        if admin_secret_code.is_none() {
            warn!("ADMIN_SECRET_CODE not set, administrator registration is disabled");
        }

        let session_dir: String = try_load(&lookup, "EGGGO_SESSION_DIR", ".eggo-session")?;
        let tab_id: String = try_load(&lookup, "EGGGO_TAB_ID", "default")?;
        let timeout_secs: u64 = try_load(&lookup, "EGGGO_REQUEST_TIMEOUT_SECS", "30")?;

        Ok(Self {
            supabase_url: with_trailing_slash(supabase_url),
            supabase_anon_key,
            admin_secret_code,
            session_dir: PathBuf::from(session_dir),
            tab_id,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        })
}

// Url::join drops the last path segment without it.
fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
