use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::{
    error::{ConduitError, Result},
    session::DEFAULT_MAX_NAVIGATION_DEPTH,
};

pub const DEFAULT_SESSION_TTL_SECS: u64 = 90;
pub const DEFAULT_EXPIRED_MESSAGE: &str = "Your session has expired. Please dial again.";
pub const DEFAULT_UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable";

/// One entry of the ordered middleware list. The first entry is outermost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MiddlewareConfig {
    Logging,
    RateLimit {
        #[serde(default = "default_max_requests")]
        max_requests: u64,
        #[serde(default = "default_window_secs")]
        window_secs: u64,
    },
    SessionTracking,
}

fn default_max_requests() -> u64 {
    10
}

fn default_window_secs() -> u64 {
    60
}

/// Runtime settings shared by the request handler and the middleware chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConduitConfig {
    /// Idle time after which a session expires
    pub session_ttl_secs: u64,
    pub max_navigation_depth: usize,
    /// Hand ended conversations to the completion sink
    pub save_sessions: bool,
    pub expired_message: String,
    pub unavailable_message: String,
    pub middleware: Vec<MiddlewareConfig>,
}

impl Default for ConduitConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            max_navigation_depth: DEFAULT_MAX_NAVIGATION_DEPTH,
            save_sessions: true,
            expired_message: DEFAULT_EXPIRED_MESSAGE.to_string(),
            unavailable_message: DEFAULT_UNAVAILABLE_MESSAGE.to_string(),
            middleware: Vec::new(),
        }
    }
}

fn env_var<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConduitError::Config(format!("{name}={value}: {e}"))),
        Err(_) => Ok(None),
    }
}

impl ConduitConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Defaults overridden by `CONDUIT_SESSION_TTL_SECS`,
    /// `CONDUIT_MAX_NAVIGATION_DEPTH` and `CONDUIT_SAVE_SESSIONS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(ttl) = env_var("CONDUIT_SESSION_TTL_SECS")? {
            config.session_ttl_secs = ttl;
        }
        if let Some(depth) = env_var("CONDUIT_MAX_NAVIGATION_DEPTH")? {
            config.max_navigation_depth = depth;
        }
        if let Some(save) = env_var("CONDUIT_SAVE_SESSIONS")? {
            config.save_sessions = save;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConduitError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ConduitError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    fn validate(&self) -> Result<()> {
        if self.max_navigation_depth == 0 {
            return Err(ConduitError::Config(
                "max_navigation_depth must be at least 1".to_string(),
            ));
        }
        for entry in &self.middleware {
            if let MiddlewareConfig::RateLimit {
                max_requests: 0, ..
            }
            | MiddlewareConfig::RateLimit { window_secs: 0, .. } = entry
            {
                return Err(ConduitError::Config(
                    "rate_limit needs a non-zero max_requests and window_secs".to_string(),
                ));
            }
        }
        Ok(())
    }
}
