//! Runtime settings: API access, loop timing and the color policy

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::color_policy::ColorPolicy;
use crate::constants::{api, validation};
use crate::monitor::TieBreak;

/// Everything the keeper needs besides the image and origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,

    /// Transport retries on 5xx and connection failures
    pub retry_attempts: u32,

    /// Sleep after a soft loop error, in seconds
    pub check_interval_secs: f64,

    pub request_timeout_secs: u64,

    pub tie_break: TieBreak,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    pub policy: ColorPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: api::DEFAULT_BASE_URL.to_string(),
            retry_attempts: 3,
            check_interval_secs: 1.0,
            request_timeout_secs: 30,
            tie_break: TieBreak::Random,
            access_token: None,
            refresh_token: None,
            policy: ColorPolicy::default(),
        }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Load from an explicit file (must exist) or the default location (optional),
    /// then apply environment overrides and clamp
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit.map_or_else(Self::default_path, Path::to_path_buf);
        let mut settings = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            let settings = Self::from_toml_str(&contents)
                .with_context(|| format!("Failed to parse TOML from {}", path.display()))?;
            info!(path = %path.display(), "Loaded config file");
            settings
        } else if explicit.is_some() {
            anyhow::bail!("Config file {} does not exist", path.display());
        } else {
            info!(path = %path.display(), "No config file found, using defaults");
            Self::default()
        };

        settings.apply_env_overrides(|var| std::env::var(var).ok());
        settings.validate_and_clamp();
        Ok(settings)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<T>
    where
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        let raw = lookup(var)?;
        raw.trim()
            .parse::<T>()
            .inspect_err(|e| error!(var = %var, error = %e, "failed to parse env var"))
            .ok()
    }

    /// Apply `PLACE_KEEPER_*` overrides; `lookup` is the environment
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup("PLACE_KEEPER_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(attempts) = Self::parse_var(&lookup, "PLACE_KEEPER_RETRY_ATTEMPTS") {
            self.retry_attempts = attempts;
        }
        if let Some(interval) = Self::parse_var(&lookup, "PLACE_KEEPER_CHECK_INTERVAL") {
            self.check_interval_secs = interval;
        }
        if let Some(token) = lookup("PLACE_KEEPER_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Some(token) = lookup("PLACE_KEEPER_REFRESH_TOKEN") {
            self.refresh_token = Some(token);
        }
    }

    /// Clamp values to safe ranges
    /// Called after loading TOML and applying overrides
    pub fn validate_and_clamp(&mut self) {
        use validation::*;

        if self.retry_attempts > MAX_RETRY_ATTEMPTS {
            warn!(retry_attempts = self.retry_attempts, max = MAX_RETRY_ATTEMPTS, "retry_attempts exceeds maximum, clamping");
            self.retry_attempts = MAX_RETRY_ATTEMPTS;
        }

        if !self.check_interval_secs.is_finite() || self.check_interval_secs < MIN_CHECK_INTERVAL {
            warn!(check_interval_secs = self.check_interval_secs, min = MIN_CHECK_INTERVAL, "check_interval_secs below minimum, clamping");
            self.check_interval_secs = MIN_CHECK_INTERVAL;
        } else if self.check_interval_secs > MAX_CHECK_INTERVAL {
            warn!(check_interval_secs = self.check_interval_secs, max = MAX_CHECK_INTERVAL, "check_interval_secs exceeds maximum, clamping");
            self.check_interval_secs = MAX_CHECK_INTERVAL;
        }

        if self.request_timeout_secs < MIN_REQUEST_TIMEOUT {
            warn!(request_timeout_secs = self.request_timeout_secs, min = MIN_REQUEST_TIMEOUT, "request_timeout_secs below minimum, clamping");
            self.request_timeout_secs = MIN_REQUEST_TIMEOUT;
        } else if self.request_timeout_secs > MAX_REQUEST_TIMEOUT {
            warn!(request_timeout_secs = self.request_timeout_secs, max = MAX_REQUEST_TIMEOUT, "request_timeout_secs exceeds maximum, clamping");
            self.request_timeout_secs = MAX_REQUEST_TIMEOUT;
        }

        let trimmed = self.base_url.trim_end_matches('/');
        if trimmed.len() != self.base_url.len() {
            self.base_url = trimmed.to_string();
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs_f64(self.check_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
