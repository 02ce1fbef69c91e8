//! Engine configuration.
//!
//! Defaults match the interactive tool's behaviour; every field can be
//! overridden from JSON or, for the common knobs, from the environment.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::focus::FitBounds;
use crate::layout::{FanOut, Grid};
use crate::{Error, Result};

/// Environment variables consulted for the annotation credential, in order.
pub const API_KEY_VARS: [&str; 2] = ["CODELENS_API_KEY", "API_KEY"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay before focus dimming reverts on its own.
    #[serde(with = "millis")]
    pub dim_revert: Duration,
    /// How long `Session::is_saving` stays true after a write-through.
    #[serde(with = "millis")]
    pub saving_indicator: Duration,
    /// Snapshot cache lifetime.
    #[serde(with = "millis")]
    pub cache_ttl: Duration,
    /// Host prefix for tree/blob view links.
    pub view_base_url: String,
    pub fit: FitBounds,
    pub fan_out: FanOut,
    pub grid: Grid,
    /// Cap on paths kept from a repository tree listing.
    pub max_tree_paths: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dim_revert: Duration::from_secs(15),
            saving_indicator: Duration::from_millis(800),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            view_base_url: "https://github.com".to_string(),
            fit: FitBounds::default(),
            fan_out: FanOut::default(),
            grid: Grid::default(),
            max_tree_paths: 5000,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `CODELENS_DIM_REVERT_MS`,
    /// `CODELENS_CACHE_TTL_HOURS` and `CODELENS_VIEW_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key → value lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(ms) = lookup("CODELENS_DIM_REVERT_MS") {
            self.dim_revert = Duration::from_millis(parse_number("CODELENS_DIM_REVERT_MS", &ms)?);
        }
        if let Some(hours) = lookup("CODELENS_CACHE_TTL_HOURS") {
            let hours = parse_number("CODELENS_CACHE_TTL_HOURS", &hours)?;
            self.cache_ttl = Duration::from_secs(hours * 60 * 60);
        }
        if let Some(url) = lookup("CODELENS_VIEW_BASE_URL") {
            self.view_base_url = url;
        }
        Ok(self)
    }

    /// Cache lifetime as a chrono delta, saturating on overflow.
    pub fn cache_ttl_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.cache_ttl).unwrap_or(TimeDelta::MAX)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.trim().parse()
        .map_err(|_| Error::Configuration(format!("{key} must be a non-negative integer, got '{value}'")))
}

/// The annotation service credential, or `Error::Configuration` if none is set.
pub fn api_key_from_env() -> Result<String> {
    api_key_from(|key| std::env::var(key).ok())
}

pub fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    API_KEY_VARS.iter()
        .filter_map(|k| lookup(k))
        .find(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Configuration(format!(
            "no annotation credential configured; set {}", API_KEY_VARS.join(" or "),
        )))
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
