//! # Configuration File
//!
//! One JSON document with a section per component. Every section is
//! optional and every field falls back to its default, so `{}` is a valid
//! configuration. The one derived default is `pid.track_center`, which
//! follows `physics.width` unless set explicitly.

use std::path::Path;

use anyhow::{Context, Result};
use control::PidConfig;
use physics::CartPoleConfig;
use runtime::{InputConfig, SchedulerConfig};
use serde::{Deserialize, Serialize};
use session::SessionConfig;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub physics: CartPoleConfig,
    pub pid: PidConfig,
    pub scheduler: SchedulerConfig,
    pub input: InputConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Read `path`, or the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// # Errors
    ///
    /// Malformed JSON or a field of the wrong type.
    pub fn parse(text: &str) -> Result<Self> {
        let document: serde_json::Value = serde_json::from_str(text)?;
        let centre_given = document.pointer("/pid/track_center").is_some();
        let mut config: Self = serde_json::from_value(document)?;
        if !centre_given {
            config.pid.track_center = config.physics.track_center();
        }
        Ok(config)
    }
}
