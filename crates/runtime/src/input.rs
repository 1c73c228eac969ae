//! # Input Router
//!
//! Turns held arrow keys and a continuous slider into one manual force.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Directional keys understood by the router.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
}

impl Key {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArrowLeft => "ArrowLeft",
            Self::ArrowRight => "ArrowRight",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown key `{0}`")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ArrowLeft" | "a" | "A" => Ok(Self::ArrowLeft),
            "ArrowRight" | "d" | "D" => Ok(Self::ArrowRight),
            other => Err(UnknownKey(other.to_owned())),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Force contributed by a held arrow key.
    pub key_force: f64,
    /// Force per slider unit.
    pub slider_scale: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            key_force: 0.01,
            slider_scale: 0.001,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct InputRouter {
    config: InputConfig,
    left: bool,
    right: bool,
    slider: f64,
}

impl InputRouter {
    #[must_use]
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn held_mut(&mut self, key: Key) -> &mut bool {
        match key {
            Key::ArrowLeft => &mut self.left,
            Key::ArrowRight => &mut self.right,
        }
    }

    /// Press edge. Returns `false` for auto-repeat of a key already held.
    pub fn key_down(&mut self, key: Key) -> bool {
        let held = self.held_mut(key);
        let changed = !*held;
        *held = true;
        if changed {
            debug!(%key, "key down");
        }
        changed
    }

    /// Release edge. Returns `false` if the key was not held.
    pub fn key_up(&mut self, key: Key) -> bool {
        let held = self.held_mut(key);
        let changed = *held;
        *held = false;
        if changed {
            debug!(%key, "key up");
        }
        changed
    }

    #[must_use]
    pub fn is_held(&self, key: Key) -> bool {
        match key {
            Key::ArrowLeft => self.left,
            Key::ArrowRight => self.right,
        }
    }

    /// Set the slider position. Non-finite values are ignored.
    pub fn set_slider(&mut self, value: f64) {
        if value.is_finite() {
            self.slider = value;
        } else {
            warn!(value, "ignoring non-finite slider value");
        }
    }

    #[must_use]
    pub fn slider(&self) -> f64 {
        self.slider
    }

    /// Release every key and centre the slider.
    pub fn clear(&mut self) {
        self.left = false;
        self.right = false;
        self.slider = 0.0;
    }

    /// Current manual force: slider plus held keys.
    #[must_use]
    pub fn force(&self) -> f64 {
        let direction = f64::from(u8::from(self.right)) - f64::from(u8::from(self.left));
        self.slider * self.config.slider_scale + direction * self.config.key_force
    }
}
