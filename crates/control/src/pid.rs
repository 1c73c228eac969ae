//! # PID Control Law
//!
//! Two PID terms summed into one cart force: pole-angle stabilisation and
//! cart centring. Outside the guard band the law disengages and outputs 0
//! rather than fight a pole that has already fallen.

use std::collections::VecDeque;

use physics::BodyState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::controller::Controller;
use crate::error::ControlError;

/// Samples kept per error history.
pub const HISTORY_CAPACITY: usize = 1000;

/// Proportional, integral and derivative gains of one term.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Gains {
    #[must_use]
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }
}

/// Full parameter set of [`PidController`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub pole: Gains,
    pub cart: Gains,
    /// Target pole angle in radians; 0 is upright.
    pub pole_setpoint: f64,
    /// Target cart position in px.
    pub track_center: f64,
    /// Largest `|pole_angle|` (rad) at which the law still acts.
    pub guard_band: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            pole: Gains::new(0.05, 0.0, 0.3),
            cart: Gains::new(0.0, 0.0, 0.0),
            pole_setpoint: 0.0,
            track_center: 600.0,
            guard_band: 0.5,
        }
    }
}

/// Bounded error history with a running sum.
///
/// Holds at most `capacity` samples, evicting the oldest first. The sum is
/// maintained incrementally and recomputed from the window once per
/// `capacity` pushes so rounding error cannot build up.
#[derive(Clone, Debug)]
pub struct ErrorHistory {
    samples: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    pushes_since_resum: usize,
}

impl ErrorHistory {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
            pushes_since_resum: 0,
        }
    }

    pub fn push(&mut self, error: f64) {
        if self.samples.len() == self.capacity {
            if let Some(evicted) = self.samples.pop_front() {
                self.sum -= evicted;
            }
        }
        self.samples.push_back(error);
        self.sum += error;

        self.pushes_since_resum += 1;
        if self.pushes_since_resum >= self.capacity {
            self.sum = self.samples.iter().sum();
            self.pushes_since_resum = 0;
        }
    }

    /// Most recent sample.
    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Sum over the retained window.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
        self.pushes_since_resum = 0;
    }

    /// Record `error` and return the PID output of `gains` for it. An empty
    /// history counts as a previous error of 0.
    fn term(&mut self, gains: Gains, error: f64) -> f64 {
        let derivative = self.last().map_or(error, |previous| error - previous);
        self.push(error);
        gains.kp * error + gains.ki * self.sum + gains.kd * derivative
    }
}

impl Default for ErrorHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

/// Guarded two-term PID law.
#[derive(Clone, Debug, Default)]
pub struct PidController {
    config: PidConfig,
    pole_history: ErrorHistory,
    cart_history: ErrorHistory,
}

impl PidController {
    #[must_use]
    pub fn new(config: PidConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    #[must_use]
    pub fn pole_history(&self) -> &ErrorHistory {
        &self.pole_history
    }

    #[must_use]
    pub fn cart_history(&self) -> &ErrorHistory {
        &self.cart_history
    }
}

impl Controller for PidController {
    fn compute(&mut self, state: &BodyState) -> Option<f64> {
        if !state.is_finite() {
            debug!(?state, "non-finite observation, no output");
            return None;
        }
        let cfg = self.config;
        let pole_error = state.pole_angle - cfg.pole_setpoint;
        let cart_error = state.cart_position - cfg.track_center;

        // Histories advance even while disengaged.
        let pole_term = self.pole_history.term(cfg.pole, pole_error);
        let cart_term = self.cart_history.term(cfg.cart, cart_error);

        if state.pole_angle.abs() > cfg.guard_band {
            trace!(angle = state.pole_angle, "outside guard band");
            return Some(0.0);
        }
        Some(pole_term + cart_term)
    }

    fn set_parameters(&mut self, params: &Value) -> Result<(), ControlError> {
        let patch = PidPatch::deserialize(params)?;
        let next = patch.apply(self.config)?;
        debug!(?next, "pid parameters set");
        self.config = next;
        Ok(())
    }

    fn reset(&mut self) {
        self.pole_history.clear();
        self.cart_history.clear();
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GainsPatch {
    kp: Option<f64>,
    ki: Option<f64>,
    kd: Option<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PidPatch {
    pole: Option<GainsPatch>,
    cart: Option<GainsPatch>,
    pole_setpoint: Option<f64>,
    track_center: Option<f64>,
    guard_band: Option<f64>,
}

fn non_negative(name: &str, value: f64) -> Result<f64, ControlError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ControlError::InvalidParameters(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

impl GainsPatch {
    fn apply(&self, prefix: &str, mut gains: Gains) -> Result<Gains, ControlError> {
        if let Some(kp) = self.kp {
            gains.kp = non_negative(&format!("{prefix}.kp"), kp)?;
        }
        if let Some(ki) = self.ki {
            gains.ki = non_negative(&format!("{prefix}.ki"), ki)?;
        }
        if let Some(kd) = self.kd {
            gains.kd = non_negative(&format!("{prefix}.kd"), kd)?;
        }
        Ok(gains)
    }
}

impl PidPatch {
    /// Validate every field before anything is changed.
    fn apply(&self, mut config: PidConfig) -> Result<PidConfig, ControlError> {
        if let Some(pole) = &self.pole {
            config.pole = pole.apply("pole", config.pole)?;
        }
        if let Some(cart) = &self.cart {
            config.cart = cart.apply("cart", config.cart)?;
        }
        if let Some(setpoint) = self.pole_setpoint {
            if !setpoint.is_finite() {
                return Err(ControlError::InvalidParameters(format!(
                    "pole_setpoint must be finite, got {setpoint}"
                )));
            }
            config.pole_setpoint = setpoint;
        }
        if let Some(center) = self.track_center {
            config.track_center = non_negative("track_center", center)?;
        }
        if let Some(band) = self.guard_band {
            config.guard_band = non_negative("guard_band", band)?;
        }
        Ok(config)
    }
}
