#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Cart-Pole Control
//!
//! Control laws for the cart-pole and the registry that arbitrates between
//! them.
//!
//! -   [`Controller`] is the capability every control law implements.
//! -   [`ControllerRegistry`] keeps laws in registration order and picks the
//!     force for a tick: the first enabled law that produces a value wins.
//! -   [`PidController`] balances the pole with a guarded PID law.

pub mod controller;
pub mod error;
pub mod pid;
pub mod registry;

pub use controller::Controller;
pub use error::ControlError;
pub use pid::{ErrorHistory, Gains, PidConfig, PidController, HISTORY_CAPACITY};
pub use registry::{ControlCommand, ControllerRegistry};
