#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Cart-Pole Runtime
//!
//! The fixed-timestep loop that joins the physics engine and the controller
//! registry, plus the input router that turns keys and a slider into a manual
//! force.
//!
//! A [`Scheduler`] is driven from a single thread, either tick by tick
//! ([`Scheduler::tick`], [`Scheduler::run_ticks`]) or at wall-clock rate
//! ([`Scheduler::run_realtime`]). Other threads use a [`SchedulerHandle`];
//! their commands take effect at the next tick boundary.

pub mod command;
pub mod error;
pub mod input;
pub mod scheduler;

pub use command::{SchedulerCommand, SchedulerHandle};
pub use error::SchedulerError;
pub use input::{InputConfig, InputRouter, Key, UnknownKey};
pub use scheduler::{Phase, Scheduler, SchedulerConfig, TickFrame};
