//! # Cart-Pole
//!
//! Command-line front-end for the cart-pole workspace.
//!
//! -   `cartpole simulate` runs the local engine under the PID law, flat out
//!     or in realtime, optionally hot-reloading gains from the config file.
//! -   `cartpole session` drives a remote simulation server and prints what
//!     it reports.
//!
//! ## The Crates
//!
//! -   [`physics`]: constrained 2-D rigid-body world and the cart-pole
//!     assembly built in it.
//! -   [`control`]: the controller capability, the first-enabled-wins
//!     registry and the PID law.
//! -   [`runtime`]: the fixed-timestep scheduler and the input router.
//! -   [`session`]: the Socket.IO session client for remote simulations.

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod watcher;

pub use control;
pub use physics;
pub use runtime;
pub use session;
