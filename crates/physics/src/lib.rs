#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Cart-Pole Physics Engine
//!
//! A small 2-D rigid-body engine and the cart-pole assembly built on it.
//!
//! The engine works in screen space (x right, y down) with lengths in px and
//! time in ms. Each call to [`PhysicsSim::step`] splits the timestep into
//! substeps; every substep predicts positions from velocity and force, then
//! repeatedly projects the pin constraints and ground contacts, and finally
//! recovers velocities from the corrected positions.
//!
//! ## Key Components
//!
//! -   **Bodies and constraints:** [`RigidBody`] and [`PointConstraint`] in
//!     the [`body`] module, with [`Shape`] describing their geometry.
//! -   **Simulation:** [`PhysicsSim`] owns the world and runs the solver
//!     passes found in [`steps`].
//! -   **Cart-pole:** [`CartPoleEngine`] assembles the cart, pole, wheels and
//!     ground and exposes the observation used by controllers.
//!
//! ## Usage
//!
//! ```rust
//! use physics::CartPoleEngine;
//!
//! let mut engine = CartPoleEngine::default();
//! engine.set_pole_angle(0.05)?;
//! engine.apply_force(0.01)?;
//! engine.step()?;
//! let state = engine.state();
//! assert!(state.cart_velocity > 0.0);
//! # Ok::<(), physics::PhysicsError>(())
//! ```

pub mod body;
pub mod builder;
pub mod cartpole;
pub mod error;
pub mod shapes;
pub mod simulation;
pub mod steps;
pub mod types;


pub use body::{BodyHandle, PointConstraint, RigidBody};
pub use cartpole::{CartPoleConfig, CartPoleEngine, TIMESTEP_MS};
pub use error::PhysicsError;
pub use shapes::Shape;
pub use simulation::PhysicsSim;
pub use types::{category, BodyKind, BodyPose, BodyState, CollisionFilter, PhysParams, Vec2};
