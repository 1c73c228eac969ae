//! # Physics Simulation Core
//!
//! This module provides the main physics simulation structure. It owns the
//! bodies and constraints and coordinates the integration, constraint and
//! contact passes of every step.

use tracing::trace;

use crate::body::{BodyHandle, PointConstraint, RigidBody};
use crate::error::PhysicsError;
use crate::steps::{contact, integration, joint};
use crate::types::{PhysParams, Vec2};

/// Constrained 2-D rigid-body world.
#[derive(Clone, Debug, Default)]
pub struct PhysicsSim {
    pub params: PhysParams,
    pub(crate) bodies: Vec<RigidBody>,
    pub(crate) constraints: Vec<PointConstraint>,
}

impl PhysicsSim {
    /// Create a new empty simulation
    #[must_use]
    pub fn new(params: PhysParams) -> Self {
        Self {
            params,
            bodies: Vec::new(),
            constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.index())
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.index())
    }

    #[must_use]
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    #[must_use]
    pub fn constraints(&self) -> &[PointConstraint] {
        &self.constraints
    }

    /// Accumulate a force on a body until the end of the next step.
    ///
    /// # Errors
    ///
    /// Fails for an unknown handle or a non-finite force.
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec2) -> Result<(), PhysicsError> {
        if !force.is_finite() {
            return Err(PhysicsError::InvalidForce(if force.x.is_finite() {
                force.y
            } else {
                force.x
            }));
        }
        let body = self
            .bodies
            .get_mut(handle.index())
            .ok_or(PhysicsError::UnknownBody(handle.index()))?;
        if !body.is_static() {
            body.force += force;
        }
        Ok(())
    }

    /// Advance the world by `dt` milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::NonFiniteState`] naming the first body whose
    /// position or velocity is no longer finite. The world is left as it is;
    /// callers are expected to reset it.
    pub fn step(&mut self, dt: f64) -> Result<(), PhysicsError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        let substeps = self.params.substeps.max(1);
        let h = dt / f64::from(substeps);

        let mut contacts = 0;
        for _ in 0..substeps {
            integration::predict(&mut self.bodies, self.params.gravity, h);
            for _ in 0..self.params.iterations.max(1) {
                joint::solve_constraints(&mut self.bodies, &self.constraints);
                contacts += contact::solve_contacts(&mut self.bodies);
            }
            integration::recover_velocities(&mut self.bodies, h);
        }
        integration::finish_step(&mut self.bodies);
        trace!(dt, substeps, contacts, "physics step");

        match self.bodies.iter().find(|b| !b.is_finite()) {
            Some(body) => Err(PhysicsError::NonFiniteState { label: body.label }),
            None => Ok(()),
        }
    }

    /// Drop every body and constraint.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.constraints.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Shape;
    use crate::types::{category, CollisionFilter};

    #[test]
    fn pendulum_keeps_its_length() {
        let mut sim = PhysicsSim::default();
        let anchor = sim.add_body(RigidBody::fixed("anchor", Shape::Circle { radius: 1.0 }, Vec2::ZERO));
        let bob = sim.add_body(RigidBody::dynamic(
            "bob",
            Shape::Circle { radius: 1.0 },
            1.0,
            Vec2::new(100.0, 0.0),
        )
        .with_filter(CollisionFilter::isolated(category::POLE)));
        sim.add_constraint(PointConstraint {
            length: 100.0,
            ..PointConstraint::pin("rod", anchor, Vec2::ZERO, bob, Vec2::ZERO)
        });

        // A quarter period of a 100 px pendulum at 1000 px/s^2 is about 0.5 s.
        for _ in 0..30 {
            sim.step(1000.0 / 60.0).unwrap();
        }
        let r = sim.body(bob).unwrap().position.length();
        assert!((r - 100.0).abs() < 0.5, "rod length drifted to {r}");
        assert!(sim.body(bob).unwrap().position.y > 50.0, "bob should swing down");
    }

    #[test]
    fn rejects_bad_timestep_and_force() {
        let mut sim = PhysicsSim::default();
        let b = sim.add_body(RigidBody::dynamic("b", Shape::Circle { radius: 1.0 }, 1.0, Vec2::ZERO));
        assert_eq!(sim.step(0.0), Err(PhysicsError::InvalidTimestep(0.0)));
        assert!(matches!(
            sim.apply_force(b, Vec2::new(f64::NAN, 0.0)),
            Err(PhysicsError::InvalidForce(_))
        ));
        assert_eq!(
            sim.apply_force(BodyHandle(9), Vec2::ZERO),
            Err(PhysicsError::UnknownBody(9))
        );
    }

    #[test]
    fn forces_are_cleared_after_a_step() {
        let mut sim = PhysicsSim::new(PhysParams {
            gravity: Vec2::ZERO,
            ..PhysParams::default()
        });
        let b = sim.add_body(RigidBody::dynamic("b", Shape::Circle { radius: 1.0 }, 2.0, Vec2::ZERO));
        sim.apply_force(b, Vec2::new(0.004, 0.0)).unwrap();
        sim.step(10.0).unwrap();
        let v = sim.body(b).unwrap().velocity.x;
        assert!((v - 0.02).abs() < 1e-12, "force/mass*dt, got {v}");
        sim.step(10.0).unwrap();
        assert!((sim.body(b).unwrap().velocity.x - v).abs() < 1e-12);
    }
}
