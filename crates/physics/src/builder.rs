//! # Physics Simulation Builder
//!
//! Builder methods for adding bodies and constraints to a [`PhysicsSim`].

use crate::body::{BodyHandle, PointConstraint, RigidBody};
use crate::PhysicsSim;

impl PhysicsSim {
    /// Add a body and return its handle.
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        self.bodies.push(body);
        BodyHandle(self.bodies.len() - 1)
    }

    /// Add a constraint between two existing bodies.
    ///
    /// Returns the constraint index.
    pub fn add_constraint(&mut self, constraint: PointConstraint) -> usize {
        self.constraints.push(constraint);
        self.constraints.len() - 1
    }
}
