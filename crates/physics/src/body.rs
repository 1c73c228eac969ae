//! Rigid bodies and the point constraints that bind them.

use crate::shapes::Shape;
use crate::types::{BodyKind, CollisionFilter, Vec2};

/// Index of a body inside a [`crate::PhysicsSim`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) usize);

impl BodyHandle {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A 2-D rigid body. Positions are in px, time in ms.
#[derive(Clone, Debug)]
pub struct RigidBody {
    pub label: &'static str,
    pub kind: BodyKind,
    pub shape: Shape,
    pub filter: CollisionFilter,
    pub mass: f64,
    pub inv_mass: f64,
    pub inertia: f64,
    pub inv_inertia: f64,
    pub position: Vec2,
    pub angle: f64,
    pub velocity: Vec2,
    pub angular_velocity: f64,
    /// Fraction of velocity removed per step; 0 is frictionless.
    pub friction_air: f64,
    /// Force accumulated since the last step.
    pub force: Vec2,
    pub(crate) prev_position: Vec2,
    pub(crate) prev_angle: f64,
}

impl RigidBody {
    /// Dynamic body with inertia derived from its shape.
    #[must_use]
    pub fn dynamic(label: &'static str, shape: Shape, mass: f64, position: Vec2) -> Self {
        let inertia = shape.inertia(mass);
        Self {
            label,
            kind: BodyKind::Dynamic,
            shape,
            filter: CollisionFilter::default(),
            mass,
            inv_mass: if mass > 0.0 { 1.0 / mass } else { 0.0 },
            inertia,
            inv_inertia: if inertia > 0.0 { 1.0 / inertia } else { 0.0 },
            position,
            angle: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            friction_air: 0.0,
            force: Vec2::ZERO,
            prev_position: position,
            prev_angle: 0.0,
        }
    }

    /// Immovable body (infinite mass).
    #[must_use]
    pub fn fixed(label: &'static str, shape: Shape, position: Vec2) -> Self {
        Self {
            kind: BodyKind::Static,
            mass: f64::INFINITY,
            inv_mass: 0.0,
            inertia: f64::INFINITY,
            inv_inertia: 0.0,
            ..Self::dynamic(label, shape, 0.0, position)
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    /// World position of a body-local point.
    #[must_use]
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.position + local.rotate(self.angle)
    }

    /// Move the body to a pose and zero its motion.
    pub fn place(&mut self, position: Vec2, angle: f64) {
        self.position = position;
        self.prev_position = position;
        self.angle = angle;
        self.prev_angle = angle;
        self.velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
        self.force = Vec2::ZERO;
    }

    /// Generalised inverse mass for a correction along `normal` applied at
    /// world offset `r` from the centre.
    #[must_use]
    pub fn generalized_inverse_mass(&self, r: Vec2, normal: Vec2) -> f64 {
        let rn = r.cross(normal);
        self.inv_mass + self.inv_inertia * rn * rn
    }

    /// Apply a positional impulse `p` at world offset `r`.
    pub fn apply_correction(&mut self, r: Vec2, p: Vec2) {
        self.position += p * self.inv_mass;
        self.angle += self.inv_inertia * r.cross(p);
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.angle.is_finite()
            && self.angular_velocity.is_finite()
    }
}

/// Joint binding a point on `body_a` to a point on `body_b`.
///
/// `stiffness` 1 with `length` 0 is an ideal hinge: the points coincide
/// after every projection pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointConstraint {
    pub label: &'static str,
    pub body_a: BodyHandle,
    pub point_a: Vec2,
    pub body_b: BodyHandle,
    pub point_b: Vec2,
    pub length: f64,
    pub stiffness: f64,
}

impl PointConstraint {
    /// Rigid pin joint: zero rest length, full stiffness.
    #[must_use]
    pub const fn pin(
        label: &'static str,
        body_a: BodyHandle,
        point_a: Vec2,
        body_b: BodyHandle,
        point_b: Vec2,
    ) -> Self {
        Self {
            label,
            body_a,
            point_a,
            body_b,
            point_b,
            length: 0.0,
            stiffness: 1.0,
        }
    }
}
