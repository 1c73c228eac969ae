//! Plain data types shared by the world, the cart-pole assembly and the
//! crates that read physics state.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// 2-D vector in screen space (x right, y down).
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Scalar 2-D cross product (`z` component of the 3-D cross product).
    #[must_use]
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Rotate by `angle` radians using the body-angle convention of the world.
    #[must_use]
    pub fn rotate(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Velocity of a point at offset `self` on a body spinning at `omega`.
    #[must_use]
    pub fn perp_scaled(self, omega: f64) -> Self {
        Self::new(-omega * self.y, omega * self.x)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Whether the integrator moves a body.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Static,
    Dynamic,
}

/// Collision category bits used by the cart-pole assembly.
pub mod category {
    pub const CART: u32 = 0x0001;
    pub const POLE: u32 = 0x0002;
    pub const GROUND: u32 = 0x0004;
}

/// Category/mask pair deciding which bodies may touch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CollisionFilter {
    pub category: u32,
    pub mask: u32,
}

impl CollisionFilter {
    #[must_use]
    pub const fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    /// A body in its own category that touches nothing.
    #[must_use]
    pub const fn isolated(category: u32) -> Self {
        Self { category, mask: 0 }
    }

    /// Both sides must accept each other.
    #[must_use]
    pub const fn collides_with(&self, other: &Self) -> bool {
        (self.mask & other.category) != 0 && (other.mask & self.category) != 0
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::new(0x0001, u32::MAX)
    }
}

/// Global integration parameters of a [`crate::PhysicsSim`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysParams {
    /// Acceleration in px/ms^2 (y down).
    pub gravity: Vec2,
    /// Integration substeps per call to `step`.
    pub substeps: u32,
    /// Constraint and contact projection passes per substep.
    pub iterations: u32,
}

impl Default for PhysParams {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 0.001),
            substeps: 8,
            iterations: 4,
        }
    }
}

/// Cart-pole observation produced once per tick.
///
/// `pole_angle` is the signed deviation from vertical in radians, positive
/// when the pole leans towards +x. Velocities are per second.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BodyState {
    pub cart_position: f64,
    pub cart_velocity: f64,
    pub pole_angle: f64,
    pub pole_angular_velocity: f64,
}

impl BodyState {
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cart_position.is_finite()
            && self.cart_velocity.is_finite()
            && self.pole_angle.is_finite()
            && self.pole_angular_velocity.is_finite()
    }
}

/// Pose of a single body, laid out for direct upload by an external renderer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BodyPose {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Index into [`BodyPose::KIND_NAMES`].
    pub kind: u32,
}

impl BodyPose {
    pub const GROUND: u32 = 0;
    pub const CART: u32 = 1;
    pub const POLE: u32 = 2;
    pub const WHEEL: u32 = 3;
    pub const KIND_NAMES: [&'static str; 4] = ["ground", "cart", "pole", "wheel"];

    /// Raw bytes of a pose slice.
    #[must_use]
    pub fn as_bytes(poses: &[Self]) -> &[u8] {
        bytemuck::cast_slice(poses)
    }
}
