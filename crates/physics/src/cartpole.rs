//! CartPole assembly
//!
//! Builds the cart, pole, two wheels and ground inside a [`PhysicsSim`],
//! binds them with rigid pin constraints and exposes the control-facing
//! operations: step, state, force, reset and disturbance injection.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::body::{BodyHandle, PointConstraint, RigidBody};
use crate::error::PhysicsError;
use crate::shapes::Shape;
use crate::types::{category, BodyPose, BodyState, CollisionFilter, PhysParams, Vec2};
use crate::PhysicsSim;

/// Fixed engine timestep in milliseconds (60 Hz).
pub const TIMESTEP_MS: f64 = 1000.0 / 60.0;

const MS_PER_SECOND: f64 = 1000.0;

/// Geometry and mass of the cart-pole assembly.
///
/// Lengths are in px, masses in engine mass units. The default reproduces a
/// 1200 px wide scene with the cart centred at x = 600.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartPoleConfig {
    /// Scene width; the cart starts at `width / 2`.
    pub width: f64,
    /// Cart centre height (y down).
    pub cart_y: f64,
    pub cart_width: f64,
    pub cart_height: f64,
    pub cart_mass: f64,
    pub pole_width: f64,
    pub pole_length: f64,
    pub pole_mass: f64,
    pub wheel_radius: f64,
    pub wheel_mass: f64,
    /// Horizontal distance of each axle from the cart centre.
    pub wheel_offset: f64,
    pub ground_width: f64,
    pub ground_height: f64,
    #[serde(flatten)]
    pub params: PhysParams,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            cart_y: 350.0,
            cart_width: 200.0,
            cart_height: 50.0,
            cart_mass: 1.0,
            pole_width: 10.0,
            pole_length: 200.0,
            pole_mass: 1.0,
            wheel_radius: 30.0,
            wheel_mass: 0.5,
            wheel_offset: 70.0,
            ground_width: 81_000.0,
            ground_height: 60.0,
            params: PhysParams::default(),
        }
    }
}

impl CartPoleConfig {
    /// Horizontal centre of the track.
    #[must_use]
    pub fn track_center(&self) -> f64 {
        self.width / 2.0
    }

    /// Pivot on the cart, cart-local (top centre).
    fn pivot_on_cart(&self) -> Vec2 {
        Vec2::new(0.0, -self.cart_height / 2.0)
    }

    /// Pivot on the pole, pole-local (bottom centre).
    fn pivot_on_pole(&self) -> Vec2 {
        Vec2::new(0.0, self.pole_length / 2.0)
    }

    /// Axle on the cart for the wheel on `side` (-1 left, +1 right).
    fn axle_on_cart(&self, side: f64) -> Vec2 {
        Vec2::new(side * self.wheel_offset, self.cart_height / 2.0)
    }

    fn initial_cart_position(&self) -> Vec2 {
        Vec2::new(self.track_center(), self.cart_y)
    }

    /// Ground centre so that its top face touches the wheels at rest.
    fn ground_position(&self) -> Vec2 {
        let wheel_bottom = self.cart_y + self.cart_height / 2.0 + self.wheel_radius;
        Vec2::new(self.track_center(), wheel_bottom + self.ground_height / 2.0)
    }
}

/// The cart-pole physics engine: a [`PhysicsSim`] holding one rigid
/// cart/wheel assembly with a hinged pole, stepped at [`TIMESTEP_MS`].
#[derive(Debug)]
pub struct CartPoleEngine {
    sim: PhysicsSim,
    config: CartPoleConfig,
    cart: BodyHandle,
    pole: BodyHandle,
    wheels: [BodyHandle; 2],
    ground: BodyHandle,
}

impl Default for CartPoleEngine {
    fn default() -> Self {
        Self::new(CartPoleConfig::default())
    }
}

impl CartPoleEngine {
    /// Build the assembly in its upright, centred rest pose.
    #[must_use]
    pub fn new(config: CartPoleConfig) -> Self {
        let mut sim = PhysicsSim::new(config.params);
        let cart_filter = CollisionFilter::new(category::CART, category::GROUND);

        let ground = sim.add_body(
            RigidBody::fixed(
                "ground",
                Shape::Rectangle {
                    width: config.ground_width,
                    height: config.ground_height,
                },
                config.ground_position(),
            )
            .with_filter(CollisionFilter::new(category::GROUND, category::CART)),
        );

        let wheel = |label, side: f64| {
            let axle = config.initial_cart_position() + config.axle_on_cart(side);
            RigidBody::dynamic(
                label,
                Shape::Circle {
                    radius: config.wheel_radius,
                },
                config.wheel_mass,
                axle,
            )
            .with_filter(cart_filter)
        };
        let wheels = [
            sim.add_body(wheel("wheel_left", -1.0)),
            sim.add_body(wheel("wheel_right", 1.0)),
        ];

        let cart = sim.add_body(
            RigidBody::dynamic(
                "cart",
                Shape::Rectangle {
                    width: config.cart_width,
                    height: config.cart_height,
                },
                config.cart_mass,
                config.initial_cart_position(),
            )
            .with_filter(cart_filter),
        );

        let pivot = config.initial_cart_position() + config.pivot_on_cart();
        let pole = sim.add_body(
            RigidBody::dynamic(
                "pole",
                Shape::Rectangle {
                    width: config.pole_width,
                    height: config.pole_length,
                },
                config.pole_mass,
                pivot - config.pivot_on_pole(),
            )
            .with_filter(CollisionFilter::isolated(category::POLE)),
        );

        sim.add_constraint(PointConstraint::pin(
            "pivot",
            cart,
            config.pivot_on_cart(),
            pole,
            config.pivot_on_pole(),
        ));
        for (label, side, handle) in [("axle_left", -1.0, wheels[0]), ("axle_right", 1.0, wheels[1])] {
            sim.add_constraint(PointConstraint::pin(
                label,
                cart,
                config.axle_on_cart(side),
                handle,
                Vec2::ZERO,
            ));
        }

        info!(
            bodies = sim.bodies().len(),
            constraints = sim.constraints().len(),
            "cart-pole assembly created"
        );
        Self {
            sim,
            config,
            cart,
            pole,
            wheels,
            ground,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CartPoleConfig {
        &self.config
    }

    /// Underlying world, for inspection.
    #[must_use]
    pub fn sim(&self) -> &PhysicsSim {
        &self.sim
    }

    /// Advance by one fixed timestep.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::NonFiniteState`] when a body leaves the
    /// finite range; the engine must be reset before it is useful again.
    pub fn step(&mut self) -> Result<(), PhysicsError> {
        self.sim.step(TIMESTEP_MS)
    }

    /// Push the cart horizontally; the force acts at the cart centre for the
    /// next step only.
    ///
    /// # Errors
    ///
    /// Rejects a non-finite force.
    pub fn apply_force(&mut self, force: f64) -> Result<(), PhysicsError> {
        if !force.is_finite() {
            return Err(PhysicsError::InvalidForce(force));
        }
        self.sim.apply_force(self.cart, Vec2::new(force, 0.0))
    }

    /// Current observation. Pure read.
    #[must_use]
    pub fn state(&self) -> BodyState {
        let cart = &self.sim.bodies[self.cart.index()];
        let pole = &self.sim.bodies[self.pole.index()];
        BodyState {
            cart_position: cart.position.x,
            cart_velocity: cart.velocity.x * MS_PER_SECOND,
            pole_angle: (pole.position.x - cart.position.x).atan2(cart.position.y - pole.position.y),
            pole_angular_velocity: pole.angular_velocity * MS_PER_SECOND,
        }
    }

    /// Return every body to the centred, upright rest pose with zero motion.
    /// Constraints are untouched.
    pub fn reset(&mut self) {
        let cart_position = self.config.initial_cart_position();
        let pivot = cart_position + self.config.pivot_on_cart();
        let pole_position = pivot - self.config.pivot_on_pole();
        let wheel_positions = [
            cart_position + self.config.axle_on_cart(-1.0),
            cart_position + self.config.axle_on_cart(1.0),
        ];

        self.sim.bodies[self.cart.index()].place(cart_position, 0.0);
        self.sim.bodies[self.pole.index()].place(pole_position, 0.0);
        for (handle, position) in self.wheels.iter().zip(wheel_positions) {
            self.sim.bodies[handle.index()].place(position, 0.0);
        }
        debug!("cart-pole reset");
    }

    /// Tilt the pole so that [`Self::state`] reports `angle`, keeping the
    /// pivot joined and the pole's angular velocity.
    ///
    /// The reported angle is measured between the cart and pole centres, not
    /// at the hinge, so the pole centre is placed on the ray from the cart
    /// centre at `angle`, half a pole length from the world pivot. The cart
    /// may itself be tilted.
    ///
    /// # Errors
    ///
    /// Rejects a non-finite angle.
    pub fn set_pole_angle(&mut self, angle: f64) -> Result<(), PhysicsError> {
        if !angle.is_finite() {
            return Err(PhysicsError::InvalidAngle(angle));
        }
        let cart = self.sim.bodies[self.cart.index()].clone();
        let pivot = cart.world_point(self.config.pivot_on_cart());
        let half_length = self.config.pivot_on_pole().y;

        // |centre + t * ray - pivot| = half_length, far root.
        let ray = Vec2::new(angle.sin(), -angle.cos());
        let from_pivot = cart.position - pivot;
        let along = from_pivot.dot(ray);
        let discriminant = (along * along - from_pivot.dot(from_pivot) + half_length * half_length).max(0.0);
        let t = -along + discriminant.sqrt();

        let position = cart.position + ray * t;
        let offset = position - pivot;
        let hinge_angle = offset.x.atan2(-offset.y);

        let pole = &mut self.sim.bodies[self.pole.index()];
        pole.position = position;
        pole.prev_position = position;
        pole.angle = hinge_angle;
        pole.prev_angle = hinge_angle;
        pole.velocity = cart.velocity + offset.perp_scaled(pole.angular_velocity);
        debug!(angle, hinge_angle, "pole disturbed");
        Ok(())
    }

    /// Poses of every body in creation order, for an external renderer.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn poses(&self) -> Vec<BodyPose> {
        let kinds = [
            (self.ground, BodyPose::GROUND),
            (self.wheels[0], BodyPose::WHEEL),
            (self.wheels[1], BodyPose::WHEEL),
            (self.cart, BodyPose::CART),
            (self.pole, BodyPose::POLE),
        ];
        kinds
            .iter()
            .map(|&(handle, kind)| {
                let body = &self.sim.bodies[handle.index()];
                BodyPose {
                    x: body.position.x as f32,
                    y: body.position.y as f32,
                    angle: body.angle as f32,
                    kind,
                }
            })
            .collect()
    }

    /// Release every body and constraint.
    pub fn cleanup(mut self) {
        self.sim.clear();
        info!("cart-pole engine released");
    }
}
