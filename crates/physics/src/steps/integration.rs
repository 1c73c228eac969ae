//! # Integration
//!
//! Semi-implicit Euler prediction followed by velocity recovery from the
//! projected positions. Static bodies are skipped.

use crate::body::RigidBody;
use crate::types::Vec2;

/// Predict positions for one substep of length `h` (ms).
///
/// External force is spread evenly over the substeps so one call to
/// `PhysicsSim::step` delivers `force / mass * dt` of velocity change.
pub fn predict(bodies: &mut [RigidBody], gravity: Vec2, h: f64) {
    for body in bodies.iter_mut().filter(|b| !b.is_static()) {
        body.velocity += (gravity + body.force * body.inv_mass) * h;
        body.prev_position = body.position;
        body.position += body.velocity * h;

        body.prev_angle = body.angle;
        body.angle += body.angular_velocity * h;
    }
}

/// Derive velocities from the position change of the substep.
pub fn recover_velocities(bodies: &mut [RigidBody], h: f64) {
    let inv_h = 1.0 / h;
    for body in bodies.iter_mut().filter(|b| !b.is_static()) {
        body.velocity = (body.position - body.prev_position) * inv_h;
        body.angular_velocity = (body.angle - body.prev_angle) * inv_h;
    }
}

/// Apply per-step air friction and clear accumulated forces.
pub fn finish_step(bodies: &mut [RigidBody]) {
    for body in bodies.iter_mut() {
        if body.friction_air > 0.0 {
            let keep = 1.0 - body.friction_air;
            body.velocity = body.velocity * keep;
            body.angular_velocity *= keep;
        }
        body.force = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Shape;

    #[test]
    fn free_body_falls_with_gravity() {
        let mut bodies = vec![RigidBody::dynamic(
            "ball",
            Shape::Circle { radius: 1.0 },
            1.0,
            Vec2::ZERO,
        )];
        let g = Vec2::new(0.0, 0.001);
        for _ in 0..10 {
            predict(&mut bodies, g, 1.0);
            recover_velocities(&mut bodies, 1.0);
        }
        assert!((bodies[0].velocity.y - 0.01).abs() < 1e-12);
        assert!(bodies[0].position.y > 0.0);
    }

    #[test]
    fn static_bodies_do_not_move() {
        let mut bodies = vec![RigidBody::fixed(
            "ground",
            Shape::Rectangle { width: 10.0, height: 1.0 },
            Vec2::new(0.0, 5.0),
        )];
        predict(&mut bodies, Vec2::new(0.0, 1.0), 1.0);
        assert_eq!(bodies[0].position, Vec2::new(0.0, 5.0));
    }
}
