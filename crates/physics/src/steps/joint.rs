//! # Point Constraints
//!
//! Position-based projection of pin joints. Each pass moves both bodies so
//! the anchor points approach the rest length, weighted by the generalised
//! inverse mass at the anchors.

use crate::body::{PointConstraint, RigidBody};

const MIN_SEPARATION: f64 = 1e-12;

/// Project every constraint once.
pub fn solve_constraints(bodies: &mut [RigidBody], constraints: &[PointConstraint]) {
    for constraint in constraints {
        solve_point_constraint(bodies, constraint);
    }
}

fn solve_point_constraint(bodies: &mut [RigidBody], c: &PointConstraint) {
    let (ia, ib) = (c.body_a.index(), c.body_b.index());
    if ia == ib || ia >= bodies.len() || ib >= bodies.len() {
        return;
    }

    let ra = c.point_a.rotate(bodies[ia].angle);
    let rb = c.point_b.rotate(bodies[ib].angle);
    let delta = (bodies[ib].position + rb) - (bodies[ia].position + ra);
    let distance = delta.length();
    if distance < MIN_SEPARATION {
        return;
    }

    let error = distance - c.length;
    let normal = delta * (1.0 / distance);
    let w = bodies[ia].generalized_inverse_mass(ra, normal)
        + bodies[ib].generalized_inverse_mass(rb, normal);
    if w <= 0.0 {
        return;
    }

    let impulse = normal * (c.stiffness * error / w);
    bodies[ia].apply_correction(ra, impulse);
    bodies[ib].apply_correction(rb, -impulse);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyHandle;
    use crate::shapes::Shape;
    use crate::types::Vec2;

    #[test]
    fn pin_joint_pulls_points_together() {
        let mut bodies = vec![
            RigidBody::dynamic("a", Shape::Circle { radius: 1.0 }, 1.0, Vec2::ZERO),
            RigidBody::dynamic("b", Shape::Circle { radius: 1.0 }, 1.0, Vec2::new(4.0, 0.0)),
        ];
        let pin = PointConstraint::pin(
            "pin",
            BodyHandle(0),
            Vec2::new(1.0, 0.0),
            BodyHandle(1),
            Vec2::new(-1.0, 0.0),
        );
        for _ in 0..4 {
            solve_constraints(&mut bodies, &[pin]);
        }
        let pa = bodies[0].world_point(pin.point_a);
        let pb = bodies[1].world_point(pin.point_b);
        assert!((pb - pa).length() < 1e-6);
        // Equal masses share the correction.
        assert!((bodies[0].position.x + bodies[1].position.x - 4.0).abs() < 1e-6);
    }

    #[test]
    fn static_anchor_only_moves_dynamic_side() {
        let mut bodies = vec![
            RigidBody::fixed("wall", Shape::Circle { radius: 1.0 }, Vec2::ZERO),
            RigidBody::dynamic("bob", Shape::Circle { radius: 1.0 }, 2.0, Vec2::new(0.0, 3.0)),
        ];
        let pin = PointConstraint::pin("pin", BodyHandle(0), Vec2::ZERO, BodyHandle(1), Vec2::ZERO);
        solve_constraints(&mut bodies, &[pin]);
        assert_eq!(bodies[0].position, Vec2::ZERO);
        assert!(bodies[1].position.length() < 1e-9);
    }
}
