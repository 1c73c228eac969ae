//! # Ground Contact
//!
//! Frictionless, inelastic contact between dynamic bodies and static bodies.
//! A static body acts as the half-plane below its top face, limited to its
//! horizontal extent. Pairs are skipped unless their collision filters
//! accept each other.

use crate::body::RigidBody;
use crate::shapes::Shape;
use crate::types::{CollisionFilter, Vec2};

/// Outward normal of a static body's top face (y is down).
const UP: Vec2 = Vec2::new(0.0, -1.0);

/// Project all dynamic bodies out of the static bodies they may touch.
///
/// Returns the number of contact points resolved.
pub fn solve_contacts(bodies: &mut [RigidBody]) -> usize {
    let statics: Vec<(Vec2, f64, f64, CollisionFilter)> = bodies
        .iter()
        .filter(|b| b.is_static())
        .map(|b| {
            (
                b.position,
                b.shape.half_width(),
                b.shape.half_height(),
                b.filter,
            )
        })
        .collect();

    let mut resolved = 0;
    for body in bodies.iter_mut().filter(|b| !b.is_static()) {
        for &(centre, half_width, half_height, filter) in &statics {
            if !body.filter.collides_with(&filter) {
                continue;
            }
            let top = centre.y - half_height;
            let (left, right) = (centre.x - half_width, centre.x + half_width);
            for offset in support_points(body) {
                let point = body.position + offset;
                let depth = point.y - top;
                if depth <= 0.0 || point.x < left || point.x > right {
                    continue;
                }
                let w = body.generalized_inverse_mass(offset, UP);
                if w <= 0.0 {
                    continue;
                }
                body.apply_correction(offset, UP * (depth / w));
                resolved += 1;
            }
        }
    }
    resolved
}

/// World-space offsets (relative to the body centre) of the points that can
/// touch a floor below the body.
fn support_points(body: &RigidBody) -> Vec<Vec2> {
    match body.shape {
        Shape::Circle { radius } => vec![Vec2::new(0.0, radius)],
        Shape::Rectangle { .. } => body
            .shape
            .corners()
            .map(|corners| corners.iter().map(|c| c.rotate(body.angle)).collect())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::category;

    fn ground() -> RigidBody {
        RigidBody::fixed(
            "ground",
            Shape::Rectangle { width: 100.0, height: 10.0 },
            Vec2::new(0.0, 105.0),
        )
        .with_filter(CollisionFilter::new(category::GROUND, category::CART))
    }

    #[test]
    fn wheel_is_pushed_onto_the_top_face() {
        let wheel = RigidBody::dynamic("wheel", Shape::Circle { radius: 5.0 }, 1.0, Vec2::new(0.0, 97.0))
            .with_filter(CollisionFilter::new(category::CART, category::GROUND));
        let mut bodies = vec![ground(), wheel];
        assert_eq!(solve_contacts(&mut bodies), 1);
        assert!((bodies[1].position.y - 95.0).abs() < 1e-9);
    }

    #[test]
    fn isolated_pole_passes_through() {
        let pole = RigidBody::dynamic("pole", Shape::Circle { radius: 5.0 }, 1.0, Vec2::new(0.0, 97.0))
            .with_filter(CollisionFilter::isolated(category::POLE));
        let mut bodies = vec![ground(), pole];
        assert_eq!(solve_contacts(&mut bodies), 0);
        assert!((bodies[1].position.y - 97.0).abs() < 1e-12);
    }
}
