use crate::types::Vec2;

/// Collision and mass shape of a rigid body, centred on the body position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Shape {
    Rectangle { width: f64, height: f64 },
    Circle { radius: f64 },
}

impl Shape {
    /// Moment of inertia about the centre for a body of uniform density.
    #[must_use]
    pub fn inertia(&self, mass: f64) -> f64 {
        match *self {
            Self::Rectangle { width, height } => mass * (width * width + height * height) / 12.0,
            Self::Circle { radius } => 0.5 * mass * radius * radius,
        }
    }

    /// Support points used for ground contact, in body-local coordinates.
    ///
    /// Rectangles contribute their four corners; circles contribute nothing
    /// here because their lowest point depends on the contact normal.
    #[must_use]
    pub fn corners(&self) -> Option<[Vec2; 4]> {
        match *self {
            Self::Rectangle { width, height } => {
                let (hw, hh) = (width * 0.5, height * 0.5);
                Some([
                    Vec2::new(-hw, -hh),
                    Vec2::new(hw, -hh),
                    Vec2::new(hw, hh),
                    Vec2::new(-hw, hh),
                ])
            }
            Self::Circle { .. } => None,
        }
    }

    /// Half of the vertical extent of an unrotated shape.
    #[must_use]
    pub fn half_height(&self) -> f64 {
        match *self {
            Self::Rectangle { height, .. } => height * 0.5,
            Self::Circle { radius } => radius,
        }
    }

    /// Half of the horizontal extent of an unrotated shape.
    #[must_use]
    pub fn half_width(&self) -> f64 {
        match *self {
            Self::Rectangle { width, .. } => width * 0.5,
            Self::Circle { radius } => radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_inertia_matches_plate_formula() {
        let s = Shape::Rectangle { width: 10.0, height: 200.0 };
        assert!((s.inertia(1.0) - 40_100.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn circle_has_no_corners() {
        assert!(Shape::Circle { radius: 30.0 }.corners().is_none());
        assert!((Shape::Circle { radius: 30.0 }.inertia(0.5) - 225.0).abs() < 1e-9);
    }
}
