//! Circle geometry shared by collision and placement checks

use crate::util::vec2::Vec2;

/// Returns true iff two circles overlap or touch.
///
/// Compares squared distance against the squared radius sum with no epsilon,
/// so boundary-touching circles are always classified as colliding.
#[inline]
pub fn circles_overlap(p: Vec2, r1: f32, q: Vec2, r2: f32) -> bool {
    let reach = r1 + r2;
    p.distance_sq_to(q) <= reach * reach
}

/// Axis-aligned rectangle `[0, width] x [0, height]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_circles() {
        assert!(circles_overlap(Vec2::new(0.0, 0.0), 10.0, Vec2::new(15.0, 0.0), 10.0));
        assert!(!circles_overlap(Vec2::new(0.0, 0.0), 10.0, Vec2::new(25.0, 0.0), 10.0));
    }

    #[test]
    fn test_touching_circles_collide() {
        // 3-4-5 triangle keeps the arithmetic exact
        assert!(circles_overlap(Vec2::new(0.0, 0.0), 2.0, Vec2::new(3.0, 4.0), 3.0));
        assert!(!circles_overlap(Vec2::new(0.0, 0.0), 2.0, Vec2::new(3.0, 4.0), 2.5));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let cases = [
            (Vec2::new(1.0, 2.0), 3.0, Vec2::new(4.0, 6.0), 2.0),
            (Vec2::new(-5.0, 0.5), 1.0, Vec2::new(100.0, 7.0), 40.0),
            (Vec2::new(10.0, 10.0), 0.0, Vec2::new(10.0, 10.0), 0.0),
            (Vec2::new(0.0, 0.0), 25.0, Vec2::new(40.0, 0.0), 15.0),
            (Vec2::new(1990.0, 750.0), 25.0, Vec2::new(1800.0, 700.0), 45.0),
        ];
        for (p, r1, q, r2) in cases {
            assert_eq!(circles_overlap(p, r1, q, r2), circles_overlap(q, r2, p, r1));
        }
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = Bounds::new(100.0, 50.0);
        assert!(bounds.contains(Vec2::new(0.0, 0.0)));
        assert!(bounds.contains(Vec2::new(100.0, 50.0)));
        assert!(!bounds.contains(Vec2::new(100.5, 10.0)));
        assert!(!bounds.contains(Vec2::new(10.0, -0.1)));
        assert_eq!(bounds.center(), Vec2::new(50.0, 25.0));
    }
}
