//! Non-overlapping spawn coordinates
//!
//! Samples are drawn uniformly inside the arena inset by the separation, and a
//! sample is rejected when it overlaps an already accepted point of the same
//! batch or any occupied point. Retries are bounded; once they run out the
//! least crowded candidate seen is used instead, so generation always
//! terminates.

use rand::Rng;
use tracing::warn;

use crate::util::geometry::{circles_overlap, Bounds};
use crate::util::vec2::Vec2;

/// Sample one coordinate on an axis of length `extent`, staying `margin` away
/// from both ends. An axis too short for the margin collapses to its centre.
fn sample_axis(extent: f32, margin: f32, rng: &mut impl Rng) -> f32 {
    let lo = margin;
    let hi = extent - margin;
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        extent / 2.0
    }
}

/// Squared distance to the nearest neighbour, or infinity with no neighbours
fn nearest_sq(candidate: Vec2, accepted: &[Vec2], occupied: &[Vec2]) -> f32 {
    accepted
        .iter()
        .chain(occupied)
        .map(|p| candidate.distance_sq_to(*p))
        .fold(f32::INFINITY, f32::min)
}

/// Generate `count` coordinates at least `min_separation` apart from each
/// other and from every point in `occupied`.
///
/// `max_attempts` bounds the samples drawn per point (at least one is always
/// drawn).
pub fn generate_coordinates(
    count: usize,
    min_separation: f32,
    bounds: Bounds,
    occupied: &[Vec2],
    max_attempts: usize,
    rng: &mut impl Rng,
) -> Vec<Vec2> {
    let mut accepted: Vec<Vec2> = Vec::with_capacity(count);

    for _ in 0..count {
        let mut best: Option<(Vec2, f32)> = None;
        let mut placed = None;

        for _ in 0..max_attempts.max(1) {
            let candidate = Vec2::new(
                sample_axis(bounds.width, min_separation, rng),
                sample_axis(bounds.height, min_separation, rng),
            );

            let clear = accepted
                .iter()
                .chain(occupied)
                .all(|p| !circles_overlap(candidate, min_separation, *p, min_separation));
            if clear {
                placed = Some(candidate);
                break;
            }

            let spacing = nearest_sq(candidate, &accepted, occupied);
            if best.map_or(true, |(_, s)| spacing > s) {
                best = Some((candidate, spacing));
            }
        }

        let point = match (placed, best) {
            (Some(point), _) => point,
            (None, Some((fallback, _))) => {
                warn!(
                    "Placement exhausted {} attempts, using least crowded candidate ({:.1}, {:.1})",
                    max_attempts, fallback.x, fallback.y
                );
                fallback
            }
            (None, None) => bounds.center(),
        };
        accepted.push(point);
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SEPARATION: f32 = 45.0;

    fn assert_separated(points: &[Vec2], occupied: &[Vec2], separation: f32) {
        for (i, a) in points.iter().enumerate() {
            for b in points.iter().skip(i + 1).chain(occupied) {
                assert!(
                    !circles_overlap(*a, separation, *b, separation),
                    "points {:?} and {:?} overlap",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_generates_requested_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = generate_coordinates(10, SEPARATION, Bounds::new(2000.0, 1500.0), &[], 50, &mut rng);
        assert_eq!(points.len(), 10);
    }

    #[test]
    fn test_points_stay_inside_inset() {
        let mut rng = StdRng::seed_from_u64(2);
        let bounds = Bounds::new(2000.0, 1500.0);
        let points = generate_coordinates(30, SEPARATION, bounds, &[], 50, &mut rng);
        for p in points {
            assert!(p.x >= SEPARATION && p.x <= bounds.width - SEPARATION);
            assert!(p.y >= SEPARATION && p.y <= bounds.height - SEPARATION);
        }
    }

    #[test]
    fn test_pairwise_separation() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let points = generate_coordinates(20, SEPARATION, Bounds::new(2000.0, 1500.0), &[], 50, &mut rng);
            assert_separated(&points, &[], SEPARATION);
        }
    }

    #[test]
    fn test_respects_occupied_points() {
        let mut rng = StdRng::seed_from_u64(3);
        let occupied = vec![
            Vec2::new(500.0, 500.0),
            Vec2::new(1000.0, 750.0),
            Vec2::new(1500.0, 1000.0),
        ];
        let points = generate_coordinates(10, SEPARATION, Bounds::new(2000.0, 1500.0), &occupied, 50, &mut rng);
        assert_separated(&points, &occupied, SEPARATION);
    }

    #[test]
    fn test_crowded_arena_terminates() {
        // Far more points than fit; the fallback must kick in
        let mut rng = StdRng::seed_from_u64(4);
        let bounds = Bounds::new(300.0, 300.0);
        let points = generate_coordinates(100, SEPARATION, bounds, &[], 10, &mut rng);
        assert_eq!(points.len(), 100);
        for p in points {
            assert!(bounds.contains(p));
        }
    }

    #[test]
    fn test_narrow_axis_uses_centre() {
        let mut rng = StdRng::seed_from_u64(5);
        let points = generate_coordinates(3, SEPARATION, Bounds::new(60.0, 1000.0), &[], 50, &mut rng);
        for p in points {
            assert_eq!(p.x, 30.0);
            assert!(p.y >= SEPARATION && p.y <= 1000.0 - SEPARATION);
        }
    }

    #[test]
    fn test_zero_count() {
        let mut rng = StdRng::seed_from_u64(6);
        assert!(generate_coordinates(0, SEPARATION, Bounds::new(100.0, 100.0), &[], 50, &mut rng).is_empty());
    }
}
