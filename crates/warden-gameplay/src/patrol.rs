//! Patrol routes: ordered waypoints with wait times and traversal rules.

use serde::{Deserialize, Serialize};
use warden_common::{distance, Vec3};

/// A single patrol stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// World position
    pub position: Vec3,
    /// Seconds to wait on arrival
    #[serde(default)]
    pub wait_time: f32,
}

impl Waypoint {
    /// Creates a waypoint.
    #[must_use]
    pub const fn new(position: Vec3, wait_time: f32) -> Self {
        Self {
            position,
            wait_time,
        }
    }

    /// Returns whether the waypoint has a usable position.
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        self.position.is_finite()
    }
}

/// Ordered patrol route.
///
/// Looping routes wrap from the last point back to the first. Non-looping
/// routes ping-pong: the walker reverses direction at either end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PatrolRoute {
    /// Waypoints in traversal order
    pub waypoints: Vec<Waypoint>,
    /// Wrap around instead of reversing
    #[serde(default, rename = "loop")]
    pub looping: bool,
    /// Travel speed while patrolling (falls back to the agent's base speed)
    #[serde(default)]
    pub speed: Option<f32>,
}

impl PatrolRoute {
    /// Creates a route.
    #[must_use]
    pub fn new(waypoints: Vec<Waypoint>, looping: bool) -> Self {
        Self {
            waypoints,
            looping,
            speed: None,
        }
    }

    /// Sets the patrol speed.
    #[must_use]
    pub const fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Returns whether the route has no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Returns whether at least one waypoint has a usable position.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.waypoints.iter().any(Waypoint::is_resolvable)
    }

    /// Clamps an index into range. Returns 0 for an empty route.
    #[must_use]
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.waypoints.len().saturating_sub(1))
    }

    /// Gets the waypoint at `index`, clamped into range.
    #[must_use]
    pub fn point_at(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(self.clamp_index(index))
    }

    /// Returns whether a ping-pong walker must flip direction before advancing.
    #[must_use]
    pub fn should_reverse(&self, current: usize, moving_forward: bool) -> bool {
        if self.looping || self.waypoints.is_empty() {
            return false;
        }
        let last = self.waypoints.len() - 1;
        (moving_forward && current >= last) || (!moving_forward && current == 0)
    }

    /// Index following `current`.
    ///
    /// Ping-pong walkers are expected to call [`should_reverse`] first; at a
    /// boundary without reversing, the index stays in range.
    ///
    /// [`should_reverse`]: PatrolRoute::should_reverse
    #[must_use]
    pub fn next_index(&self, current: usize, moving_forward: bool) -> usize {
        let count = self.waypoints.len();
        if count == 0 {
            return 0;
        }
        if self.looping {
            return (current + 1) % count;
        }
        if moving_forward {
            (current + 1).min(count - 1)
        } else {
            current.saturating_sub(1).min(count - 1)
        }
    }

    /// Index of the waypoint closest to `position`. Ties go to the first.
    #[must_use]
    pub fn nearest_index(&self, position: Vec3) -> usize {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for (i, point) in self.waypoints.iter().enumerate() {
            if !point.is_resolvable() {
                continue;
            }
            let d = distance(point.position, position);
            if d < best_dist {
                best = i;
                best_dist = d;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line_route(count: usize, looping: bool) -> PatrolRoute {
        let points = (0..count)
            .map(|i| Waypoint::new(Vec3::new(i as f32 * 5.0, 0.0, 0.0), 1.0))
            .collect();
        PatrolRoute::new(points, looping)
    }

    /// Walks the route the way the behavior machine does.
    fn advance(route: &PatrolRoute, index: &mut usize, forward: &mut bool) {
        if route.should_reverse(*index, *forward) {
            *forward = !*forward;
        }
        *index = route.next_index(*index, *forward);
    }

    #[test]
    fn test_empty_route() {
        let route = PatrolRoute::default();
        assert!(route.is_empty());
        assert!(!route.is_valid());
        assert!(route.point_at(3).is_none());
        assert_eq!(route.next_index(0, true), 0);
        assert_eq!(route.nearest_index(Vec3::ZERO), 0);
    }

    #[test]
    fn test_point_at_clamps() {
        let route = line_route(3, false);
        let last = route.point_at(99).expect("non-empty");
        assert_eq!(last.position, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_loop_wraps() {
        let route = line_route(3, true);
        assert_eq!(route.next_index(0, true), 1);
        assert_eq!(route.next_index(2, true), 0);
        assert!(!route.should_reverse(2, true));
    }

    #[test]
    fn test_ping_pong_sequence() {
        let route = line_route(3, false);
        let mut index = 0;
        let mut forward = true;
        let mut seen = vec![index];
        for _ in 0..6 {
            advance(&route, &mut index, &mut forward);
            seen.push(index);
        }
        assert_eq!(seen, vec![0, 1, 2, 1, 0, 1, 2]);
    }

    #[test]
    fn test_single_point_ping_pong_stays() {
        let route = line_route(1, false);
        let mut index = 0;
        let mut forward = true;
        for _ in 0..4 {
            advance(&route, &mut index, &mut forward);
            assert_eq!(index, 0);
        }
    }

    #[test]
    fn test_nearest_index_ties_to_first() {
        let route = PatrolRoute::new(
            vec![
                Waypoint::new(Vec3::new(-1.0, 0.0, 0.0), 0.0),
                Waypoint::new(Vec3::new(1.0, 0.0, 0.0), 0.0),
            ],
            true,
        );
        assert_eq!(route.nearest_index(Vec3::ZERO), 0);
        assert_eq!(route.nearest_index(Vec3::new(0.9, 0.0, 0.0)), 1);
    }

    #[test]
    fn test_unresolvable_points() {
        let route = PatrolRoute::new(
            vec![
                Waypoint::new(Vec3::splat(f32::NAN), 0.0),
                Waypoint::new(Vec3::new(4.0, 0.0, 0.0), 0.0),
            ],
            false,
        );
        assert!(route.is_valid());
        assert_eq!(route.nearest_index(Vec3::ZERO), 1);

        let broken = PatrolRoute::new(vec![Waypoint::new(Vec3::splat(f32::NAN), 0.0)], false);
        assert!(!broken.is_valid());
    }

    #[test]
    fn test_route_toml_uses_loop_key() {
        let route: PatrolRoute = toml::from_str(
            r#"
            loop = true
            speed = 2.0
            [[waypoints]]
            position = [0.0, 0.0, 0.0]
            wait_time = 1.5
            "#,
        )
        .expect("valid route");
        assert!(route.looping);
        assert_eq!(route.speed, Some(2.0));
        assert_eq!(route.waypoints[0].wait_time, 1.5);
    }

    proptest! {
        #[test]
        fn prop_index_stays_in_range(count in 1usize..12, looping in any::<bool>(), steps in 0usize..64) {
            let route = line_route(count, looping);
            let mut index = 0;
            let mut forward = true;
            for _ in 0..steps {
                advance(&route, &mut index, &mut forward);
                prop_assert!(index < count);
                prop_assert!(route.point_at(index).is_some());
            }
        }

        #[test]
        fn prop_ping_pong_moves_one_step(count in 2usize..12, steps in 1usize..64) {
            let route = line_route(count, false);
            let mut index = 0;
            let mut forward = true;
            for _ in 0..steps {
                let before = index;
                advance(&route, &mut index, &mut forward);
                prop_assert_eq!(before.abs_diff(index), 1);
            }
        }
    }
}
