//! Path requests with local obstacle avoidance layered on top.
//!
//! The adapter never plans paths itself. It nudges the requested destination
//! away from nearby obstacles, and recovers locally when the backend reports
//! a partial or blocked path or the agent has left the navigable surface.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use warden_common::{direction_to, flatten, EntityId, Vec3, EPSILON};

use crate::world::{MovementBackend, ObstacleKind, SenseWorld};

/// Added to every effective attack range so bodies in contact can still hit.
pub const ATTACK_RANGE_MARGIN: f32 = 0.25;

/// Range at which an attacker can reach a target, accounting for body sizes.
#[must_use]
pub fn effective_attack_range(base: f32, attacker_extent: f32, target_extent: f32) -> f32 {
    base + attacker_extent + target_extent + ATTACK_RANGE_MARGIN
}

/// Avoidance and recovery tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Whether local avoidance runs at all
    pub enabled: bool,
    /// Radius in which obstacles are considered
    pub detection_range: f32,
    /// Scale applied to the avoidance vector
    pub strength: f32,
    /// Minimum seconds between avoidance recomputations
    pub update_interval: f32,
    /// Whether the tracked target counts as an obstacle
    pub avoid_target: bool,
    /// Length of the direct hop used when the path is partial or blocked
    pub fallback_hop_distance: f32,
    /// Search radius when snapping back onto the navigable surface
    pub snap_radius: f32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detection_range: 3.0,
            strength: 1.5,
            update_interval: 0.1,
            avoid_target: false,
            fallback_hop_distance: 2.0,
            snap_radius: 5.0,
        }
    }
}

impl AvoidanceConfig {
    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        self.detection_range = self.detection_range.max(0.0);
        self.strength = self.strength.max(0.0);
        self.update_interval = self.update_interval.max(0.0);
        self.fallback_hop_distance = self.fallback_hop_distance.max(0.1);
        self.snap_radius = self.snap_radius.max(0.0);
    }
}

/// What a movement request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NavOutcome {
    /// Destination submitted to the backend
    Submitted(Vec3),
    /// Path was partial or blocked; a short direct hop was submitted instead
    Fallback(Vec3),
    /// Off the navigable surface with nothing to snap to
    Stranded,
}

/// Per-agent navigation state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NavigationAdapter {
    /// Cached avoidance vector (unit length or zero)
    avoidance: Vec3,
    /// Time of the last avoidance recomputation
    last_avoidance_update: Option<f32>,
    /// Last non-zero heading toward a target
    last_direction: Vec3,
}

impl NavigationAdapter {
    /// Creates an adapter with no cached state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached avoidance vector.
    #[must_use]
    pub const fn avoidance(&self) -> Vec3 {
        self.avoidance
    }

    /// Last heading toward a movement target.
    #[must_use]
    pub const fn last_direction(&self) -> Vec3 {
        self.last_direction
    }

    /// Requests movement toward `target`.
    ///
    /// `tracked` is the tracked target's entity, which is excluded from
    /// avoidance unless the config opts in.
    #[allow(clippy::too_many_arguments)]
    pub fn move_toward<M: MovementBackend, W: SenseWorld>(
        &mut self,
        agent: EntityId,
        target: Vec3,
        tracked: Option<EntityId>,
        config: &AvoidanceConfig,
        movement: &mut M,
        world: &W,
        now: f32,
    ) -> NavOutcome {
        if !movement.is_on_navigable_surface(agent) {
            let here = movement.position(agent).unwrap_or(target);
            match movement.snap_to_nearest(agent, here, config.snap_radius) {
                Some(point) => debug!("Agent {} snapped back to navigable surface at {:?}", agent, point),
                None => {
                    warn!("Agent {} is off the navigable surface with no point within {}", agent, config.snap_radius);
                    return NavOutcome::Stranded;
                },
            }
        }

        let Some(position) = movement.position(agent) else {
            return NavOutcome::Stranded;
        };

        let heading = direction_to(position, target);
        if heading != Vec3::ZERO {
            self.last_direction = heading;
        }

        if config.enabled {
            let due = self
                .last_avoidance_update
                .map_or(true, |last| now - last >= config.update_interval);
            if due {
                self.avoidance = self.compute_avoidance(agent, position, tracked, config, world);
                self.last_avoidance_update = Some(now);
            }
        } else {
            self.avoidance = Vec3::ZERO;
        }

        let destination = target + self.avoidance * config.strength;
        movement.set_destination(agent, destination);

        if movement.path_status(agent).needs_fallback() {
            let hop = position + self.last_direction * config.fallback_hop_distance;
            warn!(
                "Agent {} path {:?}, hopping directly toward {:?}",
                agent,
                movement.path_status(agent),
                hop
            );
            movement.set_destination(agent, hop);
            return NavOutcome::Fallback(hop);
        }

        trace!("Agent {} moving to {:?}", agent, destination);
        NavOutcome::Submitted(destination)
    }

    /// Cancels the current path request.
    pub fn stop<M: MovementBackend>(&self, agent: EntityId, movement: &mut M) {
        movement.clear_path(agent);
    }

    /// Averages repulsion from obstacles ahead of the agent.
    ///
    /// Other agents are never avoided, nor is the agent itself. Obstacles
    /// behind the current heading are ignored once a heading is known.
    pub fn compute_avoidance<W: SenseWorld>(
        &self,
        agent: EntityId,
        position: Vec3,
        tracked: Option<EntityId>,
        config: &AvoidanceConfig,
        world: &W,
    ) -> Vec3 {
        let range = config.detection_range;
        if range <= 0.0 {
            return Vec3::ZERO;
        }
        let forward = flatten(self.last_direction);

        let mut sum = Vec3::ZERO;
        let mut count = 0u32;
        for obstacle in world.obstacles_near(position, range) {
            if obstacle.id == agent || obstacle.kind == ObstacleKind::Agent {
                continue;
            }
            let is_target = obstacle.kind == ObstacleKind::Target || Some(obstacle.id) == tracked;
            if is_target && !config.avoid_target {
                continue;
            }

            let offset = flatten(obstacle.position - position);
            let dist = offset.length();
            if dist < EPSILON || dist >= range {
                continue;
            }
            if forward.length() > EPSILON && offset.dot(forward) < 0.0 {
                continue;
            }

            let weight = (range - dist) / range;
            sum -= offset / dist * weight;
            count += 1;
        }

        if count == 0 {
            return Vec3::ZERO;
        }
        (sum / count as f32).normalize_or_zero()
    }
}
