//! Target perception: range gate, motion noise, vision cone and stealth rolls.
//!
//! Signals are evaluated cheapest first:
//! 1. Range gate on the locomotion-adjusted detection range
//! 2. Motion noise (never for crouching targets, ignores sight lines)
//! 3. Vision cone plus an occlusion trace
//! 4. Throttled stealth roll for crouching targets that passed the vision check
//!
//! [`PerceptionState`] turns the per-tick result into the hysteretic
//! `detected` flag.

use serde::{Deserialize, Serialize};
use warden_common::{distance, horizontal_angle_deg, lerp, EntityId, Vec3};

use crate::world::{Locomotion, SenseWorld, TargetSnapshot};

/// Range multiplier for running targets.
pub const RUNNING_RANGE_SCALE: f32 = 1.3;

/// Noise range multiplier for idle targets.
pub const IDLE_NOISE_SCALE: f32 = 0.8;

/// Fraction of the stealth range under which the floor chance applies.
pub const STEALTH_FLOOR_RATIO: f32 = 0.3;

/// Perception tuning for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Base detection radius
    pub detection_range: f32,
    /// Full vision cone angle in degrees
    pub vision_angle: f32,
    /// Detection range multiplier against crouching targets (< 1)
    pub stealth_range_multiplier: f32,
    /// Stealth detection chance at distance 0
    pub stealth_max_chance: f32,
    /// Stealth detection chance at the edge of the stealth range
    pub stealth_min_chance: f32,
    /// Chance floor when the target is very close
    pub stealth_floor_chance: f32,
    /// Minimum seconds between stealth rolls
    pub stealth_check_interval: f32,
    /// Eye height above the agent's origin
    pub eye_height: f32,
    /// Seconds the agent remembers a target after losing it
    pub memory_duration: f32,
    /// Memory duration after being hit
    pub damaged_memory_duration: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            detection_range: 10.0,
            vision_angle: 120.0,
            stealth_range_multiplier: 0.3,
            stealth_max_chance: 0.9,
            stealth_min_chance: 0.1,
            stealth_floor_chance: 0.7,
            stealth_check_interval: 0.2,
            eye_height: 1.6,
            memory_duration: 5.0,
            damaged_memory_duration: 10.0,
        }
    }
}

impl PerceptionConfig {
    /// Detection radius adjusted for the target's locomotion.
    #[must_use]
    pub fn effective_range(&self, locomotion: Locomotion) -> f32 {
        match locomotion {
            Locomotion::Running => self.detection_range * RUNNING_RANGE_SCALE,
            Locomotion::Walking | Locomotion::Idle => self.detection_range,
            Locomotion::Crouching => self.stealth_range(),
        }
    }

    /// Detection radius against crouching targets.
    #[must_use]
    pub fn stealth_range(&self) -> f32 {
        self.detection_range * self.stealth_range_multiplier
    }

    /// Radius within which the target's movement is heard.
    /// `None` for crouching targets, which make no noise.
    #[must_use]
    pub fn noise_range(&self, locomotion: Locomotion) -> Option<f32> {
        match locomotion {
            Locomotion::Running => Some(self.detection_range * RUNNING_RANGE_SCALE),
            Locomotion::Walking => Some(self.detection_range),
            Locomotion::Idle => Some(self.detection_range * IDLE_NOISE_SCALE),
            Locomotion::Crouching => None,
        }
    }

    /// Chance that a crouching target at `dist` is noticed.
    #[must_use]
    pub fn stealth_chance(&self, dist: f32) -> f32 {
        let range = self.stealth_range();
        if range <= 0.0 {
            return 0.0;
        }
        let chance = lerp(self.stealth_max_chance, self.stealth_min_chance, dist / range);
        if dist < range * STEALTH_FLOOR_RATIO {
            chance.max(self.stealth_floor_chance)
        } else {
            chance
        }
    }

    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        self.detection_range = self.detection_range.max(0.0);
        self.vision_angle = self.vision_angle.clamp(0.0, 360.0);
        self.stealth_range_multiplier = self.stealth_range_multiplier.clamp(0.0, 1.0);
        self.stealth_max_chance = self.stealth_max_chance.clamp(0.0, 1.0);
        self.stealth_min_chance = self.stealth_min_chance.clamp(0.0, self.stealth_max_chance);
        self.stealth_floor_chance = self.stealth_floor_chance.clamp(0.0, 1.0);
        self.stealth_check_interval = self.stealth_check_interval.max(0.0);
        self.memory_duration = self.memory_duration.max(0.0);
        self.damaged_memory_duration = self.damaged_memory_duration.max(self.memory_duration);
    }
}

/// Per-agent detection memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceptionState {
    /// Whether the agent currently knows where the target is
    pub detected: bool,
    /// Last time the target was sensed (or an alert refreshed it)
    pub detection_timestamp: f32,
    /// Last stealth roll
    pub last_stealth_check: Option<f32>,
    /// Result of the last stealth roll
    pub cached_stealth_result: bool,
    /// Memory duration in effect
    memory_duration: f32,
    /// Memory duration to restore once the target is lost
    base_memory_duration: f32,
}

impl PerceptionState {
    /// Creates an undetected state.
    #[must_use]
    pub const fn new(memory_duration: f32) -> Self {
        Self {
            detected: false,
            detection_timestamp: 0.0,
            last_stealth_check: None,
            cached_stealth_result: false,
            memory_duration,
            base_memory_duration: memory_duration,
        }
    }

    /// Memory duration currently in effect.
    #[must_use]
    pub const fn memory_duration(&self) -> f32 {
        self.memory_duration
    }

    /// Folds this tick's sensing result into the detection memory.
    ///
    /// Sensing sets and refreshes the flag. Without sensing the flag clears
    /// once `memory_duration` has elapsed since the last refresh, and any
    /// extended memory falls back to the base duration.
    pub fn update(&mut self, sensed: bool, now: f32) -> bool {
        if sensed {
            self.detected = true;
            self.detection_timestamp = now;
        } else if self.detected && now - self.detection_timestamp >= self.memory_duration {
            self.detected = false;
            self.memory_duration = self.base_memory_duration;
        }
        self.detected
    }

    /// Forces detection from outside the sensing pipeline (alerts, hits).
    pub fn force_detect(&mut self, now: f32) {
        self.detected = true;
        self.detection_timestamp = now;
    }

    /// Extends the memory window until the target is next lost.
    pub fn extend_memory(&mut self, duration: f32) {
        self.memory_duration = self.memory_duration.max(duration);
    }
}

/// The observing agent's pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    /// Agent ID
    pub id: EntityId,
    /// Origin position
    pub position: Vec3,
    /// Forward vector
    pub facing: Vec3,
}

impl Observer {
    /// Eye point used for sight traces.
    #[must_use]
    pub fn eye(&self, eye_height: f32) -> Vec3 {
        self.position + Vec3::Y * eye_height
    }
}

/// Why a target was or was not sensed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenseOutcome {
    /// Beyond the effective detection range
    OutOfRange,
    /// Heard through motion noise
    Heard,
    /// Outside the vision cone
    OutsideCone,
    /// Sight line blocked by geometry
    Occluded,
    /// Seen while moving normally
    Seen,
    /// Seen through a successful stealth roll
    SeenThroughStealth,
    /// Stealth roll failed
    Unnoticed,
}

impl SenseOutcome {
    /// Returns whether the target counts as sensed.
    #[must_use]
    pub const fn is_sensed(self) -> bool {
        matches!(self, Self::Heard | Self::Seen | Self::SeenThroughStealth)
    }
}

/// Evaluates the sensing signals for one observer against one target.
pub struct PerceptionEngine<'a, W: SenseWorld> {
    config: &'a PerceptionConfig,
    world: &'a W,
}

impl<'a, W: SenseWorld> PerceptionEngine<'a, W> {
    /// Creates an engine over a world.
    #[must_use]
    pub const fn new(config: &'a PerceptionConfig, world: &'a W) -> Self {
        Self { config, world }
    }

    /// Returns whether the target is sensed this tick.
    pub fn evaluate(
        &self,
        observer: &Observer,
        target: &TargetSnapshot,
        state: &mut PerceptionState,
        rng: &mut fastrand::Rng,
        now: f32,
    ) -> bool {
        self.evaluate_detailed(observer, target, state, rng, now)
            .is_sensed()
    }

    /// Like [`evaluate`], but reports which signal decided the result.
    ///
    /// [`evaluate`]: PerceptionEngine::evaluate
    pub fn evaluate_detailed(
        &self,
        observer: &Observer,
        target: &TargetSnapshot,
        state: &mut PerceptionState,
        rng: &mut fastrand::Rng,
        now: f32,
    ) -> SenseOutcome {
        let dist = distance(observer.position, target.position);

        if dist > self.config.effective_range(target.locomotion) {
            return SenseOutcome::OutOfRange;
        }

        if let Some(noise) = self.config.noise_range(target.locomotion) {
            if dist <= noise {
                return SenseOutcome::Heard;
            }
        }

        let angle = horizontal_angle_deg(observer.facing, observer.position, target.position);
        if angle > self.config.vision_angle * 0.5 {
            return SenseOutcome::OutsideCone;
        }

        let eye = observer.eye(self.config.eye_height);
        if !self.world.line_of_sight(eye, target.position, target.id) {
            return SenseOutcome::Occluded;
        }

        if target.locomotion != Locomotion::Crouching {
            return SenseOutcome::Seen;
        }

        if self.stealth_roll(dist, state, rng, now) {
            SenseOutcome::SeenThroughStealth
        } else {
            SenseOutcome::Unnoticed
        }
    }

    /// Rolls against the stealth chance, reusing the cached result until the
    /// check interval has passed.
    fn stealth_roll(
        &self,
        dist: f32,
        state: &mut PerceptionState,
        rng: &mut fastrand::Rng,
        now: f32,
    ) -> bool {
        if let Some(last) = state.last_stealth_check {
            if now - last < self.config.stealth_check_interval {
                return state.cached_stealth_result;
            }
        }
        let chance = self.config.stealth_chance(dist);
        let result = rng.f32() < chance;
        state.cached_stealth_result = result;
        state.last_stealth_check = Some(now);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::MockSenseWorld;
    use proptest::prelude::*;

    fn observer_at_origin() -> Observer {
        Observer {
            id: EntityId::new(),
            position: Vec3::ZERO,
            facing: Vec3::Z,
        }
    }

    fn target(position: Vec3, locomotion: Locomotion) -> TargetSnapshot {
        TargetSnapshot::new(EntityId::new(), position, locomotion)
    }

    fn sense(world: &MockSenseWorld, target: &TargetSnapshot) -> SenseOutcome {
        let config = PerceptionConfig::default();
        let engine = PerceptionEngine::new(&config, world);
        let mut state = PerceptionState::new(config.memory_duration);
        let mut rng = fastrand::Rng::with_seed(7);
        engine.evaluate_detailed(&observer_at_origin(), target, &mut state, &mut rng, 0.0)
    }

    #[test]
    fn test_effective_ranges() {
        let config = PerceptionConfig::default();
        assert!((config.effective_range(Locomotion::Running) - 13.0).abs() < 0.001);
        assert_eq!(config.effective_range(Locomotion::Walking), 10.0);
        assert_eq!(config.effective_range(Locomotion::Idle), 10.0);
        assert!((config.effective_range(Locomotion::Crouching) - 3.0).abs() < 0.001);
        assert_eq!(config.noise_range(Locomotion::Crouching), None);
        assert_eq!(config.noise_range(Locomotion::Idle), Some(8.0));
    }

    #[test]
    fn test_walking_target_heard_through_walls() {
        // Walking at 8 with range 10: motion noise decides before sight is checked
        let world = MockSenseWorld::new().with_walls(true);
        let behind = target(Vec3::new(0.0, 0.0, -8.0), Locomotion::Walking);
        assert_eq!(sense(&world, &behind), SenseOutcome::Heard);
    }

    #[test]
    fn test_walking_target_in_cone_sensed() {
        let world = MockSenseWorld::new();
        let ahead = target(Vec3::new(0.0, 0.0, 8.0), Locomotion::Walking);
        let config = PerceptionConfig::default();
        let engine = PerceptionEngine::new(&config, &world);
        let mut state = PerceptionState::new(5.0);
        let mut rng = fastrand::Rng::with_seed(1);
        assert!(engine.evaluate(&observer_at_origin(), &ahead, &mut state, &mut rng, 0.0));
    }

    #[test]
    fn test_out_of_range() {
        let world = MockSenseWorld::new();
        let far = target(Vec3::new(0.0, 0.0, 12.0), Locomotion::Walking);
        assert_eq!(sense(&world, &far), SenseOutcome::OutOfRange);

        // Running extends the range to 13
        let runner = target(Vec3::new(0.0, 0.0, -12.0), Locomotion::Running);
        assert_eq!(sense(&world, &runner), SenseOutcome::Heard);
    }

    #[test]
    fn test_idle_target_needs_sight_beyond_noise_range() {
        let world = MockSenseWorld::new();
        let idle_ahead = target(Vec3::new(0.0, 0.0, 9.0), Locomotion::Idle);
        assert_eq!(sense(&world, &idle_ahead), SenseOutcome::Seen);

        let idle_behind = target(Vec3::new(0.0, 0.0, -9.0), Locomotion::Idle);
        assert_eq!(sense(&world, &idle_behind), SenseOutcome::OutsideCone);

        let idle_near_behind = target(Vec3::new(0.0, 0.0, -7.0), Locomotion::Idle);
        assert_eq!(sense(&world, &idle_near_behind), SenseOutcome::Heard);

        let walled = MockSenseWorld::new().with_walls(true);
        assert_eq!(sense(&walled, &idle_ahead), SenseOutcome::Occluded);
    }

    #[test]
    fn test_crouching_target_never_heard() {
        let world = MockSenseWorld::new();
        let behind = target(Vec3::new(0.0, 0.0, -1.0), Locomotion::Crouching);
        assert_eq!(sense(&world, &behind), SenseOutcome::OutsideCone);

        let far = target(Vec3::new(0.0, 0.0, 4.0), Locomotion::Crouching);
        assert_eq!(sense(&world, &far), SenseOutcome::OutOfRange);
    }

    #[test]
    fn test_stealth_chance_curve() {
        let config = PerceptionConfig::default();
        // Edge of the 3.0 stealth range
        assert!((config.stealth_chance(3.0) - 0.1).abs() < 0.001);
        // Inside 0.9 the floor applies
        assert!((config.stealth_chance(0.5) - lerp(0.9, 0.1, 0.5 / 3.0)).abs() < 0.001);
        let low = PerceptionConfig {
            stealth_max_chance: 0.5,
            ..PerceptionConfig::default()
        };
        assert!((low.stealth_chance(0.1) - 0.7).abs() < 0.001);
        // Past the floor region the plain interpolation applies
        assert!((low.stealth_chance(1.5) - lerp(0.5, 0.1, 0.5)).abs() < 0.001);
    }

    #[test]
    fn test_stealth_roll_is_throttled() {
        let world = MockSenseWorld::new();
        let config = PerceptionConfig::default();
        let engine = PerceptionEngine::new(&config, &world);
        let crouched = target(Vec3::new(0.0, 0.0, 2.5), Locomotion::Crouching);
        let mut state = PerceptionState::new(5.0);
        let mut rng = fastrand::Rng::with_seed(3);
        let obs = observer_at_origin();

        let first = engine.evaluate(&obs, &crouched, &mut state, &mut rng, 1.0);
        assert_eq!(state.last_stealth_check, Some(1.0));
        for step in 1..5 {
            let now = 1.0 + step as f32 * 0.04;
            assert_eq!(engine.evaluate(&obs, &crouched, &mut state, &mut rng, now), first);
            assert_eq!(state.last_stealth_check, Some(1.0));
        }
        engine.evaluate(&obs, &crouched, &mut state, &mut rng, 1.25);
        assert_eq!(state.last_stealth_check, Some(1.25));
    }

    #[test]
    fn test_stealth_detection_rate_matches_chance() {
        let world = MockSenseWorld::new();
        let config = PerceptionConfig::default();
        let engine = PerceptionEngine::new(&config, &world);
        let crouched = target(Vec3::new(0.0, 0.0, 2.5), Locomotion::Crouching);
        let mut state = PerceptionState::new(5.0);
        let mut rng = fastrand::Rng::with_seed(0xC0FFEE);
        let obs = observer_at_origin();

        let samples = 1000;
        let mut hits = 0;
        for i in 0..samples {
            let now = i as f32 * 0.25;
            if engine.evaluate(&obs, &crouched, &mut state, &mut rng, now) {
                hits += 1;
            }
        }
        let expected = lerp(0.9, 0.1, 2.5 / 3.0);
        let observed = hits as f32 / samples as f32;
        assert!(
            (observed - expected).abs() < 0.07,
            "observed {observed}, expected {expected}"
        );
    }

    #[test]
    fn test_memory_holds_until_duration() {
        let mut state = PerceptionState::new(5.0);
        assert!(state.update(true, 10.0));
        assert!(state.update(false, 12.0));
        assert!(state.update(false, 14.9));
        assert!(!state.update(false, 15.0));
    }

    #[test]
    fn test_memory_refreshes_on_sense() {
        let mut state = PerceptionState::new(5.0);
        state.update(true, 0.0);
        state.update(true, 4.0);
        assert!(state.update(false, 8.0));
        assert!(!state.update(false, 9.0));
    }

    #[test]
    fn test_extended_memory_resets_after_loss() {
        let mut state = PerceptionState::new(5.0);
        state.force_detect(0.0);
        state.extend_memory(10.0);
        assert_eq!(state.memory_duration(), 10.0);
        assert!(state.update(false, 7.0));
        assert!(!state.update(false, 10.0));
        assert_eq!(state.memory_duration(), 5.0);
    }

    proptest! {
        #[test]
        fn prop_detected_iff_within_memory(sensed_at in 0.0f32..100.0, later in 0.0f32..20.0) {
            let mut state = PerceptionState::new(5.0);
            state.update(true, sensed_at);
            let detected = state.update(false, sensed_at + later);
            prop_assert_eq!(detected, (sensed_at + later) - sensed_at < 5.0);
        }
    }
}
