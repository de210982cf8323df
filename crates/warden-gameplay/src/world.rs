//! Collaborator interfaces consumed by the agent layer.
//!
//! Movement, sensing, the tracked target and drop spawning all live outside
//! this crate. Each is abstracted behind a trait so the host engine can plug
//! in its own physics and navigation, and tests can use the mocks below.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use warden_common::{distance, direction_to, EntityId, Vec3};

use crate::drops::ItemDrop;

/// Result of the last path request made for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PathStatus {
    /// A complete path to the destination exists
    #[default]
    Ok,
    /// Only part of the way can be reached
    Partial,
    /// No path could be built
    Blocked,
}

impl PathStatus {
    /// Returns whether the path needs a local fallback.
    #[must_use]
    pub const fn needs_fallback(self) -> bool {
        matches!(self, Self::Partial | Self::Blocked)
    }
}

/// Path-following and body control for agents, keyed by agent ID.
///
/// The backend owns position and orientation. Agents only submit
/// destinations and speed changes.
pub trait MovementBackend {
    /// Gets the agent's current position.
    fn position(&self, agent: EntityId) -> Option<Vec3>;
    /// Gets the agent's forward vector.
    fn facing(&self, agent: EntityId) -> Option<Vec3>;
    /// Bounding radius of the agent's body.
    fn extent(&self, agent: EntityId) -> f32;
    /// Requests a path toward a world point.
    fn set_destination(&mut self, agent: EntityId, point: Vec3);
    /// Clears any in-flight path request.
    fn clear_path(&mut self, agent: EntityId);
    /// Status of the current path request.
    fn path_status(&self, agent: EntityId) -> PathStatus;
    /// Returns whether the agent stands on the navigable surface.
    fn is_on_navigable_surface(&self, agent: EntityId) -> bool;
    /// Warps the agent to the nearest navigable point within `radius`.
    fn snap_to_nearest(&mut self, agent: EntityId, point: Vec3, radius: f32) -> Option<Vec3>;
    /// Sets the agent's travel speed.
    fn set_speed(&mut self, agent: EntityId, speed: f32);
    /// Enables or disables locomotion.
    fn set_movement_enabled(&mut self, agent: EntityId, enabled: bool);
    /// Enables or disables the agent's collider.
    fn set_collision_enabled(&mut self, agent: EntityId, enabled: bool);
}

/// Category of a nearby obstacle for avoidance sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// World geometry or props
    Static,
    /// Another adversary agent
    Agent,
    /// The tracked target
    Target,
}

/// An obstacle returned by a proximity query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Entity owning the collider
    pub id: EntityId,
    /// Collider center
    pub position: Vec3,
    /// Obstacle category
    pub kind: ObstacleKind,
}

impl Obstacle {
    /// Creates a new obstacle.
    #[must_use]
    pub const fn new(id: EntityId, position: Vec3, kind: ObstacleKind) -> Self {
        Self { id, position, kind }
    }
}

/// World queries used by perception and avoidance.
pub trait SenseWorld {
    /// Returns true if a trace from `from` to `to` is not blocked by anything
    /// other than the entity `ignore`.
    fn line_of_sight(&self, from: Vec3, to: Vec3, ignore: EntityId) -> bool;
    /// Returns obstacles whose center lies within `radius` of `center`.
    fn obstacles_near(&self, center: Vec3, radius: f32) -> Vec<Obstacle>;
}

/// Weapon categories used for damage gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    /// Bare hands, claws, bites
    #[default]
    Unarmed,
    /// Swords, knives
    Blade,
    /// Clubs, hammers
    Blunt,
    /// Bows, guns, thrown weapons
    Ranged,
    /// Spells
    Magic,
}

/// Anything that can receive damage.
pub trait DamageReceiver {
    /// Applies damage from a weapon.
    fn take_damage(&mut self, amount: f32, weapon: WeaponKind);

    /// Returns whether the weapon can hurt this receiver.
    fn can_be_damaged_by(&self, _weapon: WeaponKind) -> bool {
        true
    }
}

/// Observed locomotion mode of the tracked target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Locomotion {
    /// Standing still
    #[default]
    Idle,
    /// Normal movement
    Walking,
    /// Sprinting
    Running,
    /// Crouched, moving or not
    Crouching,
}

impl Locomotion {
    /// Derives the locomotion mode from the target's movement flags.
    /// Crouching takes precedence over running.
    #[must_use]
    pub const fn from_flags(crouching: bool, moving: bool, running: bool) -> Self {
        if crouching {
            Self::Crouching
        } else if running {
            Self::Running
        } else if moving {
            Self::Walking
        } else {
            Self::Idle
        }
    }
}

/// Read-only view of the tracked target for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    /// Target entity
    pub id: EntityId,
    /// World position
    pub position: Vec3,
    /// Bounding radius
    pub extent: f32,
    /// Current locomotion mode
    pub locomotion: Locomotion,
}

impl TargetSnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub const fn new(id: EntityId, position: Vec3, locomotion: Locomotion) -> Self {
        Self {
            id,
            position,
            extent: 0.5,
            locomotion,
        }
    }

    /// Sets the bounding radius.
    #[must_use]
    pub const fn with_extent(mut self, extent: f32) -> Self {
        self.extent = extent;
        self
    }
}

/// The target agents track (usually the player).
pub trait TrackedTarget: DamageReceiver {
    /// Target entity ID.
    fn id(&self) -> EntityId;
    /// Current world position.
    fn position(&self) -> Vec3;
    /// Bounding radius.
    fn extent(&self) -> f32 {
        0.5
    }
    /// Whether the target is crouched.
    fn is_crouching(&self) -> bool;
    /// Whether the target is moving.
    fn is_moving(&self) -> bool;
    /// Whether the target is sprinting.
    fn is_running(&self) -> bool;

    /// Captures the read-only state used by perception this tick.
    fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            id: self.id(),
            position: self.position(),
            extent: self.extent(),
            locomotion: Locomotion::from_flags(
                self.is_crouching(),
                self.is_moving(),
                self.is_running(),
            ),
        }
    }
}

/// Spawns rolled drops into the world.
pub trait DropSpawner {
    /// Spawns items at a position.
    fn spawn_drops(&mut self, origin: Vec3, drops: &[ItemDrop]);
}

// ============================================================================
// Mocks
// ============================================================================

/// Body state tracked by [`MockMovement`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockBody {
    /// Position
    pub position: Vec3,
    /// Forward vector
    pub facing: Vec3,
    /// Bounding radius
    pub extent: f32,
    /// Current destination
    pub destination: Option<Vec3>,
    /// Speed last set
    pub speed: f32,
    /// Whether locomotion is enabled
    pub movement_enabled: bool,
    /// Whether the collider is enabled
    pub collision_enabled: bool,
    /// Number of destinations submitted
    pub requests: u32,
    /// Number of path clears
    pub clears: u32,
}

/// Mock movement backend for testing.
///
/// Bodies move in straight lines toward their destination when [`step`] is
/// called. Path status and surface checks are configurable.
///
/// [`step`]: MockMovement::step
#[derive(Debug, Default)]
pub struct MockMovement {
    bodies: HashMap<EntityId, MockBody>,
    status: HashMap<EntityId, PathStatus>,
    off_surface: HashSet<EntityId>,
    snap_point: Option<Vec3>,
}

impl MockMovement {
    /// Creates a new mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a body facing +Z.
    pub fn add_body(&mut self, id: EntityId, position: Vec3) {
        self.bodies.insert(
            id,
            MockBody {
                position,
                facing: Vec3::Z,
                extent: 0.5,
                destination: None,
                speed: 0.0,
                movement_enabled: true,
                collision_enabled: true,
                requests: 0,
                clears: 0,
            },
        );
    }

    /// Gets a body.
    #[must_use]
    pub fn body(&self, id: EntityId) -> Option<&MockBody> {
        self.bodies.get(&id)
    }

    /// Removes a body, as when the host despawns it.
    pub fn remove_body(&mut self, id: EntityId) {
        self.bodies.remove(&id);
    }

    /// Moves a body.
    pub fn set_position(&mut self, id: EntityId, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.position = position;
        }
    }

    /// Turns a body.
    pub fn set_facing(&mut self, id: EntityId, facing: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.facing = facing;
        }
    }

    /// Forces the path status reported for an agent.
    pub fn set_status(&mut self, id: EntityId, status: PathStatus) {
        self.status.insert(id, status);
    }

    /// Marks an agent as standing off the navigable surface.
    pub fn set_off_surface(&mut self, id: EntityId, off: bool) {
        if off {
            self.off_surface.insert(id);
        } else {
            self.off_surface.remove(&id);
        }
    }

    /// Sets the point returned by surface snaps (`None` = no surface nearby).
    pub fn set_snap_point(&mut self, point: Option<Vec3>) {
        self.snap_point = point;
    }

    /// Advances all bodies toward their destination.
    pub fn step(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            let Some(dest) = body.destination else {
                continue;
            };
            if !body.movement_enabled {
                continue;
            }
            let remaining = distance(body.position, dest);
            let travel = (body.speed * dt).min(remaining);
            let dir = direction_to(body.position, dest);
            if dir != Vec3::ZERO {
                body.facing = dir;
            }
            body.position += dir * travel;
        }
    }
}

impl MovementBackend for MockMovement {
    fn position(&self, agent: EntityId) -> Option<Vec3> {
        self.bodies.get(&agent).map(|b| b.position)
    }

    fn facing(&self, agent: EntityId) -> Option<Vec3> {
        self.bodies.get(&agent).map(|b| b.facing)
    }

    fn extent(&self, agent: EntityId) -> f32 {
        self.bodies.get(&agent).map_or(0.5, |b| b.extent)
    }

    fn set_destination(&mut self, agent: EntityId, point: Vec3) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.destination = Some(point);
            body.requests += 1;
        }
    }

    fn clear_path(&mut self, agent: EntityId) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.destination = None;
            body.clears += 1;
        }
    }

    fn path_status(&self, agent: EntityId) -> PathStatus {
        self.status.get(&agent).copied().unwrap_or_default()
    }

    fn is_on_navigable_surface(&self, agent: EntityId) -> bool {
        !self.off_surface.contains(&agent)
    }

    fn snap_to_nearest(&mut self, agent: EntityId, _point: Vec3, _radius: f32) -> Option<Vec3> {
        let point = self.snap_point?;
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.position = point;
        }
        self.off_surface.remove(&agent);
        Some(point)
    }

    fn set_speed(&mut self, agent: EntityId, speed: f32) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.speed = speed;
        }
    }

    fn set_movement_enabled(&mut self, agent: EntityId, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.movement_enabled = enabled;
        }
    }

    fn set_collision_enabled(&mut self, agent: EntityId, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.collision_enabled = enabled;
        }
    }
}

/// Mock sensing world for testing.
#[derive(Debug, Default)]
pub struct MockSenseWorld {
    /// Whether every line trace is blocked
    walls_everywhere: bool,
    /// Obstacles returned by proximity queries
    obstacles: Vec<Obstacle>,
}

impl MockSenseWorld {
    /// Creates an open world with clear sight lines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks every sight line.
    #[must_use]
    pub const fn with_walls(mut self, walls: bool) -> Self {
        self.walls_everywhere = walls;
        self
    }

    /// Adds an obstacle.
    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }
}

impl SenseWorld for MockSenseWorld {
    fn line_of_sight(&self, _from: Vec3, _to: Vec3, _ignore: EntityId) -> bool {
        !self.walls_everywhere
    }

    fn obstacles_near(&self, center: Vec3, radius: f32) -> Vec<Obstacle> {
        self.obstacles
            .iter()
            .filter(|o| distance(o.position, center) <= radius)
            .copied()
            .collect()
    }
}

/// Mock tracked target for testing.
#[derive(Debug, Clone)]
pub struct MockTarget {
    /// Entity ID
    pub id: EntityId,
    /// Position
    pub position: Vec3,
    /// Locomotion mode
    pub locomotion: Locomotion,
    /// Remaining health
    pub health: f32,
    /// Every hit received
    pub hits: Vec<(f32, WeaponKind)>,
    /// Weapons that cannot hurt this target
    pub immune_to: Vec<WeaponKind>,
}

impl MockTarget {
    /// Creates a target standing still.
    #[must_use]
    pub fn new(position: Vec3) -> Self {
        Self {
            id: EntityId::new(),
            position,
            locomotion: Locomotion::Idle,
            health: 100.0,
            hits: Vec::new(),
            immune_to: Vec::new(),
        }
    }

    /// Sets the locomotion mode.
    #[must_use]
    pub fn with_locomotion(mut self, locomotion: Locomotion) -> Self {
        self.locomotion = locomotion;
        self
    }
}

impl DamageReceiver for MockTarget {
    fn take_damage(&mut self, amount: f32, weapon: WeaponKind) {
        self.health = (self.health - amount).max(0.0);
        self.hits.push((amount, weapon));
    }

    fn can_be_damaged_by(&self, weapon: WeaponKind) -> bool {
        !self.immune_to.contains(&weapon)
    }
}

impl TrackedTarget for MockTarget {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn is_crouching(&self) -> bool {
        self.locomotion == Locomotion::Crouching
    }

    fn is_moving(&self) -> bool {
        matches!(self.locomotion, Locomotion::Walking | Locomotion::Running)
    }

    fn is_running(&self) -> bool {
        self.locomotion == Locomotion::Running
    }
}

/// Drop spawner that records what it was asked to spawn.
#[derive(Debug, Default)]
pub struct RecordingDropSpawner {
    /// Spawned batches
    pub spawned: Vec<(Vec3, Vec<ItemDrop>)>,
}

impl RecordingDropSpawner {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DropSpawner for RecordingDropSpawner {
    fn spawn_drops(&mut self, origin: Vec3, drops: &[ItemDrop]) {
        self.spawned.push((origin, drops.to_vec()));
    }
}
