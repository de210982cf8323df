//! Flat walled arena hosting agents and the player.
//!
//! The arena is split into the parts the director borrows separately:
//! [`ArenaMovement`] owns bodies and answers path queries, [`ArenaSenses`]
//! answers sight and proximity queries from a per-tick obstacle snapshot, and
//! [`DropLedger`] records spawned items.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use warden_common::{direction_to, distance, EntityId, Vec3, EPSILON};
use warden_gameplay::{
    DamageReceiver, DropSpawner, ItemDrop, MovementBackend, Obstacle, ObstacleKind, PathStatus, SenseWorld,
    TrackedTarget, WeaponKind,
};

/// Axis-aligned wall box in the XZ plane. Walls block sight and movement at
/// any height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    /// Minimum corner (x, z)
    pub min: [f32; 2],
    /// Maximum corner (x, z)
    pub max: [f32; 2],
}

impl Wall {
    /// Creates a wall from two corners in any order.
    #[must_use]
    pub fn new(a: [f32; 2], b: [f32; 2]) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1])],
            max: [a[0].max(b[0]), a[1].max(b[1])],
        }
    }

    /// Returns whether a point lies inside the box.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min[0] && point.x <= self.max[0] && point.z >= self.min[1] && point.z <= self.max[1]
    }

    /// Closest point of the box to `point`, at the point's height.
    #[must_use]
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(self.min[0], self.max[0]),
            point.y,
            point.z.clamp(self.min[1], self.max[1]),
        )
    }

    /// Returns whether the segment `from -> to` crosses the box (slab test).
    #[must_use]
    pub fn intersects_segment(&self, from: Vec3, to: Vec3) -> bool {
        let origin = [from.x, from.z];
        let delta = [to.x - from.x, to.z - from.z];
        let mut t_min = 0.0_f32;
        let mut t_max = 1.0_f32;

        for axis in 0..2 {
            if delta[axis].abs() < EPSILON {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / delta[axis];
            let mut t0 = (self.min[axis] - origin[axis]) * inv;
            let mut t1 = (self.max[axis] - origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

/// Static arena geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaLayout {
    /// Half the side length of the square floor centered on the origin
    pub half_size: f32,
    /// Wall boxes
    pub walls: Vec<Wall>,
}

impl Default for ArenaLayout {
    fn default() -> Self {
        Self {
            half_size: 30.0,
            walls: Vec::new(),
        }
    }
}

impl ArenaLayout {
    /// Creates an open floor.
    #[must_use]
    pub fn new(half_size: f32) -> Self {
        Self {
            half_size: half_size.max(1.0),
            walls: Vec::new(),
        }
    }

    /// Adds a wall.
    #[must_use]
    pub fn with_wall(mut self, wall: Wall) -> Self {
        self.walls.push(wall);
        self
    }

    /// Returns whether a point is on the floor and outside every wall.
    #[must_use]
    pub fn is_walkable(&self, point: Vec3) -> bool {
        point.x.abs() <= self.half_size
            && point.z.abs() <= self.half_size
            && !self.walls.iter().any(|w| w.contains(point))
    }

    /// Returns whether no wall crosses the segment.
    #[must_use]
    pub fn is_clear(&self, from: Vec3, to: Vec3) -> bool {
        !self.walls.iter().any(|w| w.intersects_segment(from, to))
    }

    /// Clamps a point onto the floor.
    #[must_use]
    pub fn clamp_to_floor(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(-self.half_size, self.half_size),
            0.0,
            point.z.clamp(-self.half_size, self.half_size),
        )
    }
}

/// A body driven by [`ArenaMovement`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaBody {
    /// Position
    pub position: Vec3,
    /// Forward vector
    pub facing: Vec3,
    /// Bounding radius
    pub extent: f32,
    /// Current destination
    pub destination: Option<Vec3>,
    /// Travel speed
    pub speed: f32,
    /// Whether locomotion is enabled
    pub movement_enabled: bool,
    /// Whether the collider is enabled
    pub collision_enabled: bool,
}

impl ArenaBody {
    fn new(position: Vec3, facing: Vec3) -> Self {
        Self {
            position,
            facing,
            extent: 0.5,
            destination: None,
            speed: 0.0,
            movement_enabled: true,
            collision_enabled: true,
        }
    }
}

/// Straight-line movement over the arena floor.
#[derive(Debug, Default)]
pub struct ArenaMovement {
    layout: ArenaLayout,
    bodies: HashMap<EntityId, ArenaBody>,
}

impl ArenaMovement {
    /// Creates a movement backend over a layout.
    #[must_use]
    pub fn new(layout: ArenaLayout) -> Self {
        Self {
            layout,
            bodies: HashMap::new(),
        }
    }

    /// Arena geometry.
    #[must_use]
    pub const fn layout(&self) -> &ArenaLayout {
        &self.layout
    }

    /// Adds a body.
    pub fn add_body(&mut self, id: EntityId, position: Vec3, facing: Vec3) {
        self.bodies.insert(id, ArenaBody::new(position, facing));
    }

    /// Removes a body. Returns whether it existed.
    pub fn remove_body(&mut self, id: EntityId) -> bool {
        self.bodies.remove(&id).is_some()
    }

    /// Gets a body.
    #[must_use]
    pub fn body(&self, id: EntityId) -> Option<&ArenaBody> {
        self.bodies.get(&id)
    }

    /// Number of bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Returns whether there are no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Bodies with colliders enabled.
    pub fn solid_bodies(&self) -> impl Iterator<Item = (EntityId, &ArenaBody)> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.collision_enabled)
            .map(|(id, body)| (*id, body))
    }

    /// Moves every enabled body toward its destination. A step that would end
    /// inside a wall or off the floor is not taken.
    pub fn step(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            let Some(dest) = body.destination else {
                continue;
            };
            if !body.movement_enabled {
                continue;
            }
            let dir = direction_to(body.position, dest);
            if dir == Vec3::ZERO {
                continue;
            }
            body.facing = dir;
            let travel = (body.speed * dt).min(distance(body.position, dest));
            let next = body.position + dir * travel;
            if self.layout.is_walkable(next) {
                body.position = next;
            }
        }
    }
}

impl MovementBackend for ArenaMovement {
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
        }
    }

    fn clear_path(&mut self, agent: EntityId) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.destination = None;
        }
    }

    fn path_status(&self, agent: EntityId) -> PathStatus {
        let Some(body) = self.bodies.get(&agent) else {
            return PathStatus::Blocked;
        };
        let Some(dest) = body.destination else {
            return PathStatus::Ok;
        };
        if !self.layout.is_walkable(dest) {
            PathStatus::Blocked
        } else if !self.layout.is_clear(body.position, dest) {
            PathStatus::Partial
        } else {
            PathStatus::Ok
        }
    }

    fn is_on_navigable_surface(&self, agent: EntityId) -> bool {
        self.bodies
            .get(&agent)
            .is_some_and(|b| self.layout.is_walkable(b.position))
    }

    fn snap_to_nearest(&mut self, agent: EntityId, point: Vec3, radius: f32) -> Option<Vec3> {
        let snapped = self.layout.clamp_to_floor(point);
        if distance(snapped, point) > radius || !self.layout.is_walkable(snapped) {
            return None;
        }
        let body = self.bodies.get_mut(&agent)?;
        body.position = snapped;
        debug!("Snapped {} onto the floor at {:?}", agent, snapped);
        Some(snapped)
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

/// Sight and proximity queries over the arena.
///
/// Walls block sight. Bodies never do; they only show up in proximity
/// queries, taken from the snapshot made by [`refresh`].
///
/// [`refresh`]: ArenaSenses::refresh
#[derive(Debug, Default)]
pub struct ArenaSenses {
    layout: ArenaLayout,
    obstacles: Vec<Obstacle>,
}

impl ArenaSenses {
    /// Creates a sensing world over a layout.
    #[must_use]
    pub fn new(layout: ArenaLayout) -> Self {
        Self {
            layout,
            obstacles: Vec::new(),
        }
    }

    /// Rebuilds the obstacle snapshot from the current bodies and player.
    pub fn refresh(&mut self, movement: &ArenaMovement, player: Option<&Player>) {
        self.obstacles.clear();
        self.obstacles.extend(
            movement
                .solid_bodies()
                .map(|(id, body)| Obstacle::new(id, body.position, ObstacleKind::Agent)),
        );
        if let Some(player) = player.filter(|p| p.is_alive()) {
            self.obstacles
                .push(Obstacle::new(player.id, player.position, ObstacleKind::Target));
        }
    }
}

impl SenseWorld for ArenaSenses {
    fn line_of_sight(&self, from: Vec3, to: Vec3, _ignore: EntityId) -> bool {
        self.layout.is_clear(from, to)
    }

    fn obstacles_near(&self, center: Vec3, radius: f32) -> Vec<Obstacle> {
        let walls = self
            .layout
            .walls
            .iter()
            .map(|w| Obstacle::new(EntityId::NULL, w.closest_point(center), ObstacleKind::Static));
        self.obstacles
            .iter()
            .copied()
            .chain(walls)
            .filter(|o| distance(o.position, center) <= radius)
            .collect()
    }
}

/// A drop that landed in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnedDrop {
    /// Where it landed
    pub position: Vec3,
    /// What dropped
    pub drop: ItemDrop,
}

/// Drop spawner that records everything it spawns.
#[derive(Debug, Default)]
pub struct DropLedger {
    spawned: Vec<SpawnedDrop>,
}

impl DropLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops spawned so far.
    #[must_use]
    pub fn spawned(&self) -> &[SpawnedDrop] {
        &self.spawned
    }

    /// Total item count across all drops.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.spawned.iter().map(|s| s.drop.quantity).sum()
    }
}

impl DropSpawner for DropLedger {
    fn spawn_drops(&mut self, origin: Vec3, drops: &[ItemDrop]) {
        for drop in drops {
            info!(
                "Dropped {}x item {} at ({:.1}, {:.1})",
                drop.quantity,
                drop.item.raw(),
                origin.x,
                origin.z
            );
            self.spawned.push(SpawnedDrop { position: origin, drop: *drop });
        }
    }
}

/// The scripted player the agents hunt.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Entity ID
    pub id: EntityId,
    /// Position
    pub position: Vec3,
    /// Health
    pub health: f32,
    /// Crouch flag
    pub crouching: bool,
    /// Sprint flag
    pub running: bool,
    /// Whether the position changed this tick
    pub moving: bool,
    /// Damage taken, per hit
    pub hits: Vec<(f32, WeaponKind)>,
}

impl Player {
    /// Creates a standing player with full health.
    #[must_use]
    pub fn new(position: Vec3) -> Self {
        Self {
            id: EntityId::new(),
            position,
            health: 100.0,
            crouching: false,
            running: false,
            moving: false,
            hits: Vec::new(),
        }
    }

    /// Returns whether the player has health left.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Moves the player and updates its locomotion flags.
    pub fn move_to(&mut self, position: Vec3, crouching: bool, running: bool) {
        self.moving = distance(self.position, position) > EPSILON;
        self.position = position;
        self.crouching = crouching;
        self.running = running;
    }
}

impl DamageReceiver for Player {
    fn take_damage(&mut self, amount: f32, weapon: WeaponKind) {
        self.health = (self.health - amount).max(0.0);
        self.hits.push((amount, weapon));
    }
}

impl TrackedTarget for Player {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn is_crouching(&self) -> bool {
        self.crouching
    }

    fn is_moving(&self) -> bool {
        self.moving
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
