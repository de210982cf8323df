//! Agent registry and tick orchestration.
//!
//! The director owns every agent in stable ID order, routes host callbacks to
//! the right agent and delivers alerts. Alerts raised while an operation runs
//! are buffered and fanned out once it has finished.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, trace};
use warden_common::{distance, EntityId, Vec3};

use crate::agent::{Agent, AgentSnapshot, DamageOutcome, Hit, TickContext};
use crate::alert::AlertQueue;
use crate::combat::AttackToken;
use crate::events::{AgentEvent, EventBus};
use crate::world::{DropSpawner, MovementBackend, SenseWorld, TargetSnapshot, TrackedTarget};

/// Default radius of the alert fan-out.
pub const DEFAULT_ALERT_RADIUS: f32 = 15.0;

/// Errors for registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectorError {
    /// No agent with this ID
    #[error("Agent not found: {0}")]
    NotFound(EntityId),
    /// An agent with this ID is already registered
    #[error("Agent already registered: {0}")]
    AlreadyRegistered(EntityId),
}

/// Result type for director operations.
pub type DirectorResult<T> = Result<T, DirectorError>;

/// What happened during a director tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Attacks started this tick; the host plays the animation and calls
    /// back with the token
    pub attacks: Vec<(EntityId, AttackToken)>,
    /// Agents that finished dying and left the registry
    pub removed: Vec<EntityId>,
}

/// Tick orchestrator for all agents.
#[derive(Debug)]
pub struct Director {
    agents: BTreeMap<EntityId, Agent>,
    events: EventBus,
    alerts: AlertQueue,
    rng: fastrand::Rng,
    alert_radius: f32,
}

impl Director {
    /// Creates a director with a seeded random source.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            agents: BTreeMap::new(),
            events: EventBus::default(),
            alerts: AlertQueue::new(),
            rng: fastrand::Rng::with_seed(seed),
            alert_radius: DEFAULT_ALERT_RADIUS,
        }
    }

    /// Sets the alert radius.
    #[must_use]
    pub fn with_alert_radius(mut self, radius: f32) -> Self {
        self.alert_radius = radius.max(0.0);
        self
    }

    /// Replaces the event bus with one of the given capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events = EventBus::new(capacity);
        self
    }

    /// Alert radius.
    #[must_use]
    pub const fn alert_radius(&self) -> f32 {
        self.alert_radius
    }

    /// Number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns whether no agents are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Gets an agent.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Gets an agent mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Iterates agents in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Agent)> {
        self.agents.iter().map(|(id, agent)| (*id, agent))
    }

    /// Event bus the agents publish to.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Drains pending events.
    pub fn drain_events(&self) -> Vec<AgentEvent> {
        self.events.drain()
    }

    /// Registers an agent whose body already exists in the movement backend.
    pub fn register<M: MovementBackend>(&mut self, mut agent: Agent, movement: &mut M) -> DirectorResult<()> {
        let id = agent.id();
        if self.agents.contains_key(&id) {
            return Err(DirectorError::AlreadyRegistered(id));
        }
        agent.activate(movement);
        debug!("Registered agent {} ({})", id, agent.name());
        self.agents.insert(id, agent);
        Ok(())
    }

    /// Removes an agent immediately.
    pub fn despawn(&mut self, id: EntityId) -> DirectorResult<Agent> {
        self.agents.remove(&id).ok_or(DirectorError::NotFound(id))
    }

    /// Advances every agent by one step, in ID order.
    pub fn tick<M: MovementBackend, W: SenseWorld>(
        &mut self,
        movement: &mut M,
        world: &W,
        target: Option<&TargetSnapshot>,
        now: f32,
    ) -> TickReport {
        let mut report = TickReport::default();

        for (id, agent) in &mut self.agents {
            let mut ctx = TickContext {
                movement: &mut *movement,
                world,
                rng: &mut self.rng,
                events: &self.events,
                now,
            };
            if let Some(token) = agent.tick(&mut ctx, target) {
                report.attacks.push((*id, token));
            }
        }

        self.agents.retain(|id, agent| {
            if agent.is_removed() {
                report.removed.push(*id);
                false
            } else {
                true
            }
        });

        self.flush_alerts(movement, now);
        trace!("Director tick at {now:.2}: {} agents", self.agents.len());
        report
    }

    /// Damage frame of an agent's attack animation.
    pub fn execute_attack_damage<M, T>(
        &mut self,
        id: EntityId,
        token: AttackToken,
        target: Option<&mut T>,
        movement: &M,
        now: f32,
    ) -> DirectorResult<bool>
    where
        M: MovementBackend,
        T: TrackedTarget + ?Sized,
    {
        let agent = self.agents.get_mut(&id).ok_or(DirectorError::NotFound(id))?;
        let hit = agent.execute_attack_damage(token, target, movement, &mut self.alerts, &self.events);
        self.flush_alerts(movement, now);
        Ok(hit)
    }

    /// An agent's attack animation finished.
    pub fn on_attack_animation_end(&mut self, id: EntityId) -> DirectorResult<()> {
        self.agents
            .get_mut(&id)
            .ok_or(DirectorError::NotFound(id))?
            .on_attack_animation_end();
        Ok(())
    }

    /// An agent's death animation finished. The agent leaves the registry.
    pub fn on_death_animation_complete(&mut self, id: EntityId) -> DirectorResult<()> {
        let agent = self.agents.get_mut(&id).ok_or(DirectorError::NotFound(id))?;
        agent.on_death_animation_complete(&self.events);
        if agent.is_removed() {
            self.agents.remove(&id);
        }
        Ok(())
    }

    /// Footstep frame of an agent's walk animation.
    pub fn play_footstep<M: MovementBackend>(&self, id: EntityId, movement: &M) -> DirectorResult<bool> {
        let agent = self.agents.get(&id).ok_or(DirectorError::NotFound(id))?;
        Ok(agent.play_footstep(movement, &self.events))
    }

    /// Applies a hit to an agent.
    pub fn damage_agent<M, W, D>(
        &mut self,
        id: EntityId,
        hit: &Hit,
        movement: &mut M,
        world: &W,
        spawner: &mut D,
        now: f32,
    ) -> DirectorResult<DamageOutcome>
    where
        M: MovementBackend,
        W: SenseWorld,
        D: DropSpawner,
    {
        let agent = self.agents.get_mut(&id).ok_or(DirectorError::NotFound(id))?;
        let mut ctx = TickContext {
            movement: &mut *movement,
            world,
            rng: &mut self.rng,
            events: &self.events,
            now,
        };
        let outcome = agent.take_damage(hit, &mut ctx, spawner, &mut self.alerts);
        self.flush_alerts(movement, now);
        Ok(outcome)
    }

    /// Forces detection on every living agent within the alert radius of
    /// `origin`. Returns how many agents were alerted.
    pub fn broadcast_alert<M: MovementBackend>(&mut self, origin: Vec3, movement: &M, now: f32) -> usize {
        let mut alerted = 0;
        for agent in self.agents.values_mut() {
            if !agent.is_alive() {
                continue;
            }
            let Some(position) = movement.position(agent.id()) else {
                continue;
            };
            if distance(position, origin) <= self.alert_radius {
                agent.receive_alert(origin, now, &self.events);
                alerted += 1;
            }
        }
        debug!("Alert at {:?} reached {} agents", origin, alerted);
        alerted
    }

    fn flush_alerts<M: MovementBackend>(&mut self, movement: &M, now: f32) {
        for origin in self.alerts.drain() {
            self.broadcast_alert(origin, movement, now);
        }
    }

    /// Living agents within `range` of `position`.
    pub fn get_in_range<M: MovementBackend>(&self, position: Vec3, range: f32, movement: &M) -> Vec<EntityId> {
        self.agents
            .values()
            .filter(|agent| agent.is_alive())
            .filter(|agent| {
                movement
                    .position(agent.id())
                    .is_some_and(|p| distance(p, position) <= range)
            })
            .map(Agent::id)
            .collect()
    }

    /// Snapshots of every agent in ID order.
    pub fn snapshots<M: MovementBackend>(&self, movement: &M) -> Vec<AgentSnapshot> {
        self.agents.values().map(|agent| agent.snapshot(movement)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Archetype;
    use crate::world::{Locomotion, MockMovement, MockSenseWorld, MockTarget, RecordingDropSpawner, WeaponKind};

    fn spawn_at(director: &mut Director, movement: &mut MockMovement, position: Vec3) -> EntityId {
        let id = EntityId::new();
        movement.add_body(id, position);
        director
            .register(Archetype::new("grunt").spawn(id, position), movement)
            .expect("fresh id");
        id
    }

    #[test]
    fn test_register_and_despawn() {
        let mut director = Director::new(1);
        let mut movement = MockMovement::new();
        let id = spawn_at(&mut director, &mut movement, Vec3::ZERO);
        assert_eq!(director.len(), 1);

        let dup = Archetype::new("grunt").spawn(id, Vec3::ZERO);
        assert_eq!(director.register(dup, &mut movement), Err(DirectorError::AlreadyRegistered(id)));

        assert!(director.despawn(id).is_ok());
        assert!(director.is_empty());
        assert!(matches!(director.despawn(id), Err(DirectorError::NotFound(_))));
    }

    #[test]
    fn test_alert_reaches_only_agents_in_radius() {
        let mut director = Director::new(1).with_alert_radius(10.0);
        let mut movement = MockMovement::new();
        let near = spawn_at(&mut director, &mut movement, Vec3::new(3.0, 0.0, 0.0));
        let edge = spawn_at(&mut director, &mut movement, Vec3::new(10.0, 0.0, 0.0));
        let far = spawn_at(&mut director, &mut movement, Vec3::new(30.0, 0.0, 0.0));

        let alerted = director.broadcast_alert(Vec3::ZERO, &movement, 2.0);
        assert_eq!(alerted, 2);
        let detected = |id| director.get(id).is_some_and(|a| a.perception().detected);
        assert!(detected(near));
        assert!(detected(edge));
        assert!(!detected(far));
    }

    #[test]
    fn test_alert_skips_dead_agents() {
        let mut director = Director::new(1);
        let mut movement = MockMovement::new();
        let world = MockSenseWorld::new();
        let mut spawner = RecordingDropSpawner::new();
        let id = spawn_at(&mut director, &mut movement, Vec3::ZERO);
        director
            .damage_agent(id, &Hit::new(1000.0, WeaponKind::Blade), &mut movement, &world, &mut spawner, 0.0)
            .expect("registered");
        assert_eq!(director.broadcast_alert(Vec3::ZERO, &movement, 1.0), 0);
    }

    #[test]
    fn test_stealth_hit_alerts_neighbours() {
        let mut director = Director::new(1);
        let mut movement = MockMovement::new();
        let world = MockSenseWorld::new();
        let mut spawner = RecordingDropSpawner::new();
        let victim = spawn_at(&mut director, &mut movement, Vec3::ZERO);
        let buddy = spawn_at(&mut director, &mut movement, Vec3::new(5.0, 0.0, 0.0));

        let outcome = director
            .damage_agent(victim, &Hit::new(10.0, WeaponKind::Blade), &mut movement, &world, &mut spawner, 1.0)
            .expect("registered");
        assert_eq!(outcome, DamageOutcome::Damaged { amount: 30.0, stealth: true });
        assert!(director.get(buddy).is_some_and(|a| a.perception().detected));
    }

    #[test]
    fn test_attack_hit_alerts_neighbours() {
        let mut director = Director::new(1);
        let mut movement = MockMovement::new();
        let world = MockSenseWorld::new();
        let attacker = spawn_at(&mut director, &mut movement, Vec3::ZERO);
        let bystander = spawn_at(&mut director, &mut movement, Vec3::new(-8.0, 0.0, 0.0));

        let mut target = MockTarget::new(Vec3::new(0.0, 0.0, 2.0)).with_locomotion(Locomotion::Idle);
        let report = director.tick(&mut movement, &world, Some(&target.snapshot()), 0.0);
        let (who, token) = report.attacks[0];
        assert_eq!(who, attacker);
        assert!(!director.get(bystander).is_some_and(|a| a.perception().detected));

        let hit = director
            .execute_attack_damage(attacker, token, Some(&mut target), &movement, 0.4)
            .expect("registered");
        assert!(hit);
        assert_eq!(target.health, 90.0);
        assert!(director.get(bystander).is_some_and(|a| a.perception().detected));
        director.on_attack_animation_end(attacker).expect("registered");
    }

    #[test]
    fn test_dead_agents_removed_after_timeout() {
        let mut director = Director::new(1);
        let mut movement = MockMovement::new();
        let world = MockSenseWorld::new();
        let mut spawner = RecordingDropSpawner::new();
        let id = spawn_at(&mut director, &mut movement, Vec3::ZERO);
        director
            .damage_agent(id, &Hit::new(1000.0, WeaponKind::Blade), &mut movement, &world, &mut spawner, 0.0)
            .expect("registered");

        assert!(director.tick(&mut movement, &world, None, 1.0).removed.is_empty());
        let report = director.tick(&mut movement, &world, None, 5.0);
        assert_eq!(report.removed, vec![id]);
        assert!(director.get(id).is_none());
        assert!(director
            .drain_events()
            .iter()
            .any(|e| matches!(e, AgentEvent::Removed { agent } if *agent == id)));
    }

    #[test]
    fn test_death_animation_removes_immediately() {
        let mut director = Director::new(1);
        let mut movement = MockMovement::new();
        let world = MockSenseWorld::new();
        let mut spawner = RecordingDropSpawner::new();
        let id = spawn_at(&mut director, &mut movement, Vec3::ZERO);

        director.on_death_animation_complete(id).expect("registered");
        assert!(director.get(id).is_some());

        director
            .damage_agent(id, &Hit::new(1000.0, WeaponKind::Blade), &mut movement, &world, &mut spawner, 0.0)
            .expect("registered");
        director.on_death_animation_complete(id).expect("registered");
        assert!(director.get(id).is_none());
        assert_eq!(
            director.on_death_animation_complete(id),
            Err(DirectorError::NotFound(id))
        );
    }

    #[test]
    fn test_get_in_range_and_ordering() {
        let mut director = Director::new(1);
        let mut movement = MockMovement::new();
        let a = spawn_at(&mut director, &mut movement, Vec3::new(1.0, 0.0, 0.0));
        let b = spawn_at(&mut director, &mut movement, Vec3::new(2.0, 0.0, 0.0));
        spawn_at(&mut director, &mut movement, Vec3::new(50.0, 0.0, 0.0));

        assert_eq!(director.get_in_range(Vec3::ZERO, 5.0, &movement), vec![a, b]);
        let ids: Vec<_> = director.iter().map(|(id, _)| id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(director.snapshots(&movement).len(), 3);
    }

    #[test]
    fn test_footstep_routing() {
        let director = Director::new(1);
        let movement = MockMovement::new();
        let missing = EntityId::new();
        assert_eq!(director.play_footstep(missing, &movement), Err(DirectorError::NotFound(missing)));
    }
}
