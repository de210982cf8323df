//! Adversary agent: ties perception, behavior, navigation and combat together.
//!
//! An agent is driven from three directions:
//! - [`Agent::tick`] once per simulation step
//! - animation callbacks ([`Agent::execute_attack_damage`],
//!   [`Agent::on_attack_animation_end`], [`Agent::on_death_animation_complete`],
//!   [`Agent::play_footstep`])
//! - incoming hits and alerts ([`Agent::take_damage`], [`Agent::receive_alert`])

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use warden_common::{distance, EntityId, Vec3};

use crate::alert::AlertSink;
use crate::behavior::{BehaviorMachine, BehaviorState, PatrolDirective};
use crate::combat::{AttackBehavior, AttackToken, CombatTiming};
use crate::config::{AgentConfig, Archetype};
use crate::drops::{DropBehavior, DropTable};
use crate::events::{AgentEvent, EventBus};
use crate::navigation::{effective_attack_range, NavigationAdapter};
use crate::patrol::PatrolRoute;
use crate::perception::{Observer, PerceptionEngine, PerceptionState};
use crate::world::{DropSpawner, MovementBackend, SenseWorld, TargetSnapshot, TrackedTarget, WeaponKind};

/// Life cycle of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum LifeState {
    /// Acting normally
    #[default]
    Alive,
    /// Playing the death sequence
    Dying {
        /// Time of death
        since: f32,
    },
    /// Finished dying; ready to be dropped from the registry
    Removed,
}

/// Collaborators and clock shared by per-agent operations.
pub struct TickContext<'a, M: MovementBackend, W: SenseWorld> {
    /// Movement backend
    pub movement: &'a mut M,
    /// Sensing world
    pub world: &'a W,
    /// Shared random source
    pub rng: &'a mut fastrand::Rng,
    /// Event sink
    pub events: &'a EventBus,
    /// Current simulation time in seconds
    pub now: f32,
}

/// An incoming hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Base damage before multipliers
    pub amount: f32,
    /// Weapon used
    pub weapon: WeaponKind,
    /// Where the hit came from
    pub origin: Option<Vec3>,
}

impl Hit {
    /// Creates a hit with no known origin.
    #[must_use]
    pub const fn new(amount: f32, weapon: WeaponKind) -> Self {
        Self {
            amount,
            weapon,
            origin: None,
        }
    }

    /// Sets the hit origin.
    #[must_use]
    pub const fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Result of [`Agent::take_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// Dead agent or immune to the weapon
    Ignored,
    /// Damage applied; agent still alive
    Damaged {
        /// Damage after multipliers
        amount: f32,
        /// Whether the hit landed unnoticed
        stealth: bool,
    },
    /// Damage applied and the agent died
    Killed {
        /// Damage after multipliers
        amount: f32,
        /// Whether the hit landed unnoticed
        stealth: bool,
    },
}

/// Serializable view of an agent for debugging output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Agent ID
    pub id: EntityId,
    /// Archetype name
    pub name: String,
    /// Behavior state
    pub state: BehaviorState,
    /// Life cycle
    pub life: LifeState,
    /// Current health
    pub health: f32,
    /// Maximum health
    pub max_health: f32,
    /// Whether the target is currently detected
    pub detected: bool,
    /// Position reported by the movement backend
    pub position: Option<Vec3>,
    /// Current patrol waypoint
    pub patrol_index: usize,
    /// Last known target position
    pub last_known_target: Option<Vec3>,
}

/// A single adversary.
#[derive(Debug)]
pub struct Agent {
    id: EntityId,
    name: String,
    config: AgentConfig,
    health: f32,
    life: LifeState,
    perception: PerceptionState,
    behavior: BehaviorMachine,
    nav: NavigationAdapter,
    combat: CombatTiming,
    attack: Box<dyn AttackBehavior>,
    drop_behavior: Box<dyn DropBehavior>,
    drop_table: DropTable,
    route: Option<PatrolRoute>,
    tracked: Option<EntityId>,
    moving: bool,
}

impl Agent {
    /// Creates an agent from an archetype at its spawn position.
    #[must_use]
    pub fn from_archetype(id: EntityId, archetype: &Archetype, position: Vec3) -> Self {
        let mut config = archetype.config.clone();
        config.validate();
        Self {
            id,
            name: archetype.name.clone(),
            health: config.max_health,
            life: LifeState::Alive,
            perception: PerceptionState::new(config.perception.memory_duration),
            behavior: BehaviorMachine::new(position),
            nav: NavigationAdapter::new(),
            combat: CombatTiming::new(config.attack_cooldown),
            attack: archetype.attack.build(),
            drop_behavior: archetype.drops.build(),
            drop_table: archetype.drop_table.clone(),
            route: archetype.route.clone(),
            tracked: None,
            moving: false,
            config,
        }
    }

    /// Agent ID.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Archetype name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tuning in effect.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Life cycle state.
    #[must_use]
    pub const fn life(&self) -> LifeState {
        self.life
    }

    /// Returns whether the agent is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        matches!(self.life, LifeState::Alive)
    }

    /// Returns whether the death sequence has finished.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        matches!(self.life, LifeState::Removed)
    }

    /// Behavior state.
    #[must_use]
    pub const fn state(&self) -> BehaviorState {
        self.behavior.state()
    }

    /// Behavior bookkeeping.
    #[must_use]
    pub const fn behavior(&self) -> &BehaviorMachine {
        &self.behavior
    }

    /// Detection memory.
    #[must_use]
    pub const fn perception(&self) -> &PerceptionState {
        &self.perception
    }

    /// Attack timing.
    #[must_use]
    pub const fn combat(&self) -> &CombatTiming {
        &self.combat
    }

    /// Returns whether the agent has an active movement request.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.moving
    }

    /// Returns whether `weapon` can hurt this agent.
    #[must_use]
    pub fn can_be_damaged_by(&self, weapon: WeaponKind) -> bool {
        !self.config.immune_to.contains(&weapon)
    }

    /// Applies spawn-time body settings.
    pub fn activate<M: MovementBackend>(&mut self, movement: &mut M) {
        movement.set_movement_enabled(self.id, true);
        movement.set_collision_enabled(self.id, true);
        movement.set_speed(self.id, self.speed_for(self.behavior.state()));
    }

    /// Travel speed for a behavior state.
    #[must_use]
    pub fn speed_for(&self, state: BehaviorState) -> f32 {
        match state {
            BehaviorState::Patrol => self
                .route
                .as_ref()
                .and_then(|r| r.speed)
                .unwrap_or(self.config.base_speed),
            BehaviorState::Chase => self.config.base_speed * self.config.chase_speed_multiplier,
            BehaviorState::Return => self.config.base_speed * self.config.return_speed_multiplier,
        }
    }

    /// Runs one simulation step.
    ///
    /// Returns the token of an attack started this tick.
    pub fn tick<M: MovementBackend, W: SenseWorld>(
        &mut self,
        ctx: &mut TickContext<'_, M, W>,
        target: Option<&TargetSnapshot>,
    ) -> Option<AttackToken> {
        if let LifeState::Dying { since } = self.life {
            if ctx.now - since >= self.config.death_timeout {
                self.finish_dying(ctx.events);
            }
            return None;
        }
        if !self.is_alive() {
            return None;
        }

        // Memory ages even while the body is missing
        let Some(position) = ctx.movement.position(self.id) else {
            self.perception.update(false, ctx.now);
            return None;
        };
        let facing = ctx.movement.facing(self.id).unwrap_or(Vec3::Z);

        let sensed = target.is_some_and(|t| {
            let observer = Observer {
                id: self.id,
                position,
                facing,
            };
            PerceptionEngine::new(&self.config.perception, ctx.world).evaluate(
                &observer,
                t,
                &mut self.perception,
                ctx.rng,
                ctx.now,
            )
        });
        let detected = self.perception.update(sensed, ctx.now);
        if detected {
            if let Some(t) = target {
                self.behavior.last_known_target_position = Some(t.position);
                self.tracked = Some(t.id);
            }
        }

        match self.behavior.state() {
            BehaviorState::Patrol => {
                if detected {
                    self.change_state(BehaviorState::Chase, ctx, position);
                }
            },
            BehaviorState::Chase => {
                if detected {
                    self.behavior.last_target_seen = ctx.now;
                } else if self.behavior.target_lost(ctx.now, self.config.lost_target_delay) {
                    self.change_state(BehaviorState::Return, ctx, position);
                }
            },
            BehaviorState::Return => {
                if detected {
                    self.change_state(BehaviorState::Chase, ctx, position);
                } else if self.behavior.has_returned(position, self.config.arrival_tolerance) {
                    self.change_state(BehaviorState::Patrol, ctx, position);
                }
            },
        }

        match self.behavior.state() {
            BehaviorState::Patrol => {
                self.update_patrol(ctx, position);
                None
            },
            BehaviorState::Chase => self.update_chase(ctx, position, target.filter(|_| detected)),
            BehaviorState::Return => {
                let anchor = self.behavior.return_anchor;
                self.move_to(ctx, anchor);
                None
            },
        }
    }

    fn update_patrol<M: MovementBackend, W: SenseWorld>(
        &mut self,
        ctx: &mut TickContext<'_, M, W>,
        position: Vec3,
    ) {
        let directive = self.behavior.patrol_directive(
            self.route.as_ref(),
            position,
            self.config.arrival_tolerance,
            ctx.now,
        );
        match directive {
            PatrolDirective::MoveTo(point) => self.move_to(ctx, point),
            PatrolDirective::Wait | PatrolDirective::Hold => self.halt(ctx.movement),
        }
    }

    fn update_chase<M: MovementBackend, W: SenseWorld>(
        &mut self,
        ctx: &mut TickContext<'_, M, W>,
        position: Vec3,
        target: Option<&TargetSnapshot>,
    ) -> Option<AttackToken> {
        if let Some(t) = target {
            let reach = effective_attack_range(
                self.config.attack_range,
                ctx.movement.extent(self.id),
                t.extent,
            );
            if distance(position, t.position) <= reach {
                self.halt(ctx.movement);
                return self.try_attack(ctx.now, ctx.events);
            }
        }

        // A swing roots the agent until its animation ends
        if self.combat.is_swinging() {
            self.halt(ctx.movement);
            return None;
        }

        if let Some(t) = target {
            self.move_to(ctx, t.position);
            return None;
        }

        // Target out of mind: head for where it was last seen
        match self.behavior.last_known_target_position {
            Some(last) if distance(position, last) > self.config.arrival_tolerance => {
                self.move_to(ctx, last);
            },
            _ => self.halt(ctx.movement),
        }
        None
    }

    fn move_to<M: MovementBackend, W: SenseWorld>(
        &mut self,
        ctx: &mut TickContext<'_, M, W>,
        point: Vec3,
    ) {
        self.nav.move_toward(
            self.id,
            point,
            self.tracked,
            &self.config.avoidance,
            ctx.movement,
            ctx.world,
            ctx.now,
        );
        self.moving = true;
    }

    fn halt<M: MovementBackend>(&mut self, movement: &mut M) {
        if self.moving {
            self.nav.stop(self.id, movement);
            self.moving = false;
        }
    }

    fn change_state<M: MovementBackend, W: SenseWorld>(
        &mut self,
        next: BehaviorState,
        ctx: &mut TickContext<'_, M, W>,
        position: Vec3,
    ) {
        let from = self.behavior.state();
        if let Err(err) = self
            .behavior
            .transition_to(next, self.route.as_ref(), position, ctx.now)
        {
            warn!("Agent {}: {}", self.id, err);
            return;
        }

        self.nav.stop(self.id, ctx.movement);
        self.moving = false;
        if from == BehaviorState::Chase {
            self.combat.interrupt();
        }
        ctx.movement.set_speed(self.id, self.speed_for(next));

        debug!("Agent {} {} -> {}", self.id, from, next);
        ctx.events.publish(AgentEvent::StateChanged {
            agent: self.id,
            from,
            to: next,
        });
    }

    /// Starts an attack if alive and off cooldown.
    pub fn try_attack(&mut self, now: f32, events: &EventBus) -> Option<AttackToken> {
        if !self.is_alive() {
            return None;
        }
        let token = self.combat.begin(now)?;
        debug!("Agent {} starts attack {}", self.id, token.raw());
        events.publish(AgentEvent::AttackStarted {
            agent: self.id,
            token,
        });
        Some(token)
    }

    /// Damage frame of the attack animation. The only place an agent deals
    /// damage.
    ///
    /// Applies damage when the token is current, the agent is alive, a target
    /// is present and the weapon can hurt it. A successful hit raises an
    /// alert at the agent's position.
    pub fn execute_attack_damage<T, M, A>(
        &mut self,
        token: AttackToken,
        target: Option<&mut T>,
        movement: &M,
        alerts: &mut A,
        events: &EventBus,
    ) -> bool
    where
        T: TrackedTarget + ?Sized,
        M: MovementBackend,
        A: AlertSink,
    {
        if !self.is_alive() || !self.combat.resolve(token) {
            return false;
        }
        let Some(target) = target else {
            return false;
        };
        let weapon = self.attack.weapon_kind();
        if !target.can_be_damaged_by(weapon) {
            debug!("Agent {} attack blocked: target immune to {:?}", self.id, weapon);
            return false;
        }

        let amount = self.attack.damage(self.config.attack_damage);
        target.take_damage(amount, weapon);
        debug!("Agent {} hits {} for {}", self.id, target.id(), amount);
        events.publish(AgentEvent::DamageDealt {
            agent: self.id,
            target: target.id(),
            amount,
            weapon,
        });

        if let Some(origin) = movement.position(self.id) {
            alerts.raise_alert(origin);
        }
        true
    }

    /// The attack animation finished; the agent may move again.
    pub fn on_attack_animation_end(&mut self) {
        self.combat.end();
    }

    /// The death animation finished; completes removal.
    pub fn on_death_animation_complete(&mut self, events: &EventBus) {
        if matches!(self.life, LifeState::Dying { .. }) {
            self.finish_dying(events);
        }
    }

    /// Footstep frame of the walk animation. Emits a footstep only while alive
    /// and moving.
    pub fn play_footstep<M: MovementBackend>(&self, movement: &M, events: &EventBus) -> bool {
        if !self.is_alive() || !self.moving {
            return false;
        }
        let Some(position) = movement.position(self.id) else {
            return false;
        };
        events.publish(AgentEvent::Footstep {
            agent: self.id,
            position,
        });
        true
    }

    /// Forces detection after a nearby hit.
    pub fn receive_alert(&mut self, origin: Vec3, now: f32, events: &EventBus) {
        if !self.is_alive() {
            return;
        }
        self.perception.force_detect(now);
        events.publish(AgentEvent::Alerted {
            agent: self.id,
            origin,
        });
    }

    /// Applies an incoming hit.
    ///
    /// A hit landing while the agent is unaware is a stealth hit: damage is
    /// multiplied and an alert is raised from the hit origin. Any hit makes
    /// the agent aware and extends its detection memory.
    pub fn take_damage<M, W, D, A>(
        &mut self,
        hit: &Hit,
        ctx: &mut TickContext<'_, M, W>,
        spawner: &mut D,
        alerts: &mut A,
    ) -> DamageOutcome
    where
        M: MovementBackend,
        W: SenseWorld,
        D: DropSpawner,
        A: AlertSink,
    {
        if !self.is_alive() || !self.can_be_damaged_by(hit.weapon) {
            return DamageOutcome::Ignored;
        }

        let stealth = !self.perception.detected;
        let amount = if stealth {
            hit.amount * self.config.stealth_damage_multiplier
        } else {
            hit.amount
        };
        self.health = (self.health - amount).max(0.0);

        self.perception
            .extend_memory(self.config.perception.damaged_memory_duration);
        self.perception.force_detect(ctx.now);
        if let Some(origin) = hit.origin {
            self.behavior.last_known_target_position = Some(origin);
        }

        let position = ctx.movement.position(self.id);
        if stealth {
            debug!("Agent {} took a stealth hit for {}", self.id, amount);
            if let Some(origin) = hit.origin.or(position) {
                alerts.raise_alert(origin);
            }
        }
        ctx.events.publish(AgentEvent::DamageTaken {
            agent: self.id,
            amount,
            stealth,
            remaining: self.health,
        });

        if self.health <= 0.0 {
            self.die(ctx, spawner, position.unwrap_or(self.behavior.original_position));
            DamageOutcome::Killed { amount, stealth }
        } else {
            DamageOutcome::Damaged { amount, stealth }
        }
    }

    fn die<M: MovementBackend, W: SenseWorld, D: DropSpawner>(
        &mut self,
        ctx: &mut TickContext<'_, M, W>,
        spawner: &mut D,
        position: Vec3,
    ) {
        self.life = LifeState::Dying { since: ctx.now };
        self.combat.interrupt();
        self.nav.stop(self.id, ctx.movement);
        self.moving = false;
        ctx.movement.set_movement_enabled(self.id, false);
        ctx.movement.set_collision_enabled(self.id, false);

        let drops = self.drop_behavior.roll(&self.drop_table, ctx.rng);
        if !drops.is_empty() {
            spawner.spawn_drops(position, &drops);
            ctx.events.publish(AgentEvent::ItemsDropped {
                agent: self.id,
                position,
                drops,
            });
        }

        info!("Agent {} ({}) died", self.id, self.name);
        ctx.events.publish(AgentEvent::Died {
            agent: self.id,
            position,
        });
    }

    fn finish_dying(&mut self, events: &EventBus) {
        self.life = LifeState::Removed;
        info!("Agent {} removed", self.id);
        events.publish(AgentEvent::Removed { agent: self.id });
    }

    /// Captures a debugging snapshot.
    #[must_use]
    pub fn snapshot<M: MovementBackend>(&self, movement: &M) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            name: self.name.clone(),
            state: self.behavior.state(),
            life: self.life,
            health: self.health,
            max_health: self.config.max_health,
            detected: self.perception.detected,
            position: movement.position(self.id),
            patrol_index: self.behavior.current_patrol_index,
            last_known_target: self.behavior.last_known_target_position,
        }
    }
}
