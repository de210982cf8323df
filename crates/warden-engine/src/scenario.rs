//! Scripted scenarios played against the director.
//!
//! The runner stands in for a host engine: it moves a scripted player,
//! lands the player's strikes, plays back attack and death animations on a
//! timer and feeds footstep frames, all through the director's callbacks.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, trace, warn};
use warden_common::{distance, lerp, EntityId, Vec3, WardenError, WardenResult};
use warden_gameplay::{
    AgentEvent, AttackToken, DamageOutcome, Director, DirectorError, Hit, TrackedTarget, WeaponKind,
};

use crate::archetype_loader::ArchetypeRegistry;
use crate::arena::{ArenaLayout, ArenaMovement, ArenaSenses, DropLedger, Player, Wall};
use crate::config::{EngineConfig, ScenarioKind};
use crate::timing::TickTimer;

/// Delay from attack start to the damage frame.
pub const DAMAGE_FRAME_DELAY: f32 = 0.4;
/// Length of an attack animation.
pub const ATTACK_ANIMATION_LENGTH: f32 = 0.8;
/// Length of a death animation.
pub const DEATH_ANIMATION_LENGTH: f32 = 2.0;
/// Seconds between footstep frames.
pub const FOOTSTEP_INTERVAL: f32 = 0.5;
/// Default reach of a player strike.
pub const DEFAULT_STRIKE_REACH: f32 = 2.5;

/// Player pose at a point in time. The pose between two keyframes is
/// interpolated; stance flags come from the earlier one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    /// Time in seconds
    pub at: f32,
    /// Position
    pub position: Vec3,
    /// Crouch flag
    pub crouching: bool,
    /// Sprint flag
    pub running: bool,
}

impl Keyframe {
    /// Upright, walking pace.
    #[must_use]
    pub const fn walk(at: f32, position: Vec3) -> Self {
        Self {
            at,
            position,
            crouching: false,
            running: false,
        }
    }

    /// Crouched.
    #[must_use]
    pub const fn crouch(at: f32, position: Vec3) -> Self {
        Self {
            at,
            position,
            crouching: true,
            running: false,
        }
    }

    /// Sprinting.
    #[must_use]
    pub const fn run(at: f32, position: Vec3) -> Self {
        Self {
            at,
            position,
            crouching: false,
            running: true,
        }
    }
}

/// A player attack on the nearest living agent within reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    /// Time in seconds
    pub at: f32,
    /// Base damage
    pub damage: f32,
    /// Weapon used
    pub weapon: WeaponKind,
    /// How far the strike reaches
    pub reach: f32,
}

impl Strike {
    /// Creates a strike with the default reach.
    #[must_use]
    pub const fn new(at: f32, damage: f32, weapon: WeaponKind) -> Self {
        Self {
            at,
            damage,
            weapon,
            reach: DEFAULT_STRIKE_REACH,
        }
    }
}

/// Player script. Keyframes and strikes are kept sorted by time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    keyframes: Vec<Keyframe>,
    strikes: Vec<Strike>,
}

impl Script {
    /// Creates a script.
    #[must_use]
    pub fn new(mut keyframes: Vec<Keyframe>, mut strikes: Vec<Strike>) -> Self {
        keyframes.sort_by(|a, b| a.at.total_cmp(&b.at));
        strikes.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { keyframes, strikes }
    }

    /// Pose at time `t`, or `None` without keyframes.
    #[must_use]
    pub fn sample(&self, t: f32) -> Option<Keyframe> {
        let first = self.keyframes.first()?;
        if t <= first.at {
            return Some(Keyframe { at: t, ..*first });
        }
        for pair in self.keyframes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t < b.at {
                let span = (b.at - a.at).max(f32::EPSILON);
                let s = (t - a.at) / span;
                let position = Vec3::new(
                    lerp(a.position.x, b.position.x, s),
                    lerp(a.position.y, b.position.y, s),
                    lerp(a.position.z, b.position.z, s),
                );
                return Some(Keyframe { at: t, position, ..a });
            }
        }
        self.keyframes.last().map(|last| Keyframe { at: t, ..*last })
    }

    /// Strikes in time order.
    #[must_use]
    pub fn strikes(&self) -> &[Strike] {
        &self.strikes
    }
}

/// An agent placed at scenario start.
#[derive(Debug, Clone, PartialEq)]
pub struct Spawn {
    /// Archetype name
    pub archetype: String,
    /// Spawn position
    pub position: Vec3,
}

impl Spawn {
    /// Creates a spawn.
    #[must_use]
    pub fn new(archetype: impl Into<String>, position: Vec3) -> Self {
        Self {
            archetype: archetype.into(),
            position,
        }
    }
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Display name
    pub name: String,
    /// Arena geometry
    pub layout: ArenaLayout,
    /// Where the player starts
    pub player_start: Vec3,
    /// Agents placed at start
    pub spawns: Vec<Spawn>,
    /// Player script
    pub script: Script,
}

impl Scenario {
    /// Built-in scenario for a kind.
    #[must_use]
    pub fn for_kind(kind: ScenarioKind) -> Self {
        match kind {
            ScenarioKind::Ambush => Self::ambush(),
            ScenarioKind::Patrol => Self::patrol(),
        }
    }

    /// The player sneaks up behind a brute, strikes it unaware and fights it
    /// out while the alerted sentry closes in. The player then runs for it.
    #[must_use]
    pub fn ambush() -> Self {
        let layout = ArenaLayout::new(30.0).with_wall(Wall::new([-12.0, 10.0], [12.0, 11.0]));
        let behind_brute = Vec3::new(6.0, 0.0, -1.3);
        let script = Script::new(
            vec![
                Keyframe::crouch(0.0, Vec3::new(6.0, 0.0, -10.0)),
                Keyframe::crouch(6.0, behind_brute),
                Keyframe::walk(6.4, behind_brute),
                Keyframe::walk(9.0, behind_brute),
                Keyframe::run(14.0, Vec3::new(-20.0, 0.0, -25.0)),
            ],
            vec![
                Strike::new(6.5, 30.0, WeaponKind::Blade),
                Strike::new(7.3, 30.0, WeaponKind::Blade),
                Strike::new(8.1, 30.0, WeaponKind::Blade),
                Strike::new(8.9, 30.0, WeaponKind::Blade),
            ],
        );
        Self {
            name: "ambush".to_string(),
            layout,
            player_start: Vec3::new(6.0, 0.0, -10.0),
            spawns: vec![
                Spawn::new("brute", Vec3::new(6.0, 0.0, 0.0)),
                Spawn::new("sentry", Vec3::new(0.0, 0.0, -8.0)),
            ],
            script,
        }
    }

    /// The player walks the far side of a pillar, out of the sentry's reach.
    #[must_use]
    pub fn patrol() -> Self {
        let layout = ArenaLayout::new(30.0).with_wall(Wall::new([4.0, -2.0], [6.0, 2.0]));
        let script = Script::new(
            vec![
                Keyframe::walk(0.0, Vec3::new(14.0, 0.0, -20.0)),
                Keyframe::walk(15.0, Vec3::new(14.0, 0.0, 20.0)),
                Keyframe::walk(30.0, Vec3::new(14.0, 0.0, -20.0)),
            ],
            Vec::new(),
        );
        Self {
            name: "patrol".to_string(),
            layout,
            player_start: Vec3::new(14.0, 0.0, -20.0),
            spawns: vec![Spawn::new("sentry", Vec3::new(0.0, 0.0, -8.0))],
            script,
        }
    }
}

/// An event stamped with the simulation time it was drained at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedEvent {
    /// Simulation time in seconds
    pub time: f32,
    /// The event
    pub event: AgentEvent,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Scenario name
    pub scenario: String,
    /// Ticks simulated
    pub ticks: u64,
    /// Simulated seconds
    pub sim_time: f32,
    /// Agents spawned
    pub spawned: usize,
    /// Agents that finished dying
    pub removed: usize,
    /// Attacks agents started
    pub attacks_started: usize,
    /// Attacks that damaged the player
    pub hits_landed: usize,
    /// Player strikes that damaged an agent
    pub strikes_landed: usize,
    /// Player health at the end
    pub player_health: f32,
    /// Agents still alive at the end
    pub agents_alive: usize,
    /// Items dropped
    pub items_dropped: u32,
    /// Events recorded
    pub events: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Animation {
    DamageFrame(AttackToken),
    AttackEnd,
    DeathComplete,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Followup {
    at: f32,
    agent: EntityId,
    animation: Animation,
}

fn director_error(err: DirectorError) -> WardenError {
    match err {
        DirectorError::NotFound(id) => WardenError::UnknownAgent(id),
        DirectorError::AlreadyRegistered(_) => WardenError::Config(err.to_string()),
    }
}

/// Plays one scenario.
#[derive(Debug)]
pub struct Runner {
    name: String,
    max_ticks: u32,
    realtime: bool,
    timer: TickTimer,
    director: Director,
    movement: ArenaMovement,
    senses: ArenaSenses,
    drops: DropLedger,
    player: Player,
    script: Script,
    next_strike: usize,
    next_footstep: f32,
    followups: Vec<Followup>,
    log: Vec<TimedEvent>,
    summary: RunSummary,
}

impl Runner {
    /// Builds the arena and spawns the scenario's agents.
    ///
    /// Fails if a spawn names an archetype the registry does not have.
    pub fn new(config: &EngineConfig, scenario: Scenario, archetypes: &ArchetypeRegistry) -> WardenResult<Self> {
        let mut movement = ArenaMovement::new(scenario.layout.clone());
        let mut director = Director::new(config.seed)
            .with_alert_radius(config.alert_radius)
            .with_event_capacity(config.event_capacity);

        for spawn in &scenario.spawns {
            let archetype = archetypes
                .get(&spawn.archetype)
                .ok_or_else(|| WardenError::Archetype(format!("Unknown archetype: {}", spawn.archetype)))?;
            let id = EntityId::new();
            movement.add_body(id, spawn.position, Vec3::Z);
            director
                .register(archetype.spawn(id, spawn.position), &mut movement)
                .map_err(director_error)?;
            info!("Spawned {} {} at {:?}", archetype.name, id, spawn.position);
        }

        let summary = RunSummary {
            scenario: scenario.name.clone(),
            spawned: scenario.spawns.len(),
            ..RunSummary::default()
        };

        Ok(Self {
            name: scenario.name,
            max_ticks: config.max_ticks,
            realtime: config.realtime,
            timer: TickTimer::new(config.tick_rate),
            director,
            senses: ArenaSenses::new(scenario.layout),
            movement,
            drops: DropLedger::new(),
            player: Player::new(scenario.player_start),
            script: scenario.script,
            next_strike: 0,
            next_footstep: 0.0,
            followups: Vec::new(),
            log: Vec::new(),
            summary,
        })
    }

    /// The director being driven.
    #[must_use]
    pub const fn director(&self) -> &Director {
        &self.director
    }

    /// The scripted player.
    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }

    /// Drops spawned so far.
    #[must_use]
    pub const fn drops(&self) -> &DropLedger {
        &self.drops
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[TimedEvent] {
        &self.log
    }

    /// Returns whether the run is over: out of ticks, or every agent gone.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.timer.ticks() >= u64::from(self.max_ticks) || (self.director.is_empty() && self.followups.is_empty())
    }

    /// Runs to completion.
    pub fn run(&mut self) -> RunSummary {
        info!("Running scenario {}", self.name);
        while !self.is_finished() {
            if self.realtime {
                let dt = self.timer.frame_delta();
                let due = self.timer.accumulate(dt);
                for _ in 0..due {
                    if self.is_finished() {
                        break;
                    }
                    self.step();
                }
                self.timer.sleep_remainder();
            } else {
                self.step();
            }
        }
        self.summary()
    }

    /// Totals so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.timer.ticks(),
            sim_time: self.timer.sim_time(),
            player_health: self.player.health,
            agents_alive: self.director.iter().filter(|(_, agent)| agent.is_alive()).count(),
            items_dropped: self.drops.item_count(),
            events: self.log.len(),
            ..self.summary.clone()
        }
    }

    /// Advances the simulation by one fixed step.
    pub fn step(&mut self) {
        let now = self.timer.sim_time();
        let dt = self.timer.fixed_dt();

        if let Some(pose) = self.script.sample(now) {
            self.player.move_to(pose.position, pose.crouching, pose.running);
        }
        self.land_strikes(now);

        let player = self.player.is_alive().then_some(&self.player);
        self.senses.refresh(&self.movement, player);
        let target = player.map(TrackedTarget::snapshot);
        let report = self.director.tick(&mut self.movement, &self.senses, target.as_ref(), now);
        self.summary.attacks_started += report.attacks.len();
        for (agent, token) in report.attacks {
            self.schedule(now + DAMAGE_FRAME_DELAY, agent, Animation::DamageFrame(token));
            self.schedule(now + ATTACK_ANIMATION_LENGTH, agent, Animation::AttackEnd);
        }
        for agent in report.removed {
            self.retire(agent);
        }

        self.drain_events(now);
        self.play_animations(now);
        self.play_footsteps(now);
        self.drain_events(now);

        self.movement.step(dt);
        self.timer.advance();
    }

    fn land_strikes(&mut self, now: f32) {
        while let Some(strike) = self.script.strikes().get(self.next_strike).copied() {
            if strike.at > now {
                break;
            }
            self.next_strike += 1;
            if !self.player.is_alive() {
                continue;
            }

            let Some(victim) = self.nearest_agent(strike.reach) else {
                debug!("Strike at {:.2} found nobody in reach", strike.at);
                continue;
            };
            let hit = Hit::new(strike.damage, strike.weapon).with_origin(self.player.position);
            match self
                .director
                .damage_agent(victim, &hit, &mut self.movement, &self.senses, &mut self.drops, now)
            {
                Ok(DamageOutcome::Ignored) => debug!("Strike on {} had no effect", victim),
                Ok(DamageOutcome::Damaged { amount, stealth }) => self.strike_landed(victim, amount, stealth),
                Ok(DamageOutcome::Killed { amount, stealth }) => {
                    self.strike_landed(victim, amount, stealth);
                    self.schedule(now + DEATH_ANIMATION_LENGTH, victim, Animation::DeathComplete);
                },
                Err(e) => warn!("Strike failed: {}", e),
            }
        }
    }

    fn strike_landed(&mut self, victim: EntityId, amount: f32, stealth: bool) {
        self.summary.strikes_landed += 1;
        info!(
            "Player strikes {} for {:.0}{}",
            victim,
            amount,
            if stealth { " (stealth)" } else { "" }
        );
    }

    fn nearest_agent(&self, reach: f32) -> Option<EntityId> {
        let origin = self.player.position;
        self.director
            .get_in_range(origin, reach, &self.movement)
            .into_iter()
            .filter_map(|id| self.movement.body(id).map(|b| (id, distance(b.position, origin))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    fn schedule(&mut self, at: f32, agent: EntityId, animation: Animation) {
        self.followups.push(Followup { at, agent, animation });
    }

    /// Clears the body of an agent that left the director.
    fn retire(&mut self, agent: EntityId) {
        if self.movement.remove_body(agent) {
            self.summary.removed += 1;
            debug!("{} removed", agent);
        }
    }

    fn play_animations(&mut self, now: f32) {
        let (due, pending): (Vec<_>, Vec<_>) = self.followups.drain(..).partition(|f| f.at <= now);
        self.followups = pending;

        for followup in due {
            let agent = followup.agent;
            let result = match followup.animation {
                Animation::DamageFrame(token) => {
                    let target = if self.player.is_alive() {
                        Some(&mut self.player)
                    } else {
                        None
                    };
                    self.director
                        .execute_attack_damage(agent, token, target, &self.movement, now)
                        .map(|hit| {
                            if hit {
                                self.summary.hits_landed += 1;
                                if !self.player.is_alive() {
                                    info!("Player down");
                                }
                            }
                        })
                },
                Animation::AttackEnd => self.director.on_attack_animation_end(agent),
                Animation::DeathComplete => self.director.on_death_animation_complete(agent).map(|()| {
                    if self.director.get(agent).is_none() {
                        self.retire(agent);
                    }
                }),
            };
            if let Err(e) = result.map_err(director_error) {
                // Agents can leave before their animations finish
                debug!("Skipped {:?}: {}", followup.animation, e);
            }
        }
    }

    fn play_footsteps(&mut self, now: f32) {
        if now < self.next_footstep {
            return;
        }
        self.next_footstep = now + FOOTSTEP_INTERVAL;

        let walkers: Vec<EntityId> = self
            .director
            .iter()
            .filter(|(_, agent)| agent.is_moving())
            .map(|(id, _)| id)
            .collect();
        for id in walkers {
            if let Err(e) = self.director.play_footstep(id, &self.movement) {
                debug!("Footstep for {} skipped: {}", id, e);
            }
        }
    }

    fn drain_events(&mut self, now: f32) {
        for event in self.director.drain_events() {
            match &event {
                AgentEvent::StateChanged { agent, from, to } => info!("{} {} -> {}", agent, from, to),
                AgentEvent::AttackStarted { agent, token } => debug!("{} winds up attack {}", agent, token.raw()),
                AgentEvent::DamageDealt { agent, amount, .. } => info!("{} hits the player for {:.0}", agent, amount),
                AgentEvent::DamageTaken { agent, remaining, .. } => debug!("{} has {:.0} health left", agent, remaining),
                AgentEvent::Alerted { agent, origin } => debug!("{} alerted from {:?}", agent, origin),
                AgentEvent::Footstep { agent, .. } => trace!("{} footstep", agent),
                AgentEvent::ItemsDropped { agent, drops, .. } => debug!("{} dropped {} stacks", agent, drops.len()),
                AgentEvent::Died { agent, .. } => info!("{} died", agent),
                AgentEvent::Removed { agent } => trace!("{} left the director", agent),
            }
            self.log.push(TimedEvent { time: now, event });
        }
    }
}

/// Writes recorded events as pretty JSON.
pub fn write_event_dump(path: &Path, events: &[TimedEvent]) -> WardenResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(events).map_err(io::Error::from)?;
    fs::write(path, json)?;
    info!("Wrote {} events to {}", events.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use warden_common::ItemTypeId;
    use warden_gameplay::{AgentConfig, Archetype, DropEntry, DropKind, DropTable};

    fn quick_config() -> EngineConfig {
        EngineConfig {
            max_ticks: 300,
            ..EngineConfig::default()
        }
    }

    fn registry_with(archetype: Archetype) -> ArchetypeRegistry {
        let mut registry = ArchetypeRegistry::new();
        registry.register(archetype).expect("fresh registry");
        registry
    }

    fn duel(script: Script) -> Scenario {
        Scenario {
            name: "duel".to_string(),
            layout: ArenaLayout::new(20.0),
            player_start: script.sample(0.0).map_or(Vec3::ZERO, |k| k.position),
            spawns: vec![Spawn::new("guard", Vec3::ZERO)],
            script,
        }
    }

    #[test]
    fn test_script_sampling() {
        let script = Script::new(
            vec![
                Keyframe::walk(2.0, Vec3::new(4.0, 0.0, 0.0)),
                Keyframe::crouch(0.0, Vec3::ZERO),
            ],
            Vec::new(),
        );
        let start = script.sample(-1.0).expect("keyframes");
        assert_eq!(start.position, Vec3::ZERO);
        assert!(start.crouching);

        let mid = script.sample(1.0).expect("keyframes");
        assert!((mid.position.x - 2.0).abs() < 1e-5);
        assert!(mid.crouching);

        let end = script.sample(5.0).expect("keyframes");
        assert_eq!(end.position, Vec3::new(4.0, 0.0, 0.0));
        assert!(!end.crouching);

        assert!(Script::default().sample(1.0).is_none());
    }

    #[test]
    fn test_unknown_archetype_rejected() {
        let result = Runner::new(&quick_config(), Scenario::patrol(), &ArchetypeRegistry::new());
        assert!(matches!(result, Err(WardenError::Archetype(_))));
    }

    #[test]
    fn test_guard_hits_player_in_front() {
        let script = Script::new(
            vec![
                Keyframe::walk(0.0, Vec3::new(0.0, 0.0, 4.0)),
                Keyframe::walk(20.0, Vec3::new(0.5, 0.0, 4.0)),
            ],
            Vec::new(),
        );
        let registry = registry_with(Archetype::new("guard"));
        let mut runner = Runner::new(&EngineConfig { max_ticks: 90, ..quick_config() }, duel(script), &registry)
            .expect("guard archetype exists");

        let summary = runner.run();
        assert_eq!(summary.ticks, 90);
        assert!(summary.attacks_started >= 1);
        assert!(summary.hits_landed >= 1);
        assert!(runner.player().health < 100.0);
        assert!(runner
            .events()
            .iter()
            .any(|e| matches!(e.event, AgentEvent::DamageDealt { .. })));
    }

    #[test]
    fn test_stealth_kill_drops_and_removes() {
        let guard = Archetype::new("guard")
            .with_config(AgentConfig {
                max_health: 30.0,
                ..AgentConfig::default()
            })
            .with_drops(
                DropKind::Guaranteed,
                DropTable::default().with_entry(DropEntry::new(ItemTypeId::new(3))),
            );
        let script = Script::new(
            vec![Keyframe::crouch(0.0, Vec3::new(0.0, 0.0, -1.5))],
            vec![Strike::new(0.5, 20.0, WeaponKind::Blade)],
        );
        let mut runner =
            Runner::new(&quick_config(), duel(script), &registry_with(guard)).expect("guard archetype exists");

        let summary = runner.run();
        assert_eq!(summary.strikes_landed, 1);
        assert_eq!(summary.items_dropped, 1);
        assert_eq!(summary.agents_alive, 0);
        assert!(runner.director().is_empty());
        assert!(summary.ticks < 300, "run ends once the agent is gone");

        let kinds: Vec<&AgentEvent> = runner.events().iter().map(|e| &e.event).collect();
        let dropped = kinds
            .iter()
            .position(|e| matches!(e, AgentEvent::ItemsDropped { .. }))
            .expect("drops rolled");
        let died = kinds
            .iter()
            .position(|e| matches!(e, AgentEvent::Died { .. }))
            .expect("died");
        assert!(dropped < died);
        assert!(matches!(kinds.last(), Some(AgentEvent::Removed { .. })));
        assert!(kinds
            .iter()
            .any(|e| matches!(e, AgentEvent::DamageTaken { stealth: true, amount, .. } if *amount == 60.0)));
    }

    #[test]
    fn test_followups_survive_dropped_events() {
        // A zero-capacity bus drops every event
        let config = EngineConfig {
            max_ticks: 90,
            event_capacity: 0,
            ..quick_config()
        };
        let script = Script::new(
            vec![
                Keyframe::walk(0.0, Vec3::new(0.0, 0.0, 4.0)),
                Keyframe::walk(20.0, Vec3::new(0.5, 0.0, 4.0)),
            ],
            Vec::new(),
        );
        let mut runner =
            Runner::new(&config, duel(script), &registry_with(Archetype::new("guard"))).expect("guard archetype exists");
        let summary = runner.run();
        assert!(runner.events().is_empty());
        assert!(summary.hits_landed >= 1);
        assert!(runner.player().health < 100.0);

        let guard = Archetype::new("guard").with_config(AgentConfig {
            max_health: 30.0,
            ..AgentConfig::default()
        });
        let script = Script::new(
            vec![Keyframe::crouch(0.0, Vec3::new(0.0, 0.0, -1.5))],
            vec![Strike::new(0.5, 20.0, WeaponKind::Blade)],
        );
        let config = EngineConfig {
            event_capacity: 0,
            ..quick_config()
        };
        let mut runner = Runner::new(&config, duel(script), &registry_with(guard)).expect("guard archetype exists");
        let summary = runner.run();
        assert!(runner.director().is_empty());
        assert_eq!(summary.removed, 1);
        assert!(
            summary.sim_time < 0.5 + AgentConfig::default().death_timeout,
            "death animation completes removal before the timeout"
        );
    }

    #[test]
    fn test_patrol_scenario_stays_quiet() {
        let mut runner = Runner::new(
            &quick_config(),
            Scenario::patrol(),
            &ArchetypeRegistry::with_builtin(),
        )
        .expect("builtin archetypes");
        let summary = runner.run();
        assert_eq!(summary.attacks_started, 0);
        assert_eq!(summary.player_health, 100.0);
        assert_eq!(summary.agents_alive, 1);
    }

    #[test]
    fn test_event_dump() {
        let mut runner = Runner::new(
            &EngineConfig { max_ticks: 60, ..quick_config() },
            Scenario::ambush(),
            &ArchetypeRegistry::with_builtin(),
        )
        .expect("builtin archetypes");
        runner.run();

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("out").join("events.json");
        write_event_dump(&path, runner.events()).expect("dump written");

        let text = fs::read_to_string(&path).expect("dump readable");
        let parsed: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");
        assert_eq!(parsed.as_array().map(Vec::len), Some(runner.events().len()));
    }
}
