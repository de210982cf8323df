//! Agent tuning and archetype definitions.
//!
//! Every field has a default so partial archetype files still produce a
//! working agent.

use serde::{Deserialize, Serialize};
use warden_common::{EntityId, Vec3};

use crate::agent::Agent;
use crate::combat::AttackKind;
use crate::drops::{DropKind, DropTable};
use crate::navigation::AvoidanceConfig;
use crate::patrol::PatrolRoute;
use crate::perception::PerceptionConfig;
use crate::world::WeaponKind;

/// Tuning for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum health
    pub max_health: f32,
    /// Base movement speed
    pub base_speed: f32,
    /// Speed multiplier while chasing
    pub chase_speed_multiplier: f32,
    /// Speed multiplier while returning
    pub return_speed_multiplier: f32,
    /// Damage per attack before the attack behavior's scaling
    pub attack_damage: f32,
    /// Reach before body sizes are added
    pub attack_range: f32,
    /// Seconds between attack starts
    pub attack_cooldown: f32,
    /// Damage multiplier for hits taken while unaware
    pub stealth_damage_multiplier: f32,
    /// Seconds without detection before giving up a chase
    pub lost_target_delay: f32,
    /// Distance at which a destination counts as reached
    pub arrival_tolerance: f32,
    /// Seconds before a dead agent is removed without animation confirmation
    pub death_timeout: f32,
    /// Weapons that cannot hurt this agent
    pub immune_to: Vec<WeaponKind>,
    /// Sensing
    pub perception: PerceptionConfig,
    /// Local avoidance
    pub avoidance: AvoidanceConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            base_speed: 3.5,
            chase_speed_multiplier: 1.6,
            return_speed_multiplier: 1.0,
            attack_damage: 10.0,
            attack_range: 1.5,
            attack_cooldown: 1.5,
            stealth_damage_multiplier: 3.0,
            lost_target_delay: 3.0,
            arrival_tolerance: 0.5,
            death_timeout: 5.0,
            immune_to: Vec::new(),
            perception: PerceptionConfig::default(),
            avoidance: AvoidanceConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        self.max_health = self.max_health.max(1.0);
        self.base_speed = self.base_speed.max(0.0);
        self.chase_speed_multiplier = self.chase_speed_multiplier.max(0.0);
        self.return_speed_multiplier = self.return_speed_multiplier.max(0.0);
        self.attack_damage = self.attack_damage.max(0.0);
        self.attack_range = self.attack_range.max(0.0);
        self.attack_cooldown = self.attack_cooldown.max(0.0);
        self.stealth_damage_multiplier = self.stealth_damage_multiplier.max(1.0);
        self.lost_target_delay = self.lost_target_delay.max(0.0);
        self.arrival_tolerance = self.arrival_tolerance.max(0.05);
        self.death_timeout = self.death_timeout.max(0.0);
        self.perception.validate();
        self.avoidance.validate();
    }
}

/// Named agent template loaded from archetype files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    /// Unique name
    pub name: String,
    /// Tuning
    #[serde(default)]
    pub config: AgentConfig,
    /// Attack behavior
    #[serde(default)]
    pub attack: AttackKind,
    /// Drop behavior
    #[serde(default)]
    pub drops: DropKind,
    /// Drop table
    #[serde(default)]
    pub drop_table: DropTable,
    /// Patrol route
    #[serde(default)]
    pub route: Option<PatrolRoute>,
}

impl Archetype {
    /// Creates an archetype with default tuning.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: AgentConfig::default(),
            attack: AttackKind::default(),
            drops: DropKind::default(),
            drop_table: DropTable::default(),
            route: None,
        }
    }

    /// Sets the tuning.
    #[must_use]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the attack behavior.
    #[must_use]
    pub fn with_attack(mut self, attack: AttackKind) -> Self {
        self.attack = attack;
        self
    }

    /// Sets the drop behavior and table.
    #[must_use]
    pub fn with_drops(mut self, drops: DropKind, table: DropTable) -> Self {
        self.drops = drops;
        self.drop_table = table;
        self
    }

    /// Sets the patrol route.
    #[must_use]
    pub fn with_route(mut self, route: PatrolRoute) -> Self {
        self.route = Some(route);
        self
    }

    /// Builds an agent from this template.
    #[must_use]
    pub fn spawn(&self, id: EntityId, position: Vec3) -> Agent {
        Agent::from_archetype(id, self, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_clamps() {
        let mut config = AgentConfig {
            max_health: -5.0,
            stealth_damage_multiplier: 0.5,
            arrival_tolerance: 0.0,
            ..AgentConfig::default()
        };
        config.perception.vision_angle = 720.0;
        config.validate();
        assert_eq!(config.max_health, 1.0);
        assert_eq!(config.stealth_damage_multiplier, 1.0);
        assert_eq!(config.arrival_tolerance, 0.05);
        assert_eq!(config.perception.vision_angle, 360.0);
    }

    #[test]
    fn test_partial_archetype_uses_defaults() {
        let archetype: Archetype = toml::from_str(
            r#"
            name = "grunt"
            [config]
            max_health = 40.0
            [config.perception]
            detection_range = 12.0
            "#,
        )
        .expect("valid archetype");
        assert_eq!(archetype.name, "grunt");
        assert_eq!(archetype.config.max_health, 40.0);
        assert_eq!(archetype.config.base_speed, 3.5);
        assert_eq!(archetype.config.perception.detection_range, 12.0);
        assert_eq!(archetype.config.perception.memory_duration, 5.0);
        assert_eq!(archetype.attack, AttackKind::Melee);
        assert!(archetype.route.is_none());
    }

    #[test]
    fn test_spawn_builds_agent() {
        let archetype = Archetype::new("sentry");
        let id = EntityId::new();
        let agent = archetype.spawn(id, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(agent.id(), id);
        assert_eq!(agent.name(), "sentry");
        assert_eq!(agent.health(), 100.0);
    }
}
