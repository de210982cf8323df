//! Attack timing for adversary agents.
//!
//! Attacks run in two phases:
//! - `begin` checks the cooldown, records the attack start and hands out an
//!   [`AttackToken`]
//! - `resolve` is driven by the host's animation timeline and is the only
//!   place damage can be dealt; it accepts each token at most once
//!
//! Tokens from interrupted or superseded attacks are stale and ignored.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::world::WeaponKind;

/// Handle for an in-flight attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttackToken(u64);

impl AttackToken {
    /// Creates a token from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw token value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Cooldown gate and pending-attack bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatTiming {
    /// Seconds between attack starts
    cooldown: f32,
    /// Start time of the last attack
    last_attack_start: Option<f32>,
    /// Token awaiting resolution
    pending: Option<AttackToken>,
    /// Whether the attack animation is still playing; holds the agent in place
    swinging: bool,
    /// Next token value
    next_token: u64,
}

impl CombatTiming {
    /// Creates a controller with the given cooldown.
    #[must_use]
    pub const fn new(cooldown: f32) -> Self {
        Self {
            cooldown,
            last_attack_start: None,
            pending: None,
            swinging: false,
            next_token: 1,
        }
    }

    /// Cooldown in seconds.
    #[must_use]
    pub const fn cooldown(&self) -> f32 {
        self.cooldown
    }

    /// Start time of the last attack.
    #[must_use]
    pub const fn last_attack_start(&self) -> Option<f32> {
        self.last_attack_start
    }

    /// Token currently awaiting resolution.
    #[must_use]
    pub const fn pending(&self) -> Option<AttackToken> {
        self.pending
    }

    /// Returns whether an attack animation is running.
    #[must_use]
    pub const fn is_swinging(&self) -> bool {
        self.swinging
    }

    /// Returns whether a new attack may start at `now`.
    #[must_use]
    pub fn can_attack(&self, now: f32) -> bool {
        self.last_attack_start
            .map_or(true, |start| now - start >= self.cooldown)
    }

    /// Starts an attack if the cooldown allows it.
    ///
    /// Returns the token the host passes back when the damage frame plays.
    pub fn begin(&mut self, now: f32) -> Option<AttackToken> {
        if !self.can_attack(now) {
            return None;
        }
        let token = AttackToken(self.next_token);
        self.next_token += 1;
        self.last_attack_start = Some(now);
        self.pending = Some(token);
        self.swinging = true;
        Some(token)
    }

    /// Consumes a pending token. Returns false for stale or repeated tokens.
    pub fn resolve(&mut self, token: AttackToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            trace!("Ignoring stale attack token {}", token.raw());
            false
        }
    }

    /// Marks the attack animation as finished.
    pub fn end(&mut self) {
        self.swinging = false;
    }

    /// Cancels any in-flight attack. Its token becomes stale.
    pub fn interrupt(&mut self) {
        self.pending = None;
        self.swinging = false;
    }
}

/// How an archetype's attack deals damage.
pub trait AttackBehavior: Send + Sync + std::fmt::Debug {
    /// Weapon category reported to the damage receiver.
    fn weapon_kind(&self) -> WeaponKind;
    /// Damage dealt for a configured base damage.
    fn damage(&self, base: f32) -> f32;
}

/// Plain melee swing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeleeAttack;

impl AttackBehavior for MeleeAttack {
    fn weapon_kind(&self) -> WeaponKind {
        WeaponKind::Unarmed
    }

    fn damage(&self, base: f32) -> f32 {
        base
    }
}

/// Slow weapon hit with a damage multiplier.
#[derive(Debug, Clone, Copy)]
pub struct HeavyAttack {
    /// Damage multiplier
    pub scale: f32,
    /// Weapon used
    pub weapon: WeaponKind,
}

impl Default for HeavyAttack {
    fn default() -> Self {
        Self {
            scale: 1.5,
            weapon: WeaponKind::Blunt,
        }
    }
}

impl AttackBehavior for HeavyAttack {
    fn weapon_kind(&self) -> WeaponKind {
        self.weapon
    }

    fn damage(&self, base: f32) -> f32 {
        base * self.scale
    }
}

/// Attack behavior selector used by archetype files.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttackKind {
    /// [`MeleeAttack`]
    #[default]
    Melee,
    /// [`HeavyAttack`]
    Heavy {
        /// Damage multiplier
        #[serde(default = "default_heavy_scale")]
        scale: f32,
        /// Weapon used
        #[serde(default = "default_heavy_weapon")]
        weapon: WeaponKind,
    },
}

fn default_heavy_scale() -> f32 {
    1.5
}

fn default_heavy_weapon() -> WeaponKind {
    WeaponKind::Blunt
}

impl AttackKind {
    /// Builds the behavior.
    #[must_use]
    pub fn build(self) -> Box<dyn AttackBehavior> {
        match self {
            Self::Melee => Box::new(MeleeAttack),
            Self::Heavy { scale, weapon } => Box::new(HeavyAttack { scale, weapon }),
        }
    }
}
