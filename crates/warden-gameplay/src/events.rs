//! Event bus carrying agent notifications to the host.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use warden_common::{EntityId, Vec3};

use crate::behavior::BehaviorState;
use crate::combat::AttackToken;
use crate::drops::ItemDrop;
use crate::world::WeaponKind;

/// Notifications published by agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Behavior state changed
    StateChanged {
        /// Agent
        agent: EntityId,
        /// Previous state
        from: BehaviorState,
        /// New state
        to: BehaviorState,
    },
    /// Attack animation should start
    AttackStarted {
        /// Agent
        agent: EntityId,
        /// Token to pass back on the damage frame
        token: AttackToken,
    },
    /// Agent hit its target
    DamageDealt {
        /// Agent
        agent: EntityId,
        /// Target hit
        target: EntityId,
        /// Damage applied
        amount: f32,
        /// Weapon used
        weapon: WeaponKind,
    },
    /// Agent was hit
    DamageTaken {
        /// Agent
        agent: EntityId,
        /// Damage applied after multipliers
        amount: f32,
        /// Whether the hit landed unnoticed
        stealth: bool,
        /// Health left
        remaining: f32,
    },
    /// Agent was alerted by a nearby hit
    Alerted {
        /// Agent
        agent: EntityId,
        /// Where the alert came from
        origin: Vec3,
    },
    /// Footstep sound should play
    Footstep {
        /// Agent
        agent: EntityId,
        /// Agent position
        position: Vec3,
    },
    /// Death drops were spawned
    ItemsDropped {
        /// Agent
        agent: EntityId,
        /// Spawn position
        position: Vec3,
        /// Rolled drops
        drops: Vec<ItemDrop>,
    },
    /// Agent died and started its death sequence
    Died {
        /// Agent
        agent: EntityId,
        /// Where it died
        position: Vec3,
    },
    /// Agent finished its death sequence and left the simulation
    Removed {
        /// Agent
        agent: EntityId,
    },
}

impl AgentEvent {
    /// Agent the event concerns.
    #[must_use]
    pub const fn agent(&self) -> EntityId {
        match self {
            Self::StateChanged { agent, .. }
            | Self::AttackStarted { agent, .. }
            | Self::DamageDealt { agent, .. }
            | Self::DamageTaken { agent, .. }
            | Self::Alerted { agent, .. }
            | Self::Footstep { agent, .. }
            | Self::ItemsDropped { agent, .. }
            | Self::Died { agent, .. }
            | Self::Removed { agent } => *agent,
        }
    }
}

/// Bounded event queue drained by the host once per frame.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<AgentEvent>,
    receiver: Receiver<AgentEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undrained events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Dropped when the bus is full.
    pub fn publish(&self, event: AgentEvent) {
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events in publish order.
    pub fn drain(&self) -> Vec<AgentEvent> {
        self.receiver.try_iter().collect()
    }

    /// Number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a sender handle for publishing from elsewhere.
    #[must_use]
    pub fn sender(&self) -> Sender<AgentEvent> {
        self.sender.clone()
    }
}
