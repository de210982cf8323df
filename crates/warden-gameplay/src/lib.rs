//! # Warden Gameplay
//!
//! Adversary perception and behavior for Warden.
//!
//! This crate provides:
//! - Patrol routes (loop and ping-pong traversal)
//! - Perception (range, motion noise, vision cone, stealth rolls, memory)
//! - Navigation with local obstacle avoidance and recovery
//! - The Patrol / Chase / Return behavior state machine
//! - Two-phase attack timing and archetype attack behaviors
//! - Death drops
//! - The director: agent registry, tick orchestration and alert fan-out
//! - Event bus for host notifications
//! - Collaborator traits and mocks for the host engine

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod agent;
pub mod alert;
pub mod behavior;
pub mod combat;
pub mod config;
pub mod director;
pub mod drops;
pub mod events;
pub mod navigation;
pub mod patrol;
pub mod perception;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::alert::*;
    pub use crate::behavior::*;
    pub use crate::combat::*;
    pub use crate::config::*;
    pub use crate::director::*;
    pub use crate::drops::*;
    pub use crate::events::*;
    pub use crate::navigation::*;
    pub use crate::patrol::*;
    pub use crate::perception::*;
    pub use crate::world::*;
}

pub use prelude::*;
