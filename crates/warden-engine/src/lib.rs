//! Warden Engine - headless host for the Warden adversary engine.
//!
//! Loads runner configuration and archetype data, builds a walled arena and
//! drives the director through scripted scenarios.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod archetype_loader;
pub mod arena;
pub mod config;
pub mod scenario;
pub mod timing;
