//! # Warden Common
//!
//! Common types and utilities shared by the Warden crates:
//! - ID types (EntityId, ItemTypeId)
//! - Geometry helpers over `glam::Vec3`
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
}

pub use prelude::*;
