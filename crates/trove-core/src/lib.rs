//! Trove Core - Foundational types for the Trove asset manager
//!
//! This crate provides the core types that all other Trove crates depend on:
//! - `Version` - Immutable semantic versions with bump rules
//! - `AssetId` - Opaque identifiers assigned at publish time
//! - Error types and Result alias

mod error;
mod id;
mod version;

pub use error::{Result, TroveError};
pub use id::{now_rfc3339, AssetId};
pub use version::{Version, VersionField};
