//! ecolens Core - Site profiles and enrichment domain model
//!
//! This crate provides the foundational primitives:
//! - Site identities and per-site selector profiles
//! - The read-only site registry with optional TOML overrides
//! - Enrichment records and the leaf-color score classification
//! - Captured search intent and its key-value namespacing

pub mod enrichment;
pub mod intent;
pub mod leaf;
pub mod sites;

pub use enrichment::*;
pub use intent::*;
pub use leaf::*;
pub use sites::*;

/// Logical key under which the captured destination is stored
pub const DESTINATION_KEY: &str = "DESTINATION";

/// Default overlay dismiss-removal delay in milliseconds
pub const DISMISS_DELAY_MS: u64 = 800;

/// Default tooltip rescan delay in milliseconds
pub const TOOLTIP_DELAY_MS: u64 = 2000;
