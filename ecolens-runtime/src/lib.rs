//! ecolens Runtime
//!
//! Entry glue around the observer engine:
//! - `BootstrapRouter` resolves host + path to a site profile and observer
//!   variant, deferring observation until the document is ready
//! - `Session` wires page, store, and backend client together for the CLI
//!   demo and end-to-end tests
//! - Fixture markup for the two supported sites

pub mod fixtures;
pub mod router;
pub mod session;

pub use router::*;
pub use session::*;
