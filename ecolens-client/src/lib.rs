//! ecolens Client Layer
//!
//! External collaborators at their interface boundary:
//! - The enrichment backend (persist search events, fetch destination records)
//! - The key-value intent store carrying the captured destination across a
//!   page navigation

pub mod http;
pub mod store;

pub use http::*;
pub use store::*;
