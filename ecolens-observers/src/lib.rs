//! ecolens Observers
//!
//! The two mutation-driven state machines at the heart of the engine:
//! - `HomeCaptureObserver` intercepts the search activation on a home page
//!   and persists the destination across the coming navigation
//! - `ResultsOverlayObserver` reacts to result content arriving, fetches
//!   enrichment data, and drives the overlay and tooltip lifecycle
//!
//! Per-site variance is a strategy table carried in the site profile, not a
//! class hierarchy. All failure modes degrade to "no overlay shown"; nothing
//! escalates into the host page.

pub mod config;
pub mod home;
pub mod results;

pub use config::*;
pub use home::*;
pub use results::*;
