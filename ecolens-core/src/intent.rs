//! Captured search intent
//!
//! The destination text captured on a home page, carried across the page
//! navigation to the results page via the key-value store.

use crate::{SiteId, DESTINATION_KEY};

/// A destination captured from a home-page search activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedIntent {
    pub site: SiteId,
    pub destination: String,
}

impl CapturedIntent {
    pub fn new(site: SiteId, destination: impl Into<String>) -> Self {
        Self {
            site,
            destination: destination.into(),
        }
    }

    /// The store key this intent is written under
    pub fn key(&self) -> String {
        intent_key(self.site)
    }
}

/// Namespaced store key for a site's captured destination
pub fn intent_key(site: SiteId) -> String {
    format!("{}:{}", site.as_str(), DESTINATION_KEY)
}
