//! Shared observer configuration

use ecolens_core::{SiteId, SiteProfile};
use ecolens_page::SelectorError;
use thiserror::Error;

/// Errors from observer construction
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("profile selector rejected: {0}")]
    Selector(#[from] SelectorError),
}

/// Outcome of starting observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveStatus {
    /// The root container was found; observation is running
    Watching,
    /// The root container is absent; the observer stays idle. Some pages
    /// legitimately lack the root at load time, so this is not an error.
    RootAbsent,
}

/// Configuration common to both observer variants
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Observer instance id, for logging
    pub id: String,
    /// The site this observer is bound to
    pub site: SiteId,
    /// The site's selector profile and read strategy
    pub profile: SiteProfile,
}

impl ObserverConfig {
    pub fn new(site: SiteId, profile: SiteProfile) -> Self {
        let short = uuid::Uuid::new_v4().to_string()[..8].to_string();
        Self {
            id: format!("{}-{}", site.as_str(), short),
            site,
            profile,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecolens_core::SiteRegistry;

    #[test]
    fn test_config_ids() {
        let registry = SiteRegistry::builtin();
        let profile = registry.resolve(SiteId::Kayak).unwrap().clone();

        let config = ObserverConfig::new(SiteId::Kayak, profile.clone());
        assert!(config.id.starts_with("kayak-"));

        let named = ObserverConfig::new(SiteId::Kayak, profile).with_id("kayak-home-1");
        assert_eq!(named.id, "kayak-home-1");
    }
}
