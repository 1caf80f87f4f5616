//! Site identities and per-site selector profiles
//!
//! A profile parameterizes the engine over otherwise-arbitrary third-party
//! markup: where the destination input lives, where results content appears,
//! which control submits a search. Selector strings are opaque here; they are
//! compiled into matchers by the page layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from site registry lookups and configuration
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no site profile configured for '{0}'")]
    ConfigurationMissing(String),

    #[error("invalid site configuration: {0}")]
    InvalidConfig(#[from] toml::de::Error),
}

/// The supported travel-search sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteId {
    Skyscanner,
    Kayak,
}

impl SiteId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteId::Skyscanner => "skyscanner",
            SiteId::Kayak => "kayak",
        }
    }

    /// Map a hostname to a site identity, if recognized
    pub fn from_host(host: &str) -> Option<SiteId> {
        match host {
            "www.skyscanner.com" => Some(SiteId::Skyscanner),
            "www.kayak.com" => Some(SiteId::Kayak),
            _ => None,
        }
    }

    /// The hostname this identity was recognized from
    pub fn host(&self) -> &'static str {
        match self {
            SiteId::Skyscanner => "www.skyscanner.com",
            SiteId::Kayak => "www.kayak.com",
        }
    }
}

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SiteId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skyscanner" => Ok(SiteId::Skyscanner),
            "kayak" => Ok(SiteId::Kayak),
            other => Err(RegistryError::ConfigurationMissing(other.to_string())),
        }
    }
}

/// How the destination value is read at capture time.
///
/// Skyscanner exposes the typed destination as a form-control value; Kayak
/// renders the selected destination as the text of a list item. Both reads are
/// valid for their markup and are dispatched by this tag, not by subclassing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStrategy {
    /// Read the `value` attribute of the destination input element
    InputValue,
    /// Read the rendered text content of the selected destination item
    SelectedItemText,
}

/// Immutable selector set and per-site behavior for one supported site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Locates the destination input (or selected destination item)
    pub destination_input: String,
    /// Locates the page's root container; observation is scoped beneath it
    pub root: String,
    /// Locates the search-submission control on the home page
    pub search_button: String,
    /// Locates individual per-result action controls on the results page
    pub result_action: String,
    /// Locates the results-content container whose arrival triggers rendering
    pub content: String,
    /// Destination read dispatch for this site
    pub read_strategy: ReadStrategy,
    /// Site-specific modifier classes applied to the overlay container
    pub overlay_classes: Vec<String>,
}

/// Read-only mapping from site identity to its profile.
///
/// Populated once at startup; never mutated afterwards. Passed into observer
/// constructors as a value rather than living in ambient process state.
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    profiles: HashMap<SiteId, SiteProfile>,
}

impl SiteRegistry {
    /// The built-in profile table for the two supported sites
    pub fn builtin() -> Self {
        let mut profiles = HashMap::new();

        profiles.insert(
            SiteId::Skyscanner,
            SiteProfile {
                destination_input: "#destinationInput-input".to_string(),
                root: "#pagewrap".to_string(),
                search_button: "[data-testid=\"desktop-cta\"]".to_string(),
                result_action: "[class*=\"TicketStub_ctaButton\"]".to_string(),
                content: ".UpperTicketBody_screenReaderOnly__YTY2Z".to_string(),
                read_strategy: ReadStrategy::InputValue,
                overlay_classes: vec!["ecolens-skyscanner".to_string()],
            },
        );

        profiles.insert(
            SiteId::Kayak,
            SiteProfile {
                destination_input: ".zEiP-destination .vvTc-item".to_string(),
                root: ".keel".to_string(),
                search_button: ".Iqt3-mod-size-large".to_string(),
                result_action: "a.Iqt3".to_string(),
                content: ".nrc6-wrapper".to_string(),
                read_strategy: ReadStrategy::SelectedItemText,
                overlay_classes: vec!["ecolens-kayak".to_string()],
            },
        );

        Self { profiles }
    }

    /// Build a registry from the built-in table plus TOML overrides.
    ///
    /// Each `[sites.<id>]` table replaces the built-in profile for that site
    /// wholesale; partial overrides are not merged.
    pub fn from_toml_str(doc: &str) -> Result<Self, RegistryError> {
        #[derive(Deserialize)]
        struct Overrides {
            #[serde(default)]
            sites: HashMap<SiteId, SiteProfile>,
        }

        let overrides: Overrides = toml::from_str(doc)?;
        let mut registry = Self::builtin();
        for (site, profile) in overrides.sites {
            tracing::debug!("overriding profile for {}", site);
            registry.profiles.insert(site, profile);
        }
        Ok(registry)
    }

    /// Look up the profile for a site identity
    pub fn resolve(&self, site: SiteId) -> Result<&SiteProfile, RegistryError> {
        self.profiles
            .get(&site)
            .ok_or_else(|| RegistryError::ConfigurationMissing(site.to_string()))
    }

    /// Resolve a hostname to a site identity and its profile
    pub fn resolve_host(&self, host: &str) -> Result<(SiteId, &SiteProfile), RegistryError> {
        let site = SiteId::from_host(host)
            .ok_or_else(|| RegistryError::ConfigurationMissing(host.to_string()))?;
        Ok((site, self.resolve(site)?))
    }

    /// Iterate all registered (identity, profile) pairs
    pub fn iter(&self) -> impl Iterator<Item = (SiteId, &SiteProfile)> {
        self.profiles.iter().map(|(site, profile)| (*site, profile))
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
