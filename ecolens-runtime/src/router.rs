//! Bootstrap routing
//!
//! Given the current host and path: resolve a site profile (take no action if
//! unrecognized), classify the path as home or results, instantiate the
//! matching observer variant, defer `observe()` until the document has
//! finished initial loading, then invoke it exactly once.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use ecolens_client::{SharedEnrichmentApi, SharedIntentStore};
use ecolens_core::{
    EnrichmentRecord, SiteId, SiteRegistry, DISMISS_DELAY_MS, TOOLTIP_DELAY_MS,
};
use ecolens_observers::{
    HomeCaptureObserver, ObserveStatus, ObserverConfig, ObserverError, ResultsConfig,
    ResultsOverlayObserver,
};
use ecolens_page::Page;

/// Errors from bootstrap
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Observer(#[from] ObserverError),
}

/// Page classification by path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Home,
    Results,
}

/// A path of length one or less is the home page; anything longer is results
pub fn classify_path(path: &str) -> PageKind {
    if path.len() <= 1 {
        PageKind::Home
    } else {
        PageKind::Results
    }
}

/// Explicit configuration injected into the router (no ambient state)
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub registry: SiteRegistry,
    pub fallback: EnrichmentRecord,
    pub dismiss_delay: Duration,
    pub tooltip_delay: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            registry: SiteRegistry::builtin(),
            fallback: EnrichmentRecord::fallback(),
            dismiss_delay: Duration::from_millis(DISMISS_DELAY_MS),
            tooltip_delay: Duration::from_millis(TOOLTIP_DELAY_MS),
        }
    }
}

impl RouterConfig {
    pub fn with_registry(mut self, registry: SiteRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_delays(mut self, dismiss: Duration, tooltip: Duration) -> Self {
        self.dismiss_delay = dismiss;
        self.tooltip_delay = tooltip;
        self
    }
}

/// The observer started for a page, for inspection by callers
pub enum Bootstrapped {
    Home {
        observer: HomeCaptureObserver,
        status: ObserveStatus,
    },
    Results {
        observer: ResultsOverlayObserver,
        status: ObserveStatus,
    },
}

impl Bootstrapped {
    pub fn status(&self) -> ObserveStatus {
        match self {
            Bootstrapped::Home { status, .. } => *status,
            Bootstrapped::Results { status, .. } => *status,
        }
    }

    pub fn kind(&self) -> PageKind {
        match self {
            Bootstrapped::Home { .. } => PageKind::Home,
            Bootstrapped::Results { .. } => PageKind::Results,
        }
    }
}

/// Chooses and starts the observer variant for a page
pub struct BootstrapRouter {
    config: RouterConfig,
    store: SharedIntentStore,
    api: SharedEnrichmentApi,
}

impl BootstrapRouter {
    pub fn new(config: RouterConfig, store: SharedIntentStore, api: SharedEnrichmentApi) -> Self {
        Self { config, store, api }
    }

    /// Bootstrap observation of `page`. Returns `None` (and takes no action)
    /// for an unrecognized host.
    pub async fn bootstrap(
        &self,
        page: &Page,
        host: &str,
        path: &str,
    ) -> Result<Option<Bootstrapped>, RuntimeError> {
        let Some(site) = SiteId::from_host(host) else {
            debug!(host, "unrecognized host, taking no action");
            return Ok(None);
        };
        let profile = match self.config.registry.resolve(site) {
            Ok(profile) => profile.clone(),
            Err(e) => {
                debug!(host, "no profile for recognized host: {e}");
                return Ok(None);
            }
        };

        // Defer until the document has finished initial loading
        page.ready().await;

        let observer_config = ObserverConfig::new(site, profile);
        let bootstrapped = match classify_path(path) {
            PageKind::Home => {
                let observer =
                    HomeCaptureObserver::new(observer_config, page.clone(), self.store.clone())?;
                let status = observer.observe().await;
                Bootstrapped::Home { observer, status }
            }
            PageKind::Results => {
                let results_config = ResultsConfig::new(observer_config)
                    .with_fallback(self.config.fallback.clone())
                    .with_delays(self.config.dismiss_delay, self.config.tooltip_delay);
                let observer = ResultsOverlayObserver::new(
                    results_config,
                    page.clone(),
                    self.store.clone(),
                    self.api.clone(),
                )?;
                let status = observer.observe().await;
                Bootstrapped::Results { observer, status }
            }
        };

        Ok(Some(bootstrapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use ecolens_client::{ClientError, EnrichmentApi, MemoryIntentStore};
    use ecolens_core::{DestinationResponse, SearchEvent};

    struct NullApi;

    #[async_trait]
    impl EnrichmentApi for NullApi {
        async fn persist_event(&self, _event: &SearchEvent) -> Result<(), ClientError> {
            Ok(())
        }

        async fn fetch_destinations(&self) -> Result<DestinationResponse, ClientError> {
            Ok(DestinationResponse {
                destinations: Vec::new(),
                total: 0,
            })
        }
    }

    fn router() -> BootstrapRouter {
        BootstrapRouter::new(
            RouterConfig::default(),
            Arc::new(MemoryIntentStore::new()),
            Arc::new(NullApi),
        )
    }

    #[test]
    fn test_classify_path() {
        assert_eq!(classify_path(""), PageKind::Home);
        assert_eq!(classify_path("/"), PageKind::Home);
        assert_eq!(classify_path("/flights/rome"), PageKind::Results);
    }

    #[tokio::test]
    async fn test_unrecognized_host_takes_no_action() {
        let page = Page::from_html("https://www.example.com/", "<html><body></body></html>");
        page.mark_ready();
        let result = router().bootstrap(&page, "www.example.com", "/").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_home_and_results_variants() {
        let home = Page::from_html(
            "https://www.kayak.com/",
            "<html><body><div class='keel'></div></body></html>",
        );
        home.mark_ready();
        let bootstrapped = router()
            .bootstrap(&home, "www.kayak.com", "/")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bootstrapped.kind(), PageKind::Home);
        assert_eq!(bootstrapped.status(), ObserveStatus::Watching);

        let results = Page::from_html(
            "https://www.kayak.com/flights/rome",
            "<html><body><div class='keel'></div></body></html>",
        );
        results.mark_ready();
        let bootstrapped = router()
            .bootstrap(&results, "www.kayak.com", "/flights/rome")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bootstrapped.kind(), PageKind::Results);
    }

    #[tokio::test]
    async fn test_observe_deferred_until_ready() {
        let page = Page::from_html(
            "https://www.kayak.com/",
            "<html><body><div class='keel'></div></body></html>",
        );

        let task = {
            let page = page.clone();
            tokio::spawn(async move { router().bootstrap(&page, "www.kayak.com", "/").await })
        };

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(!task.is_finished(), "bootstrap must wait for readiness");

        page.mark_ready();
        let bootstrapped = task.await.unwrap().unwrap().unwrap();
        assert_eq!(bootstrapped.status(), ObserveStatus::Watching);
    }

    #[tokio::test]
    async fn test_root_absent_reported_silently() {
        let page = Page::from_html("https://www.kayak.com/", "<html><body></body></html>");
        page.mark_ready();
        let bootstrapped = router()
            .bootstrap(&page, "www.kayak.com", "/")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bootstrapped.status(), ObserveStatus::RootAbsent);
    }
}
