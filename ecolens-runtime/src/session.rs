//! Session harness
//!
//! Wires a shared intent store and backend client to a router, and models
//! page navigations: each navigation builds a fresh page from markup, marks
//! it ready, and bootstraps observation on it. The store outlives pages, so
//! intent captured on one page is visible on the next.

use ecolens_client::{SharedEnrichmentApi, SharedIntentStore};
use ecolens_page::Page;

use crate::{Bootstrapped, BootstrapRouter, RouterConfig, RuntimeError};

/// One page visit: the page and whatever observer was started on it
pub struct Navigation {
    pub page: Page,
    pub bootstrapped: Option<Bootstrapped>,
}

/// A browsing session across page navigations
pub struct Session {
    store: SharedIntentStore,
    api: SharedEnrichmentApi,
    router: BootstrapRouter,
}

impl Session {
    pub fn new(config: RouterConfig, store: SharedIntentStore, api: SharedEnrichmentApi) -> Self {
        let router = BootstrapRouter::new(config, store.clone(), api.clone());
        Self { store, api, router }
    }

    /// The session-wide intent store
    pub fn store(&self) -> SharedIntentStore {
        self.store.clone()
    }

    /// The session-wide backend client
    pub fn api(&self) -> SharedEnrichmentApi {
        self.api.clone()
    }

    /// Visit a page: build it from markup, mark it loaded, bootstrap it
    pub async fn navigate(
        &self,
        host: &str,
        path: &str,
        html: &str,
    ) -> Result<Navigation, RuntimeError> {
        let location = format!("https://{host}{path}");
        let page = Page::from_html(location, html);
        page.mark_ready();
        let bootstrapped = self.router.bootstrap(&page, host, path).await?;
        Ok(Navigation { page, bootstrapped })
    }
}
