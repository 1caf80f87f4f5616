//! Home-page capture observer
//!
//! Watches the home page for the appearance of a search-submission control,
//! intercepts its activation, reads the destination value per the site's read
//! strategy, and writes it to the intent store. Capture may simply not occur;
//! the designed degradation is that no enrichment is shown downstream.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use ecolens_client::{IntentStore, SharedIntentStore};
use ecolens_core::{CapturedIntent, ReadStrategy};
use ecolens_page::{Page, Selector};

use crate::{ObserveStatus, ObserverConfig, ObserverError};

/// Capture state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeState {
    Idle,
    Watching,
    CaptureArmed,
    Captured,
}

struct HomeSelectors {
    root: Selector,
    search_button: Selector,
    destination_input: Selector,
}

/// Observer for the home page of one site
pub struct HomeCaptureObserver {
    config: ObserverConfig,
    selectors: HomeSelectors,
    page: Page,
    store: SharedIntentStore,
    state: Arc<Mutex<HomeState>>,
}

impl HomeCaptureObserver {
    pub fn new(
        config: ObserverConfig,
        page: Page,
        store: SharedIntentStore,
    ) -> Result<Self, ObserverError> {
        let selectors = HomeSelectors {
            root: Selector::parse(&config.profile.root)?,
            search_button: Selector::parse(&config.profile.search_button)?,
            destination_input: Selector::parse(&config.profile.destination_input)?,
        };
        Ok(Self {
            config,
            selectors,
            page,
            store,
            state: Arc::new(Mutex::new(HomeState::Idle)),
        })
    }

    /// Current state of the capture machine
    pub fn state(&self) -> HomeState {
        *self.state.lock()
    }

    /// Start observing. If the page root is absent the observer stays idle
    /// indefinitely; no retry, no error surfaced.
    pub async fn observe(&self) -> ObserveStatus {
        let Some(root) = self.page.query(&self.selectors.root) else {
            debug!(observer = %self.config.id, "page root absent, staying idle");
            return ObserveStatus::RootAbsent;
        };
        *self.state.lock() = HomeState::Watching;

        let mut additions = self
            .page
            .watch_added(root, self.selectors.search_button.clone());
        let (clicks_tx, mut clicks_rx) = mpsc::unbounded_channel();

        // Arming loop: every newly detected control gets its own listener.
        // Stale or duplicate controls each re-arm; duplicate capture attempts
        // are accepted, last write wins.
        {
            let page = self.page.clone();
            let state = self.state.clone();
            let observer = self.config.id.clone();
            tokio::spawn(async move {
                while let Some(batch) = additions.recv().await {
                    for node in batch {
                        debug!(observer = %observer, "search control detected, arming");
                        page.add_activation_listener(node, clicks_tx.clone(), true);
                        *state.lock() = HomeState::CaptureArmed;
                    }
                }
            });
        }

        // Capture loop: on activation, read the destination and persist it.
        {
            let page = self.page.clone();
            let state = self.state.clone();
            let store = self.store.clone();
            let observer = self.config.id.clone();
            let site = self.config.site;
            let strategy = self.config.profile.read_strategy;
            let input = self.selectors.destination_input.clone();
            tokio::spawn(async move {
                while clicks_rx.recv().await.is_some() {
                    let Some(destination) = read_destination(&page, &input, strategy) else {
                        debug!(observer = %observer, "no destination value, skipping write");
                        continue;
                    };
                    let intent = CapturedIntent::new(site, destination);
                    match store.set(&intent.key(), &intent.destination).await {
                        Ok(_) => {
                            *state.lock() = HomeState::Captured;
                            info!(observer = %observer, destination = %intent.destination, "intent captured");
                        }
                        Err(e) => {
                            warn!(observer = %observer, "intent write failed: {e}");
                        }
                    }
                }
            });
        }

        ObserveStatus::Watching
    }
}

/// Read the destination value per the site's strategy. Returns `None` when
/// the input is missing or its value is empty.
fn read_destination(page: &Page, input: &Selector, strategy: ReadStrategy) -> Option<String> {
    let node = page.query(input)?;
    let raw = match strategy {
        ReadStrategy::InputValue => page.value(node).unwrap_or_default(),
        ReadStrategy::SelectedItemText => page.text_content(node),
    };
    let value = raw.trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ecolens_client::MemoryIntentStore;
    use ecolens_core::{SiteId, SiteRegistry};

    const SKYSCANNER_HOME: &str = r#"
        <html><body>
          <div id="pagewrap">
            <input id="destinationInput-input" value="Rome">
          </div>
        </body></html>
    "#;

    const KAYAK_HOME: &str = r#"
        <html><body>
          <div class="keel">
            <div class="zEiP-destination"><div class="vvTc-item">Paris</div></div>
          </div>
        </body></html>
    "#;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    fn observer(site: SiteId, page: &Page, store: &Arc<MemoryIntentStore>) -> HomeCaptureObserver {
        let profile = SiteRegistry::builtin().resolve(site).unwrap().clone();
        let store: SharedIntentStore = store.clone();
        HomeCaptureObserver::new(ObserverConfig::new(site, profile), page.clone(), store).unwrap()
    }

    #[tokio::test]
    async fn test_root_absent_stays_idle() {
        let page = Page::from_html("https://www.skyscanner.com/", "<html><body></body></html>");
        let store = Arc::new(MemoryIntentStore::new());
        let obs = observer(SiteId::Skyscanner, &page, &store);

        assert_eq!(obs.observe().await, ObserveStatus::RootAbsent);
        assert_eq!(obs.state(), HomeState::Idle);
    }

    #[tokio::test]
    async fn test_skyscanner_capture_writes_intent() {
        let page = Page::from_html("https://www.skyscanner.com/", SKYSCANNER_HOME);
        let store = Arc::new(MemoryIntentStore::new());
        let obs = observer(SiteId::Skyscanner, &page, &store);

        assert_eq!(obs.observe().await, ObserveStatus::Watching);
        assert_eq!(obs.state(), HomeState::Watching);

        let root = page.query(&Selector::parse("#pagewrap").unwrap()).unwrap();
        let added = page.append_html(root, r#"<button data-testid="desktop-cta">Search</button>"#);
        settle().await;
        assert_eq!(obs.state(), HomeState::CaptureArmed);

        // Activation suppresses the default navigation and captures
        assert!(page.activate(added[0]));
        settle().await;

        let stored = store.get("skyscanner:DESTINATION").await.unwrap();
        assert_eq!(stored.as_deref(), Some("Rome"));
        assert_eq!(obs.state(), HomeState::Captured);
    }

    #[tokio::test]
    async fn test_kayak_reads_selected_item_text() {
        let page = Page::from_html("https://www.kayak.com/", KAYAK_HOME);
        let store = Arc::new(MemoryIntentStore::new());
        let obs = observer(SiteId::Kayak, &page, &store);

        obs.observe().await;
        let root = page.query(&Selector::parse(".keel").unwrap()).unwrap();
        let added = page.append_html(root, r#"<button class="Iqt3-mod-size-large">Go</button>"#);
        settle().await;

        page.activate(added[0]);
        settle().await;

        let stored = store.get("kayak:DESTINATION").await.unwrap();
        assert_eq!(stored.as_deref(), Some("Paris"));
    }

    #[tokio::test]
    async fn test_empty_value_skips_write() {
        let page = Page::from_html(
            "https://www.skyscanner.com/",
            r#"<html><body><div id="pagewrap">
                 <input id="destinationInput-input" value="">
               </div></body></html>"#,
        );
        let store = Arc::new(MemoryIntentStore::new());
        let obs = observer(SiteId::Skyscanner, &page, &store);

        obs.observe().await;
        let root = page.query(&Selector::parse("#pagewrap").unwrap()).unwrap();
        let added = page.append_html(root, r#"<button data-testid="desktop-cta">Search</button>"#);
        settle().await;

        page.activate(added[0]);
        settle().await;

        assert!(store.get("skyscanner:DESTINATION").await.unwrap().is_none());
        assert_eq!(obs.state(), HomeState::CaptureArmed);
    }

    #[tokio::test]
    async fn test_rearms_on_duplicate_controls() {
        let page = Page::from_html("https://www.skyscanner.com/", SKYSCANNER_HOME);
        let store = Arc::new(MemoryIntentStore::new());
        let obs = observer(SiteId::Skyscanner, &page, &store);

        obs.observe().await;
        let root = page.query(&Selector::parse("#pagewrap").unwrap()).unwrap();
        let first = page.append_html(root, r#"<button data-testid="desktop-cta">A</button>"#);
        let second = page.append_html(root, r#"<button data-testid="desktop-cta">B</button>"#);
        settle().await;

        // Both detected instances carry their own listener
        assert!(page.activate(first[0]));
        assert!(page.activate(second[0]));
    }
}
