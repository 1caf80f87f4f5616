//! End-to-end session scenarios: capture on the home page, carry the intent
//! across a navigation, render and dismiss the overlay on the results page.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use ecolens_client::{
    ClientError, EnrichmentApi, IntentStore, MemoryIntentStore, SharedIntentStore,
};
use ecolens_core::{
    DestinationResponse, EcoScores, EnrichmentRecord, SearchEvent, SiteId, SiteRegistry,
};
use ecolens_observers::{HomeState, ObserveStatus};
use ecolens_page::{NodeId, Page, Selector};
use ecolens_runtime::fixtures;
use ecolens_runtime::{Bootstrapped, RouterConfig, Session};

struct StubApi {
    records: Vec<EnrichmentRecord>,
    persisted: AtomicUsize,
    fetched: AtomicUsize,
}

impl StubApi {
    fn new(records: Vec<EnrichmentRecord>) -> Arc<Self> {
        Arc::new(Self {
            records,
            persisted: AtomicUsize::new(0),
            fetched: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl EnrichmentApi for StubApi {
    async fn persist_event(&self, _event: &SearchEvent) -> Result<(), ClientError> {
        self.persisted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_destinations(&self) -> Result<DestinationResponse, ClientError> {
        self.fetched.fetch_add(1, Ordering::SeqCst);
        Ok(DestinationResponse {
            destinations: self.records.clone(),
            total: self.records.len(),
        })
    }
}

fn green_record() -> EnrichmentRecord {
    EnrichmentRecord {
        scores: EcoScores {
            energy_sources: 90.0,
            air_quality: 85.0,
            water_quality: 95.0,
        },
        content: "Rome runs largely on renewables".to_string(),
        created_at: "2024-03-01T10:00:00Z".to_string(),
        id: 42,
    }
}

fn session(api: Arc<StubApi>) -> (Session, SharedIntentStore) {
    let store: SharedIntentStore = Arc::new(MemoryIntentStore::new());
    let config = RouterConfig::default()
        .with_delays(Duration::from_millis(40), Duration::from_millis(40));
    (Session::new(config, store.clone(), api), store)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

fn sel(raw: &str) -> Selector {
    Selector::parse(raw).unwrap()
}

fn overlay(page: &Page) -> Option<NodeId> {
    page.query(&sel(".ecolens-popup"))
}

/// Drive a full home-page capture for `site`
async fn capture_on_home(session: &Session, site: SiteId, host: &str, destination: &str) {
    let nav = session
        .navigate(host, "/", fixtures::home_html(site))
        .await
        .unwrap();
    let bootstrapped = nav.bootstrapped.unwrap();
    assert_eq!(bootstrapped.status(), ObserveStatus::Watching);

    let profile = SiteRegistry::builtin().resolve(site).unwrap().clone();
    fixtures::enter_destination(&nav.page, &profile, destination);

    let root = nav.page.query(&sel(&profile.root)).unwrap();
    let added = nav.page.append_html(root, fixtures::search_button_html(site));
    settle().await;

    assert!(nav.page.activate(added[0]), "capture suppresses navigation");
    settle().await;

    if let Bootstrapped::Home { observer, .. } = &bootstrapped {
        assert_eq!(observer.state(), HomeState::Captured);
    }
}

#[tokio::test]
async fn scenario_a_home_capture_writes_namespaced_intent() {
    let (session, store) = session(StubApi::new(vec![green_record()]));

    capture_on_home(&session, SiteId::Skyscanner, "www.skyscanner.com", "Rome").await;

    let stored = store.get("skyscanner:DESTINATION").await.unwrap();
    assert_eq!(stored.as_deref(), Some("Rome"));
}

#[tokio::test]
async fn scenario_b_no_intent_means_no_fetch_and_no_overlay() {
    let api = StubApi::new(vec![green_record()]);
    let (session, _store) = session(api.clone());

    let nav = session
        .navigate(
            "www.kayak.com",
            "/flights/ROM",
            fixtures::results_html(SiteId::Kayak),
        )
        .await
        .unwrap();
    assert_eq!(nav.bootstrapped.as_ref().unwrap().status(), ObserveStatus::Watching);

    let root = nav.page.query(&sel(".keel")).unwrap();
    nav.page
        .append_html(root, &fixtures::result_content_html(SiteId::Kayak, "ROM 120"));
    settle().await;

    assert_eq!(api.fetched.load(Ordering::SeqCst), 0);
    assert!(overlay(&nav.page).is_none());
    // The raw observed event is persisted regardless
    assert_eq!(api.persisted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scenario_c_captured_intent_renders_good_overlay() {
    let api = StubApi::new(vec![green_record()]);
    let (session, _store) = session(api.clone());

    capture_on_home(&session, SiteId::Kayak, "www.kayak.com", "Rome").await;

    let nav = session
        .navigate(
            "www.kayak.com",
            "/flights/ROM",
            fixtures::results_html(SiteId::Kayak),
        )
        .await
        .unwrap();
    let root = nav.page.query(&sel(".keel")).unwrap();
    nav.page
        .append_html(root, &fixtures::result_content_html(SiteId::Kayak, "ROM 120"));
    settle().await;

    assert_eq!(api.fetched.load(Ordering::SeqCst), 1);
    let container = overlay(&nav.page).expect("overlay attached");
    assert!(nav.page.has_class(container, "good"));

    let body = nav.page.query(&sel(".ecolens-popup-body")).unwrap();
    let text = nav.page.text_content(body);
    assert!(text.starts_with("Rome"), "title is the captured destination");
    assert!(text.contains("renewables"));
}

#[tokio::test]
async fn scenario_d_dismiss_removes_overlay_after_delay() {
    let api = StubApi::new(vec![green_record()]);
    let (session, store) = session(api);
    store.set("kayak:DESTINATION", "Rome").await.unwrap();

    let nav = session
        .navigate(
            "www.kayak.com",
            "/flights/ROM",
            fixtures::results_html(SiteId::Kayak),
        )
        .await
        .unwrap();
    let root = nav.page.query(&sel(".keel")).unwrap();
    nav.page
        .append_html(root, &fixtures::result_content_html(SiteId::Kayak, "ROM 120"));
    settle().await;

    let container = overlay(&nav.page).unwrap();
    let dismiss = nav.page.query(&sel(".ecolens-popup-dismiss")).unwrap();
    nav.page.activate(dismiss);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(!nav.page.contains(container));
    assert!(overlay(&nav.page).is_none());
}

#[tokio::test]
async fn tooltips_attach_to_every_result_action() {
    let api = StubApi::new(Vec::new());
    let (session, _store) = session(api);

    let nav = session
        .navigate(
            "www.skyscanner.com",
            "/transport/flights/rome",
            fixtures::results_html(SiteId::Skyscanner),
        )
        .await
        .unwrap();
    let root = nav.page.query(&sel("#pagewrap")).unwrap();
    nav.page
        .append_html(root, &fixtures::result_content_html(SiteId::Skyscanner, "ROM 99"));

    tokio::time::sleep(Duration::from_millis(90)).await;

    let tooltips = nav.page.query_all(&sel(".ecolens-tooltip"));
    assert_eq!(tooltips.len(), 1);
    let control = nav
        .page
        .query(&sel("[class*=\"TicketStub_ctaButton\"]"))
        .unwrap();
    assert!(nav
        .page
        .query_children(control, &sel(".ecolens-tooltip"))
        .is_some());
}

#[tokio::test]
async fn unrecognized_host_is_left_untouched() {
    let api = StubApi::new(Vec::new());
    let (session, _store) = session(api.clone());

    let nav = session
        .navigate("www.example.com", "/search", "<html><body></body></html>")
        .await
        .unwrap();
    assert!(nav.bootstrapped.is_none());
    assert_eq!(api.persisted.load(Ordering::SeqCst), 0);
}
