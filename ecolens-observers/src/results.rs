//! Results-page overlay observer
//!
//! Watches the results page for content arrival. Each arrival persists the
//! raw observed event (fire-and-forget) and spawns an independent
//! fetch-and-render continuation; a per-observer render guard serializes
//! dismiss-then-create so at most one overlay is ever live. A separate branch
//! rescans for per-result controls after a fixed delay and attaches tooltips.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ecolens_client::{EnrichmentApi, IntentStore, SharedEnrichmentApi, SharedIntentStore};
use ecolens_core::{
    intent_key, EnrichmentRecord, LeafColor, SearchEvent, DISMISS_DELAY_MS, TOOLTIP_DELAY_MS,
};
use ecolens_page::{NodeId, OverlayBuilder, Page, Selector, StyleSpec, TextSpec};

use crate::{ObserveStatus, ObserverConfig, ObserverError};

/// Base class of the overlay container
pub const OVERLAY_CLASS: &str = "ecolens-popup";
/// Decorative leaf marker inside the overlay
pub const OVERLAY_LEAF_CLASS: &str = "ecolens-popup-leaf";
/// Text container holding title and description
pub const OVERLAY_BODY_CLASS: &str = "ecolens-popup-body";
/// The dismiss control
pub const OVERLAY_DISMISS_CLASS: &str = "ecolens-popup-dismiss";
/// Toggled on the container while the dismiss transition runs
pub const DISMISSING_CLASS: &str = "ecolens-dismissing";
/// Tooltip container attached to each per-result control
pub const TOOLTIP_CLASS: &str = "ecolens-tooltip";
/// Icon marker inside a tooltip
pub const TOOLTIP_ICON_CLASS: &str = "ecolens-tooltip-icon";
/// Label of the dismiss control
pub const DISMISS_LABEL: &str = "Dismiss";

/// Configuration for a results-page observer
#[derive(Debug, Clone)]
pub struct ResultsConfig {
    pub observer: ObserverConfig,
    /// Substitute record when the fetch fails or returns nothing selectable
    pub fallback: EnrichmentRecord,
    /// Visual-transition delay before a dismissed overlay is removed
    pub dismiss_delay: Duration,
    /// Delay before each tooltip rescan of the document
    pub tooltip_delay: Duration,
}

impl ResultsConfig {
    pub fn new(observer: ObserverConfig) -> Self {
        Self {
            observer,
            fallback: EnrichmentRecord::fallback(),
            dismiss_delay: Duration::from_millis(DISMISS_DELAY_MS),
            tooltip_delay: Duration::from_millis(TOOLTIP_DELAY_MS),
        }
    }

    pub fn with_delays(mut self, dismiss: Duration, tooltip: Duration) -> Self {
        self.dismiss_delay = dismiss;
        self.tooltip_delay = tooltip;
        self
    }

    pub fn with_fallback(mut self, fallback: EnrichmentRecord) -> Self {
        self.fallback = fallback;
        self
    }
}

struct LiveOverlay {
    container: NodeId,
    dismiss: NodeId,
}

#[derive(Default)]
struct OverlaySlot {
    live: Option<LiveOverlay>,
    /// A user-initiated dismissal still in its transition delay
    dismissal: Option<JoinHandle<()>>,
}

/// State shared with the observer's spawned continuations
struct Shared {
    id: String,
    page: Page,
    builder: OverlayBuilder,
    api: SharedEnrichmentApi,
    overlay_classes: Vec<String>,
    fallback: EnrichmentRecord,
    dismiss_delay: Duration,
    tooltip_delay: Duration,
    result_action: Selector,
    slot: Mutex<OverlaySlot>,
}

/// Observer for the results page of one site
pub struct ResultsOverlayObserver {
    config: ResultsConfig,
    root: Selector,
    content: Selector,
    store: SharedIntentStore,
    shared: Arc<Shared>,
}

impl ResultsOverlayObserver {
    pub fn new(
        config: ResultsConfig,
        page: Page,
        store: SharedIntentStore,
        api: SharedEnrichmentApi,
    ) -> Result<Self, ObserverError> {
        let profile = &config.observer.profile;
        let root = Selector::parse(&profile.root)?;
        let content = Selector::parse(&profile.content)?;
        let result_action = Selector::parse(&profile.result_action)?;

        let shared = Arc::new(Shared {
            id: config.observer.id.clone(),
            page: page.clone(),
            builder: OverlayBuilder::new(page),
            api,
            overlay_classes: profile.overlay_classes.clone(),
            fallback: config.fallback.clone(),
            dismiss_delay: config.dismiss_delay,
            tooltip_delay: config.tooltip_delay,
            result_action,
            slot: Mutex::new(OverlaySlot::default()),
        });

        Ok(Self {
            config,
            root,
            content,
            store,
            shared,
        })
    }

    /// The currently live overlay container, if any
    pub async fn live_overlay(&self) -> Option<NodeId> {
        self.shared.slot.lock().await.live.as_ref().map(|l| l.container)
    }

    /// The live overlay's dismiss control, if any
    pub async fn live_dismiss_control(&self) -> Option<NodeId> {
        self.shared.slot.lock().await.live.as_ref().map(|l| l.dismiss)
    }

    /// Start observing. The captured destination is resolved exactly once per
    /// invocation; without it, content arrivals still persist events but no
    /// overlay is attempted this cycle.
    pub async fn observe(&self) -> ObserveStatus {
        let Some(root) = self.shared.page.query(&self.root) else {
            debug!(observer = %self.shared.id, "page root absent, staying idle");
            return ObserveStatus::RootAbsent;
        };

        let destination = match self.store.get(&intent_key(self.config.observer.site)).await {
            Ok(Some(destination)) => {
                debug!(observer = %self.shared.id, destination = %destination, "captured intent resolved");
                Some(destination)
            }
            Ok(None) => {
                debug!(observer = %self.shared.id, "no captured intent, enrichment skipped this cycle");
                None
            }
            Err(e) => {
                warn!(observer = %self.shared.id, "intent read failed: {e}");
                None
            }
        };

        let mut additions = self.shared.page.watch_added(root, self.content.clone());
        let shared = self.shared.clone();

        tokio::spawn(async move {
            while let Some(batch) = additions.recv().await {
                for node in batch {
                    // Persist the raw observed event; outcome never gates rendering
                    let event = SearchEvent {
                        url: shared.page.location().to_string(),
                        data: shared.page.text_content(node),
                    };
                    let api = shared.api.clone();
                    let observer = shared.id.clone();
                    tokio::spawn(async move {
                        if let Err(e) = api.persist_event(&event).await {
                            warn!(observer = %observer, "search event persistence failed: {e}");
                        }
                    });

                    // Independent fetch-and-render continuation
                    if let Some(destination) = destination.clone() {
                        let shared = shared.clone();
                        tokio::spawn(async move {
                            render_overlay(shared, root, destination).await;
                        });
                    }

                    // Tooltip branch: coarse delayed rescan of the document
                    let shared = shared.clone();
                    tokio::spawn(async move {
                        tooltip_scan(shared).await;
                    });
                }
            }
        });

        ObserveStatus::Watching
    }
}

/// Select one record uniformly at random; `None` for an empty collection
fn select_random(mut records: Vec<EnrichmentRecord>) -> Option<EnrichmentRecord> {
    if records.is_empty() {
        return None;
    }
    let index = rand::thread_rng().gen_range(0..records.len());
    Some(records.swap_remove(index))
}

async fn render_overlay(shared: Arc<Shared>, root: NodeId, destination: String) {
    let record = match shared.api.fetch_destinations().await {
        Ok(response) => match select_random(response.destinations) {
            Some(record) => record,
            None => {
                warn!(observer = %shared.id, "enrichment collection empty, using fallback record");
                shared.fallback.clone()
            }
        },
        Err(e) => {
            warn!(observer = %shared.id, "enrichment fetch failed, using fallback record: {e}");
            shared.fallback.clone()
        }
    };

    // Render guard: holds across dismiss-then-create so overlapping
    // continuations and an in-flight user dismissal fully serialize
    let mut slot = shared.slot.lock().await;
    if let Some(pending) = slot.dismissal.take() {
        let _ = pending.await;
    }
    if let Some(previous) = slot.live.take() {
        dismiss_now(&shared, previous).await;
    }

    let leaf = LeafColor::from_scores(&record.scores);
    let mut classes = vec![OVERLAY_CLASS.to_string(), leaf.as_class().to_string()];
    classes.extend(shared.overlay_classes.iter().cloned());

    let container = shared
        .builder
        .compose(StyleSpec::classes(classes), None)
        .await;

    let marker = shared
        .builder
        .compose(StyleSpec::single(OVERLAY_LEAF_CLASS), None)
        .await;
    shared.builder.append_once(container.node(), &marker);

    let body = shared
        .builder
        .compose(
            StyleSpec::single(OVERLAY_BODY_CLASS),
            Some(TextSpec::lines([destination.clone(), record.content.clone()])),
        )
        .await;
    shared.builder.append_once(container.node(), &body);

    let dismiss = shared
        .builder
        .compose(
            StyleSpec::single(OVERLAY_DISMISS_CLASS),
            Some(TextSpec::text(DISMISS_LABEL)),
        )
        .await;
    shared.builder.append_once(container.node(), &dismiss);

    let attached = shared.builder.append_once(root, &container);
    info!(
        observer = %shared.id,
        destination = %destination,
        leaf = leaf.as_class(),
        "overlay rendered"
    );

    let mut clicks = shared.page.on_activate(dismiss.node(), false);
    slot.live = Some(LiveOverlay {
        container: attached,
        dismiss: dismiss.node(),
    });
    drop(slot);

    // Dismiss wiring, once per render
    let shared = shared.clone();
    tokio::spawn(async move {
        if clicks.recv().await.is_none() {
            return;
        }
        let mut slot = shared.slot.lock().await;
        if slot.live.as_ref().map(|l| l.container) != Some(attached) {
            // Already replaced by a newer render
            return;
        }
        let live = slot.live.take().expect("checked above");
        let worker = shared.clone();
        let handle = tokio::spawn(async move {
            dismiss_now(&worker, live).await;
        });
        slot.dismissal = Some(handle);
    });
}

/// The full dismiss sequence: mark, wait out the transition, detach
async fn dismiss_now(shared: &Shared, live: LiveOverlay) {
    shared.page.add_class(live.container, DISMISSING_CLASS);
    tokio::time::sleep(shared.dismiss_delay).await;
    shared.page.detach(live.container);
    debug!(observer = %shared.id, "overlay removed");
}

/// Delayed rescan attaching a tooltip to every per-result control.
/// Deliberately coarse; the delay waits out third-party settling.
async fn tooltip_scan(shared: Arc<Shared>) {
    tokio::time::sleep(shared.tooltip_delay).await;

    let controls = shared.page.query_all(&shared.result_action);
    debug!(observer = %shared.id, controls = controls.len(), "tooltip scan");

    for control in controls {
        let tooltip = shared
            .builder
            .compose(StyleSpec::single(TOOLTIP_CLASS), None)
            .await;
        let icon = shared
            .builder
            .compose(StyleSpec::single(TOOLTIP_ICON_CLASS), None)
            .await;
        shared.builder.append_once(tooltip.node(), &icon);
        shared.builder.replace_or_prepend(control, &tooltip);
    }
}
