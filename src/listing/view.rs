// A mounted listing view: filters in, pages out, scroll events in between

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::listing::fetcher::{FetchError, ListingSource};
use crate::listing::filters::FilterSpec;
use crate::listing::state::{Applied, Completion, ListingPageState, PageRequest};
use crate::listing::trigger::{ProximityTrigger, TriggerGate};
use crate::models::ListingKind;

pub struct ListingView {
    kind: ListingKind,
    filters: FilterSpec,
    mounted: bool,
    state: ListingPageState,
    trigger: ProximityTrigger,
    source: Arc<dyn ListingSource>,
    fetch_timeout: Duration,
    // Fetch tasks report back here; only the view mutates its state
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl ListingView {
    pub fn new(
        kind: ListingKind,
        source: Arc<dyn ListingSource>,
        fetch_timeout: Duration,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        ListingView {
            kind,
            filters: FilterSpec::new(),
            mounted: false,
            state: ListingPageState::new(),
            trigger: ProximityTrigger::new(),
            source,
            fetch_timeout,
            completions_tx,
            completions_rx,
        }
    }

    // The first call mounts the view; later calls with a different spec reset
    // it and reload from page 0. Returns false when the spec is unchanged.
    pub fn set_filters(&mut self, filters: FilterSpec) -> bool {
        if self.mounted && filters == self.filters {
            return false;
        }
        self.mounted = true;
        self.filters = filters;
        let request = self.state.reset();
        self.trigger.observe(None);
        tracing::info!(
            kind = %self.kind,
            epoch = ?request.epoch,
            filters = %self.filters.to_query(),
            "Loading listing from first page"
        );
        self.spawn_fetch(request);
        true
    }

    // Proximity sensor reading for a rendered item; true when it started a fetch
    pub fn on_visibility(&mut self, target: i64, intersecting: bool) -> bool {
        let gate = TriggerGate {
            is_fetching: self.state.is_fetching(),
            has_more: self.state.has_more(),
        };
        if !self.trigger.on_intersection(target, intersecting, gate) {
            return false;
        }
        match self.state.request_next() {
            Some(request) => {
                tracing::debug!(
                    kind = %self.kind,
                    page = request.page,
                    "Tail item visible; fetching next page"
                );
                self.spawn_fetch(request);
                true
            }
            None => false,
        }
    }

    fn spawn_fetch(&self, request: PageRequest) {
        let source = Arc::clone(&self.source);
        let filters = self.filters.clone();
        let kind = self.kind;
        let timeout = self.fetch_timeout;
        let completions_tx = self.completions_tx.clone();

        tokio::spawn(async move {
            // Run the fetch as its own task so a panicking source still yields a completion
            let fetch = tokio::spawn(async move {
                tokio::time::timeout(timeout, source.fetch_page(kind, &filters, request.page)).await
            });
            let outcome = match fetch.await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(FetchError::Timeout(timeout)),
                Err(join_err) => {
                    tracing::error!(
                        %kind,
                        page = request.page,
                        error = %join_err,
                        "Listing fetch task failed"
                    );
                    Err(FetchError::Aborted(join_err.to_string()))
                }
            };
            // The view may have been dropped while this request drained
            let _ = completions_tx.send(Completion { request, outcome });
        });
    }

    pub async fn next_completion(&mut self) -> Option<Applied> {
        let completion = self.completions_rx.recv().await?;
        Some(self.apply(completion))
    }

    // Waits until the current epoch has no fetch in flight
    pub async fn settle(&mut self) {
        while self.state.is_fetching() {
            if self.next_completion().await.is_none() {
                break;
            }
        }
    }

    fn apply(&mut self, completion: Completion) -> Applied {
        let request = completion.request;
        let applied = self.state.apply(completion);
        match &applied {
            Applied::Stale => {
                tracing::debug!(
                    kind = %self.kind,
                    epoch = ?request.epoch,
                    page = request.page,
                    "Discarded stale listing response"
                );
            }
            Applied::FirstPage { items, total_pages } => {
                tracing::info!(kind = %self.kind, items, total_pages, "First page loaded");
            }
            Applied::NextPage { page, appended } => {
                tracing::debug!(
                    kind = %self.kind,
                    page,
                    appended,
                    total = self.state.items().len(),
                    "Next page appended"
                );
            }
            Applied::Failed { message } => {
                tracing::warn!(
                    kind = %self.kind,
                    page = request.page,
                    message = %message,
                    "Listing fetch failed"
                );
            }
        }
        self.trigger.observe(self.state.last_item_id());
        applied
    }

    pub fn kind(&self) -> ListingKind {
        self.kind
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn state(&self) -> &ListingPageState {
        &self.state
    }
}
