// Pagination and accumulation state for one listing view

use std::collections::{BTreeSet, HashSet};

use crate::listing::fetcher::FetchError;
use crate::models::{ListingItem, ListingPage};

// Generation of the active FilterSpec; completions tagged with an older
// epoch are discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(u64);

impl Epoch {
    fn next(self) -> Epoch {
        Epoch(self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FetchingFirstPage,
    FetchingNextPage,
    Exhausted,
    Errored,
}

// A page fetch the state machine has committed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub epoch: Epoch,
    pub page: u32,
}

#[derive(Debug)]
pub struct Completion {
    pub request: PageRequest,
    pub outcome: Result<ListingPage, FetchError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Stale,
    FirstPage { items: usize, total_pages: u32 },
    NextPage { page: u32, appended: usize },
    Failed { message: String },
}

// Distinct filter values seen in the first page of results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub brands: Vec<String>,
    pub models: Vec<String>,
    pub body_types: Vec<String>,
    pub fuel_types: Vec<String>,
}

impl Facets {
    pub fn from_items(items: &[ListingItem]) -> Facets {
        let distinct = |key: &str| -> Vec<String> {
            items
                .iter()
                .filter_map(|item| item.text(key))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        Facets {
            brands: distinct("brand"),
            models: distinct("model"),
            body_types: distinct("bodyType"),
            fuel_types: distinct("fuelType"),
        }
    }
}

// Whether another page may follow `page`. A page that contributed no new
// items ends the listing whatever `total_pages` claims.
pub fn has_more_after(page: u32, new_items: usize, total_pages: u32) -> bool {
    new_items > 0 && page + 1 < total_pages
}

#[derive(Debug)]
pub struct ListingPageState {
    items: Vec<ListingItem>,
    seen_ids: HashSet<i64>,
    // Page most recently requested in this epoch
    page_index: u32,
    total_pages: u32,
    has_more: bool,
    is_fetching: bool,
    epoch: Epoch,
    phase: Phase,
    facets: Facets,
    error: Option<String>,
}

impl Default for ListingPageState {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingPageState {
    pub fn new() -> Self {
        ListingPageState {
            items: Vec::new(),
            seen_ids: HashSet::new(),
            page_index: 0,
            total_pages: 0,
            has_more: true,
            is_fetching: false,
            epoch: Epoch::default(),
            phase: Phase::Idle,
            facets: Facets::default(),
            error: None,
        }
    }

    // Starts a new epoch for a changed FilterSpec and commits to page 0
    pub fn reset(&mut self) -> PageRequest {
        self.epoch = self.epoch.next();
        self.items.clear();
        self.seen_ids.clear();
        self.page_index = 0;
        self.total_pages = 0;
        self.has_more = true;
        self.is_fetching = true;
        self.phase = Phase::FetchingFirstPage;
        self.facets = Facets::default();
        self.error = None;
        PageRequest { epoch: self.epoch, page: 0 }
    }

    pub fn request_next(&mut self) -> Option<PageRequest> {
        if self.is_fetching || !self.has_more || self.phase != Phase::Idle {
            return None;
        }
        self.page_index += 1;
        self.is_fetching = true;
        self.phase = Phase::FetchingNextPage;
        Some(PageRequest { epoch: self.epoch, page: self.page_index })
    }

    pub fn apply(&mut self, completion: Completion) -> Applied {
        let Completion { request, outcome } = completion;
        if !self.is_current(request) {
            return Applied::Stale;
        }
        self.is_fetching = false;

        let page = match outcome {
            Ok(page) => page,
            Err(err) => {
                let message = err.user_message();
                self.phase = Phase::Errored;
                self.error = Some(message.clone());
                return Applied::Failed { message };
            }
        };

        self.total_pages = page.total_pages;
        if request.page == 0 {
            self.items.clear();
            self.seen_ids.clear();
            let appended = self.push_unique(page.content);
            self.facets = Facets::from_items(&self.items);
            self.has_more = has_more_after(0, appended, page.total_pages);
            self.phase = if self.has_more { Phase::Idle } else { Phase::Exhausted };
            Applied::FirstPage {
                items: self.items.len(),
                total_pages: page.total_pages,
            }
        } else {
            let appended = self.push_unique(page.content);
            self.has_more = has_more_after(request.page, appended, page.total_pages);
            self.phase = if self.has_more { Phase::Idle } else { Phase::Exhausted };
            Applied::NextPage {
                page: request.page,
                appended,
            }
        }
    }

    fn is_current(&self, request: PageRequest) -> bool {
        self.is_fetching && request.epoch == self.epoch && request.page == self.page_index
    }

    fn push_unique(&mut self, incoming: Vec<ListingItem>) -> usize {
        let before = self.items.len();
        for item in incoming {
            if self.seen_ids.insert(item.id) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    pub fn items(&self) -> &[ListingItem] {
        &self.items
    }

    pub fn last_item_id(&self) -> Option<i64> {
        self.items.last().map(|item| item.id)
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_fetching(&self) -> bool {
        self.is_fetching
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // Settled with no matches for the current filters
    pub fn is_empty_result(&self) -> bool {
        self.phase == Phase::Exhausted && self.items.is_empty()
    }
}
