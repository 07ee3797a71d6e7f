// Incremental, filter-driven listing engine shared by every listing page

pub mod fetcher;
pub mod filters;
pub mod state;
pub mod trigger;
pub mod view;

pub use fetcher::{ApiClient, FetchError, ListingSource};
pub use filters::{FilterKey, FilterSpec};
pub use state::Phase;
pub use view::ListingView;
