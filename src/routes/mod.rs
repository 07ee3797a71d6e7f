// Route definitions

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::AppState;

mod listings;
mod static_pages;

pub fn create_router(app_state: AppState) -> Router {
    // Feed consumed by the infinite-scroll script on listing pages
    let api_router = Router::new()
        .route("/listings/:kind/feed", get(listings::listing_feed))
        .with_state(app_state.clone());

    Router::new()
        .route("/", get(static_pages::landing_page))
        .route("/listings/:kind", get(listings::listing_page))
        .nest("/api", api_router)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
