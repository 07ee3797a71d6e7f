// Listing pages and the infinite-scroll feed

use askama::Template;
use axum::{
    extract::{Path, Query, RawQuery, State},
    response::{Html, IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    listing::{state::has_more_after, FetchError, FilterKey, FilterSpec, ListingView, Phase},
    models::{ListingItem, ListingKind},
    AppState,
};

const SORT_OPTIONS: [(&str, &str); 4] = [
    ("Newest first", "createdAt,desc"),
    ("Price: low to high", "price,asc"),
    ("Price: high to low", "price,desc"),
    ("Year: newest", "year,desc"),
];

// --- View models shared by the template and the feed ---

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemCard {
    pub id: i64,
    pub title: String,
    pub price: Option<String>,
    pub location: Option<String>,
    pub image: Option<String>,
}

impl From<&ListingItem> for ItemCard {
    fn from(item: &ListingItem) -> Self {
        ItemCard {
            id: item.id,
            title: item.display_title(),
            price: item.price().map(format_price),
            location: item.text("location"),
            image: item.image_urls().first().map(|url| url.to_string()),
        }
    }
}

pub struct LinkOption {
    pub label: String,
    pub href: String,
    pub selected: bool,
}

pub struct FacetGroup {
    pub label: &'static str,
    pub options: Vec<LinkOption>,
}

#[derive(Template)]
#[template(path = "listing.html")]
struct ListingTemplate {
    title: &'static str,
    kinds: Vec<LinkOption>,
    cards: Vec<ItemCard>,
    facet_groups: Vec<FacetGroup>,
    sort_options: Vec<LinkOption>,
    active_filters: Vec<LinkOption>,
    clear_href: String,
    error: Option<String>,
    empty: bool,
    feed_url: Option<String>,
}

impl ListingTemplate {
    fn from_view(view: &ListingView, default_sort: &str) -> Self {
        let kind = view.kind();
        let filters = view.filters();
        let state = view.state();
        let facets = state.facets();

        let facet_groups = [
            ("Brand", FilterKey::Brand, &facets.brands),
            ("Model", FilterKey::Model, &facets.models),
            ("Body type", FilterKey::BodyType, &facets.body_types),
            ("Fuel type", FilterKey::FuelType, &facets.fuel_types),
        ]
        .into_iter()
        .filter(|(_, _, values)| !values.is_empty())
        .map(|(label, key, values)| FacetGroup {
            label,
            options: values
                .iter()
                .map(|value| {
                    let selected = filters.get(key) == Some(value.as_str());
                    // A selected option links to its own removal
                    let next = if selected {
                        filters.encode(key, None)
                    } else {
                        filters.encode(key, Some(value.as_str()))
                    };
                    LinkOption {
                        label: value.clone(),
                        href: listing_href(kind, &next),
                        selected,
                    }
                })
                .collect(),
        })
        .collect();

        let current_sort = filters.get(FilterKey::Sort).unwrap_or(default_sort);
        let sort_options = SORT_OPTIONS
            .iter()
            .map(|(label, value)| LinkOption {
                label: label.to_string(),
                href: listing_href(kind, &filters.encode(FilterKey::Sort, Some(*value))),
                selected: current_sort == *value,
            })
            .collect();

        let active_filters = filters
            .iter()
            .filter(|(key, _)| *key != FilterKey::Sort)
            .map(|(key, value)| LinkOption {
                label: format!("{key}: {value}"),
                href: listing_href(kind, &filters.encode(key, None)),
                selected: true,
            })
            .collect();

        let kinds = ListingKind::ALL
            .into_iter()
            .map(|other| LinkOption {
                label: other.as_str().to_string(),
                href: listing_href(other, ""),
                selected: other == kind,
            })
            .collect();

        let feed_url = (state.phase() == Phase::Idle && state.has_more())
            .then(|| feed_href(kind, filters, state.page_index() + 1));

        ListingTemplate {
            title: kind.title(),
            kinds,
            cards: state.items().iter().map(ItemCard::from).collect(),
            facet_groups,
            sort_options,
            active_filters,
            clear_href: listing_href(kind, &FilterSpec::clear()),
            error: state.error().map(str::to_string),
            empty: state.is_empty_result(),
            feed_url,
        }
    }
}

// --- Feed types ---

#[derive(Deserialize, Debug)]
pub struct FeedParams {
    #[serde(default)]
    page: u32,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    cards: Vec<ItemCard>,
    total_pages: u32,
    page: u32,
    has_more: bool,
    next_url: Option<String>,
}

// --- Helpers ---

fn parse_kind(raw: &str) -> AppResult<ListingKind> {
    raw.parse().map_err(AppError::NotFound)
}

pub fn listing_href(kind: ListingKind, query: &str) -> String {
    if query.is_empty() {
        format!("/listings/{kind}")
    } else {
        format!("/listings/{kind}?{query}")
    }
}

pub fn feed_href(kind: ListingKind, filters: &FilterSpec, page: u32) -> String {
    let query = filters.to_query();
    if query.is_empty() {
        format!("/api/listings/{kind}/feed?page={page}")
    } else {
        format!("/api/listings/{kind}/feed?page={page}&{query}")
    }
}

pub fn format_price(price: f64) -> String {
    // `as` saturates, so out-of-range input cannot overflow here
    let whole = price.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if whole < 0 {
        format!("-£{grouped}")
    } else {
        format!("£{grouped}")
    }
}

// --- Handlers ---

// GET /listings/:kind?<filters>
// Mounts a listing view for the decoded filters and renders its first page
pub async fn listing_page(
    State(app_state): State<AppState>,
    Path(kind): Path<String>,
    RawQuery(query): RawQuery,
) -> AppResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let filters = FilterSpec::decode(query.as_deref().unwrap_or_default());
    tracing::info!(%kind, filters = %filters.to_query(), "[HANDLER] listing page requested");

    let mut view = ListingView::new(
        kind,
        Arc::clone(&app_state.listing_source),
        app_state.settings.fetch_timeout(),
    );
    view.set_filters(filters);
    view.settle().await;

    let template = ListingTemplate::from_view(&view, &app_state.settings.default_sort);
    match template.render() {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            tracing::error!("Failed to render listing template: {}", e);
            Err(AppError::InternalServerError(anyhow::Error::new(e)))
        }
    }
}

// GET /api/listings/:kind/feed?page=N&<filters>
pub async fn listing_feed(
    State(app_state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<FeedParams>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<FeedResponse>> {
    let kind = parse_kind(&kind)?;
    let decoded = FilterSpec::decode_report(query.as_deref().unwrap_or_default());
    let filters = decoded.spec;
    if decoded.rejected.iter().any(|key| key != "page") {
        tracing::debug!(rejected = ?decoded.rejected, "Feed request carried unknown keys");
    }

    let timeout = app_state.settings.fetch_timeout();
    let page = tokio::time::timeout(
        timeout,
        app_state.listing_source.fetch_page(kind, &filters, params.page),
    )
    .await
    .map_err(|_| FetchError::Timeout(timeout))??;

    let has_more = has_more_after(params.page, page.content.len(), page.total_pages);
    tracing::debug!(
        %kind,
        page = params.page,
        items = page.content.len(),
        has_more,
        "[HANDLER] feed page served"
    );

    Ok(Json(FeedResponse {
        next_url: has_more.then(|| feed_href(kind, &filters, params.page + 1)),
        cards: page.content.iter().map(ItemCard::from).collect(),
        total_pages: page.total_pages,
        page: params.page,
        has_more,
    }))
}
