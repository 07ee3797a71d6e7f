// Fetching listing pages from the remote search API

use async_trait::async_trait;
use reqwest::Client;
use std::{sync::Arc, time::Duration};
use thiserror::Error;

use crate::config::Settings;
use crate::listing::filters::{FilterKey, FilterSpec};
use crate::models::{ListingKind, ListingPage};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("listing API request failed: {0}")]
    Transport(String),

    #[error("listing API returned status {status}")]
    Status { status: u16 },

    #[error("listing API response could not be decoded: {0}")]
    Decode(String),

    #[error("listing API did not respond within {0:?}")]
    Timeout(Duration),

    #[error("listing fetch task failed: {0}")]
    Aborted(String),
}

impl FetchError {
    // Message shown inline on the listing page
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Transport(_) => "We couldn't reach the listings service. \
                 Check your connection and try again."
                .to_string(),
            FetchError::Status { status } if *status >= 500 => {
                "The listings service is having trouble right now. Please try again shortly."
                    .to_string()
            }
            FetchError::Status { status } => format!(
                "The listings service rejected this search (error {status}). \
                 Try changing your filters."
            ),
            FetchError::Decode(_) => {
                "The listings service sent a response we couldn't read.".to_string()
            }
            FetchError::Timeout(_) => {
                "The listings service took too long to respond. Please try again.".to_string()
            }
            FetchError::Aborted(_) => {
                "Something went wrong while loading listings. Please try again.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            FetchError::Status { status: status.as_u16() }
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

// Anything that can produce a page of listings for a filter spec
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_page(
        &self,
        kind: ListingKind,
        filters: &FilterSpec,
        page: u32,
    ) -> Result<ListingPage, FetchError>;
}

// Search API client backed by the shared reqwest client
#[derive(Clone)]
pub struct ApiClient {
    http_client: Arc<Client>,
    base_url: String,
    page_size: u32,
    default_sort: String,
}

impl ApiClient {
    pub fn new(http_client: Arc<Client>, settings: &Settings) -> Self {
        ApiClient {
            http_client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            page_size: settings.page_size,
            default_sort: settings.default_sort.clone(),
        }
    }

    pub fn endpoint(&self, kind: ListingKind) -> String {
        format!("{}/{}", self.base_url, kind.as_str())
    }

    // Paging and sort first, then the renamed filters
    pub fn query_params(&self, filters: &FilterSpec, page: u32) -> Vec<(&'static str, String)> {
        let sort = filters
            .get(FilterKey::Sort)
            .unwrap_or(self.default_sort.as_str())
            .to_string();
        let mut params = vec![
            ("page", page.to_string()),
            ("size", self.page_size.to_string()),
            ("sort", sort),
        ];
        params.extend(
            filters
                .api_params()
                .into_iter()
                .map(|(name, value)| (name, value.to_string())),
        );
        params
    }
}

#[async_trait]
impl ListingSource for ApiClient {
    async fn fetch_page(
        &self,
        kind: ListingKind,
        filters: &FilterSpec,
        page: u32,
    ) -> Result<ListingPage, FetchError> {
        let url = self.endpoint(kind);
        let params = self.query_params(filters, page);
        tracing::debug!(%kind, page, url = %url, ?params, "Requesting listing page");

        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%kind, page, status = %status, "Listing API returned an error status");
            return Err(FetchError::Status { status: status.as_u16() });
        }

        let body = response.bytes().await?;
        let listing_page: ListingPage = serde_json::from_slice(&body).map_err(|e| {
            tracing::debug!(
                %kind,
                page,
                error = %e,
                body = %String::from_utf8_lossy(&body),
                "Failed to decode listing page"
            );
            FetchError::Decode(e.to_string())
        })?;

        tracing::debug!(
            %kind,
            page,
            items = listing_page.content.len(),
            total_pages = listing_page.total_pages,
            "Fetched listing page"
        );
        Ok(listing_page)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    // In-process stand-in for the listing search API.
    // Echoes the received query back in every item so tests can inspect it.
    async fn mock_search(
        Path(kind): Path<String>,
        Query(query): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        let page: i64 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
        let brand = query.get("brand").cloned().unwrap_or_else(|| "Toyota".to_string());
        match brand.as_str() {
            "Broken" => return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
            "Garbled" => return (StatusCode::OK, "<html>not json</html>").into_response(),
            "Nothing" => return Json(json!({ "content": [], "totalPages": 0 })).into_response(),
            _ => {}
        }
        let content: Vec<_> = (0..2)
            .map(|i| {
                json!({
                    "id": page * 100 + i,
                    "brand": brand,
                    "model": format!("Model {i}"),
                    "price": 1000 + i,
                    "location": "Mombasa",
                    "imageUrls": [format!("https://img.test/{kind}/{page}-{i}.jpg")],
                    "kind": kind,
                    "query": query,
                })
            })
            .collect();
        Json(json!({ "content": content, "totalPages": 3 })).into_response()
    }

    pub(crate) async fn spawn_mock_api() -> String {
        let app = Router::new().route("/api/:kind", get(mock_search));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn client_for(base_url: &str) -> ApiClient {
        ApiClient::new(Arc::new(Client::new()), &Settings::for_tests(base_url))
    }

    #[test]
    fn query_params_rename_filters_and_default_sort() {
        let client = client_for("http://localhost:8080/api/");
        let filters = FilterSpec::decode("brand=Toyota&minPrice=500&maxYear=2019");
        let params: HashMap<&str, String> = client.query_params(&filters, 2).into_iter().collect();

        assert_eq!(params["page"], "2");
        assert_eq!(params["size"], "12");
        assert_eq!(params["sort"], "createdAt,desc");
        assert_eq!(params["brand"], "Toyota");
        assert_eq!(params["price_gte"], "500");
        assert_eq!(params["year_lte"], "2019");
        assert!(!params.contains_key("minPrice"));
        assert_eq!(
            client.endpoint(ListingKind::Containers),
            "http://localhost:8080/api/containers"
        );
    }

    #[test]
    fn query_params_prefer_filter_sort() {
        let client = client_for("http://localhost:8080/api");
        let filters = FilterSpec::decode("sort=price,asc");
        let params: HashMap<&str, String> = client.query_params(&filters, 0).into_iter().collect();
        assert_eq!(params["sort"], "price,asc");
    }

    #[tokio::test]
    async fn fetch_page_sends_renamed_params() {
        let base = spawn_mock_api().await;
        let client = client_for(&base);
        let filters = FilterSpec::decode("brand=Honda&minMileage=10000&search=low+miles");

        let page = client.fetch_page(ListingKind::Motorcycles, &filters, 1).await.unwrap();

        assert_eq!(page.total_pages, 3);
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.content[0].id, 100);
        let echoed = &page.content[0].attributes["query"];
        assert_eq!(echoed["brand"], "Honda");
        assert_eq!(echoed["mileage_gte"], "10000");
        assert_eq!(echoed["search"], "low miles");
        assert_eq!(echoed["page"], "1");
        assert_eq!(page.content[0].attributes["kind"], "motorcycles");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let base = spawn_mock_api().await;
        let client = client_for(&base);
        let err = client
            .fetch_page(ListingKind::Vehicles, &FilterSpec::decode("brand=Broken"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500 }));
        assert!(err.user_message().contains("trouble"));
    }

    #[tokio::test]
    async fn undecodable_body_is_decode_error() {
        let base = spawn_mock_api().await;
        let client = client_for(&base);
        let err = client
            .fetch_page(ListingKind::Vehicles, &FilterSpec::decode("brand=Garbled"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_api_is_transport_error() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{addr}/api"));
        let err = client
            .fetch_page(ListingKind::Vehicles, &FilterSpec::new(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
