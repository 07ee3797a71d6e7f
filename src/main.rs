use anyhow::{Context, Result};
use axum::{extract::FromRef, Router};
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;
use crate::listing::{ApiClient, ListingSource};

// Declare modules
mod config;
mod error;
mod listing;
mod models;
mod routes;

// Shared state handed to every handler
#[derive(Clone, FromRef)]
struct AppState {
    settings: Arc<Settings>,
    listing_source: Arc<dyn ListingSource>,
}

fn build_http_client(settings: &Settings) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
    if let Some(proxy_url) = settings.proxy_url.as_deref().filter(|p| !p.is_empty()) {
        let proxy = reqwest::Proxy::all(proxy_url)
            .with_context(|| format!("Invalid proxy_url '{}'", proxy_url))?;
        builder = builder.proxy(proxy);
        tracing::info!("Routing listing API requests through configured proxy.");
    }
    builder.build().context("Failed to build shared reqwest client")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "export_listings=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing export listings frontend...");

    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!(
                api_base_url = %s.api_base_url,
                page_size = s.page_size,
                "Configuration loaded successfully."
            );
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };
    let shared_settings = Arc::new(settings);

    let http_client = Arc::new(build_http_client(&shared_settings)?);
    let listing_source: Arc<dyn ListingSource> =
        Arc::new(ApiClient::new(http_client, &shared_settings));
    tracing::info!("Listing API client created.");

    let app_state = AppState {
        settings: shared_settings.clone(),
        listing_source,
    };

    let router: Router = routes::create_router(app_state);
    let app = router.nest_service("/static", ServeDir::new("static"));

    let addr: SocketAddr = shared_settings
        .server_address
        .parse()
        .with_context(|| {
            format!("Invalid server address format: {}", shared_settings.server_address)
        })?;

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            tracing::info!("Server listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
