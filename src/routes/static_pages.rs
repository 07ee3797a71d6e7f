use askama::Template;
use axum::response::{Html, IntoResponse};

use crate::error::AppError; // Use our custom error type
use crate::models::ListingKind;

pub struct KindLink {
    pub title: &'static str,
    pub href: String,
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    kinds: Vec<KindLink>,
}

// Handler function to render the landing page
pub async fn landing_page() -> Result<impl IntoResponse, AppError> {
    let template = LandingTemplate {
        kinds: ListingKind::ALL
            .into_iter()
            .map(|kind| KindLink {
                title: kind.title(),
                href: super::listings::listing_href(kind, ""),
            })
            .collect(),
    };
    match template.render() {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            tracing::error!("Failed to render landing template: {}", e);
            // Convert Askama error into our AppError
            Err(AppError::InternalServerError(anyhow::Error::new(e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn landing_links_every_listing_kind() {
        let response = landing_page().await.unwrap().into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        for kind in ListingKind::ALL {
            assert!(html.contains(&format!("/listings/{kind}")));
        }
    }
}
