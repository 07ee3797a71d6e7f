// Application error type and its conversion into HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::listing::FetchError;

#[derive(Debug)]
pub enum AppError {
    InternalServerError(anyhow::Error),
    NotFound(String),
    // The listing search API failed; the message is safe to show
    Upstream(FetchError),
}

// Implement conversion from anyhow::Error for easier error propagation
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::InternalServerError(error)
    }
}

impl From<FetchError> for AppError {
    fn from(error: FetchError) -> Self {
        AppError::Upstream(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(e) => {
                // Log the detailed error here
                tracing::error!("Internal server error: {:?}", e);
                // Don't expose internal details to the client
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::NotFound(what) => {
                tracing::debug!("Not found: {}", what);
                (StatusCode::NOT_FOUND, format!("Not found: {what}"))
            }
            AppError::Upstream(e) => {
                tracing::warn!(error = %e, "Listing API failure");
                (StatusCode::BAD_GATEWAY, e.user_message())
            }
        };

        (status, error_message).into_response()
    }
}

// Define a custom Result type using our AppError
pub type AppResult<T> = Result<T, AppError>;
