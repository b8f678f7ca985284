use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("event consumer unavailable")]
    ConsumerUnavailable,

    #[error("storage fault, redeliver: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to encode export: {0}")]
    Export(String),

    #[error(transparent)]
    Store(#[from] reaper_store::StoreError),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::ConsumerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
