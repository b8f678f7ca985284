use crate::ApiState;
use crate::error::{ApiError, Result};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use reaper_store::ExportEntry;
use std::sync::Arc;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// One `{"key": ..., "value": ...}` object per line, in key order.
pub fn to_ndjson(entries: &[ExportEntry]) -> std::result::Result<String, serde_json::Error> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&serde_json::to_string(entry)?);
        out.push('\n');
    }
    Ok(out)
}

#[utoipa::path(
    get,
    path = "/api/export-data",
    responses((status = OK, description = "Every store entry as newline-delimited JSON", content_type = "application/x-ndjson", body = String))
)]
pub async fn export_data(State(state): State<Arc<ApiState>>) -> Result<Response> {
    let entries = state.store.builds().export().await?;
    let body = to_ndjson(&entries).map_err(|e| ApiError::Export(e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)], body).into_response())
}
