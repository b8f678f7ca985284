mod error;
mod events;
mod export;

pub use error::{ApiError, Result};
pub use events::EventResponse;
pub use export::{NDJSON_CONTENT_TYPE, to_ndjson};

use axum::Router;
use reaper_engine::EventEnvelope;
use reaper_store::Store;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(info(
    title = "Reaper API",
    description = "Build retention and reaping service",
    license(name = "AGPL-3.0-or-later"),
))]
struct ApiDoc;

pub struct ApiState {
    pub store: Arc<Store>,
    pub event_tx: mpsc::Sender<EventEnvelope>,
}

#[utoipa::path(get, path = "/health", responses((status = OK, body = str)))]
async fn health() -> &'static str {
    "ok"
}

pub fn router(state: ApiState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(utoipa_axum::routes!(health))
        .routes(utoipa_axum::routes!(events::handle_event))
        .routes(utoipa_axum::routes!(export::export_data))
        .with_state(Arc::new(state))
        .split_for_parts();

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", api))
        .layer(TraceLayer::new_for_http())
}
