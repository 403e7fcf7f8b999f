//! API route modules.

pub mod health;
pub mod monitoring;

use std::path::Path;

use axum::Router;
use axum::http::{HeaderValue, header};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::server::AppState;

/// Create the application router: monitoring routes, health, and static
/// assets from `frontend_dir` for every other path.
///
/// Every response carries `Cache-Control: no-store` so browsers always see
/// fresh monitoring data and assets.
pub fn create_router(state: AppState, frontend_dir: &Path) -> Router {
    Router::new()
        .merge(monitoring::router())
        .nest("/health", health::router())
        .fallback_service(ServeDir::new(frontend_dir))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
