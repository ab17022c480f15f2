//! Route modules for Slide Render Server

pub mod convert;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::require_api_key;
use crate::state::AppState;

/// Build the application router.
///
/// The API key check wraps only the conversion routes; `/health` stays open.
pub fn router(state: AppState) -> Router {
    let max_upload = state.config().server.max_upload_bytes;

    let conversion = Router::new()
        .route("/convert/", post(convert::convert_presentation))
        .route("/convert", post(convert::convert_presentation))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(DefaultBodyLimit::max(max_upload));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(conversion)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
