use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::context::GatewayContext;

/// Маршруты шлюза: `GET /ping` и `POST /publish`.
pub fn build_router(ctx: Arc<GatewayContext>) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/publish", post(handlers::publish))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
