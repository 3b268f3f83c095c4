use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/ping", get(handlers::ping))
        .route("/update/{kind}/{name}/{value}", post(handlers::update_path))
        .route("/update/", post(handlers::update_body))
        .route("/updates/", post(handlers::updates))
        .route("/value/{kind}/{name}", get(handlers::value_path))
        .route("/value/", post(handlers::value_body))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
