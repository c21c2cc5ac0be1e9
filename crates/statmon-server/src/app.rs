use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;
use crate::{api, middleware};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(api::index))
        .route("/ping", get(api::ping))
        .route("/update/{kind}/{name}/{value}", post(api::update_path))
        .route("/update/", post(api::update_json))
        .route("/updates/", post(api::updates_json))
        .route("/value/", post(api::value_json))
        .route("/value/{kind}/{name}", get(api::value_path))
        .layer(from_fn_with_state(state.clone(), middleware::exchange))
        .layer(cors)
        .layer(from_fn(middleware::request_logging))
        .with_state(state)
}
