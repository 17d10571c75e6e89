// Library exports so integration tests can build the app in-process

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod forms;
pub mod routes;
pub mod state;
pub mod uploads;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::home::router())
        .merge(routes::recipes::router())
        .merge(routes::users::router())
        .merge(routes::admin::router())
        .route("/assets/{*path}", get(routes::assets::serve))
        .route("/media/{folder}/{file}", get(routes::assets::media))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
