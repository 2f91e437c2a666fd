pub mod activities;
pub mod auth;
pub mod comments;
pub mod engagement;
pub mod favorites;
pub mod photos;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full API with state and middleware applied.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(photos::router())
        .merge(comments::router())
        .merge(engagement::router())
        .merge(favorites::router())
        .merge(activities::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
