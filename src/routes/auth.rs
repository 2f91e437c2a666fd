use axum::routing::{get, post};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user", post(handlers::register))
        .route("/admin/login", post(handlers::login))
        .route("/admin/logout", post(handlers::logout))
        .route("/admin/check-session", get(handlers::check_session))
}
