use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::auth::handlers::clear_session_cookie;
use crate::db::models::{ProfileUpdate, UserDetail, UserSummary};
use crate::db::{photos, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, EntityId};
use crate::state::AppState;
use crate::uploads;

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/list", get(list_users))
        .route(
            "/user/{id}",
            get(user_detail).put(update_user).delete(delete_user),
        )
}

// --- Handlers ---

/// GET /user/list
async fn list_users(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> AppResult<Json<Vec<UserSummary>>> {
    let conn = state.db.get()?;
    Ok(Json(users::list(&conn)?))
}

/// GET /user/{id}: profile; favorite and liked ids are limited to photos
/// the caller can see
async fn user_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(user_id): EntityId,
) -> AppResult<Json<UserDetail>> {
    let conn = state.db.get()?;
    let mut detail = users::detail(&conn, &user_id)?.ok_or(AppError::NotFound)?;

    if detail.id != current.id() {
        let index = photos::access_index(&conn)?;
        let visible = |photo_id: &String| {
            index
                .get(photo_id)
                .is_some_and(|(_, access)| access.permits(current.id()))
        };
        detail.favorites.retain(&visible);
        detail.liked.retain(&visible);
    }
    Ok(Json(detail))
}

/// PUT /user/{id}: self only
async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(user_id): EntityId,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<UserDetail>> {
    if user_id != current.id() {
        return Err(AppError::Forbidden);
    }
    for (field, value) in [
        ("first_name", &update.first_name),
        ("last_name", &update.last_name),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(AppError::BadRequest(format!("{} cannot be empty", field)));
        }
    }

    let conn = state.db.get()?;
    if !users::update_profile(&conn, &user_id, &update)? {
        return Err(AppError::NotFound);
    }
    let detail = users::detail(&conn, &user_id)?.ok_or(AppError::NotFound)?;
    Ok(Json(detail))
}

/// DELETE /user/{id}: self only; removes the account and everything it owns
async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(user_id): EntityId,
) -> AppResult<Response> {
    if user_id != current.id() {
        return Err(AppError::Forbidden);
    }

    let file_names = {
        let mut conn = state.db.get()?;
        users::delete_cascade(&mut conn, &user_id)?.ok_or(AppError::NotFound)?
    };

    uploads::remove_all(&state.config.uploads_path(), &file_names).await;
    tracing::info!(
        "Deleted user {} and {} photo(s)",
        user_id,
        file_names.len()
    );

    Ok((
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )],
    )
        .into_response())
}
