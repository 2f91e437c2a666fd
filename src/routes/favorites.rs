use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::db::models::Photo;
use crate::db::{engagement, photos};
use crate::error::AppResult;
use crate::extractors::{CurrentUser, EntityId};
use crate::routes::photos::{require_visible, visible_with_comments};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct Favorites {
    pub favorites: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeStatus {
    pub photo_id: String,
    pub likes: i64,
    pub liked: bool,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites))
        .route("/favouriteOfUser/{photo_id}", post(add_favorite))
        .route("/removeFavorite/{photo_id}", post(remove_favorite))
        .route("/likePhoto/{photo_id}", post(like_photo))
        .route("/unlikePhoto/{photo_id}", post(unlike_photo))
}

// --- Handlers ---

/// GET /favorites: the caller's favorited photos that are still visible
async fn list_favorites(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<Photo>>> {
    let conn = state.db.get()?;
    let ids = engagement::favorite_ids(&conn, current.id())?;
    let favorites = photos::list_by_ids(&conn, &ids)?;
    Ok(Json(visible_with_comments(&conn, favorites, current.id())?))
}

/// POST /favouriteOfUser/{photo_id}
async fn add_favorite(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(photo_id): EntityId,
) -> AppResult<Json<Favorites>> {
    let conn = state.db.get()?;
    require_visible(&conn, &photo_id, current.id())?;
    engagement::add_favorite(&conn, current.id(), &photo_id)?;

    Ok(Json(Favorites {
        favorites: engagement::favorite_ids(&conn, current.id())?,
    }))
}

/// POST /removeFavorite/{photo_id}
async fn remove_favorite(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(photo_id): EntityId,
) -> AppResult<Json<Favorites>> {
    let conn = state.db.get()?;
    engagement::remove_favorite(&conn, current.id(), &photo_id)?;

    Ok(Json(Favorites {
        favorites: engagement::favorite_ids(&conn, current.id())?,
    }))
}

fn like_status(conn: &rusqlite::Connection, user_id: &str, photo_id: String) -> AppResult<LikeStatus> {
    Ok(LikeStatus {
        likes: engagement::like_count(conn, &photo_id)?,
        liked: engagement::has_liked(conn, user_id, &photo_id)?,
        photo_id,
    })
}

/// POST /likePhoto/{photo_id}
async fn like_photo(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(photo_id): EntityId,
) -> AppResult<Json<LikeStatus>> {
    let conn = state.db.get()?;
    require_visible(&conn, &photo_id, current.id())?;
    engagement::like(&conn, current.id(), &photo_id)?;
    Ok(Json(like_status(&conn, current.id(), photo_id)?))
}

/// POST /unlikePhoto/{photo_id}
async fn unlike_photo(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(photo_id): EntityId,
) -> AppResult<Json<LikeStatus>> {
    let conn = state.db.get()?;
    require_visible(&conn, &photo_id, current.id())?;
    engagement::unlike(&conn, current.id(), &photo_id)?;
    Ok(Json(like_status(&conn, current.id(), photo_id)?))
}
