//! Per-user photo highlights and the mentions index.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::models::{Photo, UserSummary};
use crate::db::{comments, photos, users};
use crate::error::AppResult;
use crate::extractors::{CurrentUser, EntityId};
use crate::routes::photos::{require_user, visible_with_comments};
use crate::state::AppState;

/// Body returned when the caller can see none of the user's photos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoVisiblePhoto {
    #[serde(rename = "_id")]
    pub id: i64,
    pub user_id: i64,
}

impl Default for NoVisiblePhoto {
    fn default() -> Self {
        Self { id: -1, user_id: -1 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentedPhoto {
    #[serde(flatten)]
    pub photo: Photo,
    pub comment_count: usize,
}

/// Either a visible photo or the `{_id: -1, user_id: -1}` sentinel.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Highlight<T> {
    Photo(T),
    Hidden(NoVisiblePhoto),
}

impl<T> From<Option<T>> for Highlight<T> {
    fn from(photo: Option<T>) -> Self {
        match photo {
            Some(photo) => Highlight::Photo(photo),
            None => Highlight::Hidden(NoVisiblePhoto::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MentionedPhoto {
    #[serde(rename = "_id")]
    pub id: String,
    pub file_name: String,
    pub date_time: String,
    pub owner: Option<UserSummary>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/latestPhotoOfUser/{id}", get(latest_photo))
        .route("/mostCommentedPhotoOfUser/{id}", get(most_commented_photo))
        .route("/mentionsOfUser/{id}", get(mentions_of_user))
}

// --- Selection ---

/// Most recent photo by upload time, ties broken by id.
pub fn pick_latest(photos: Vec<Photo>) -> Option<Photo> {
    photos
        .into_iter()
        .max_by(|a, b| a.date_time.cmp(&b.date_time).then(a.id.cmp(&b.id)))
}

/// Photo with the most comments; the earliest photo wins a tie.
pub fn pick_most_commented(photos: Vec<Photo>) -> Option<CommentedPhoto> {
    let mut best: Option<Photo> = None;
    for photo in photos {
        let better = match &best {
            None => true,
            Some(current) => {
                photo.comments.len() > current.comments.len()
                    || (photo.comments.len() == current.comments.len() && photo.id < current.id)
            }
        };
        if better {
            best = Some(photo);
        }
    }
    best.map(|photo| CommentedPhoto {
        comment_count: photo.comments.len(),
        photo,
    })
}

// --- Handlers ---

/// GET /latestPhotoOfUser/{id}
async fn latest_photo(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(user_id): EntityId,
) -> AppResult<Json<Highlight<Photo>>> {
    let conn = state.db.get()?;
    require_user(&conn, &user_id)?;

    let owned = photos::list_for_owner(&conn, &user_id)?;
    let visible = visible_with_comments(&conn, owned, current.id())?;
    Ok(Json(pick_latest(visible).into()))
}

/// GET /mostCommentedPhotoOfUser/{id}
async fn most_commented_photo(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(user_id): EntityId,
) -> AppResult<Json<Highlight<CommentedPhoto>>> {
    let conn = state.db.get()?;
    require_user(&conn, &user_id)?;

    let owned = photos::list_for_owner(&conn, &user_id)?;
    let visible = visible_with_comments(&conn, owned, current.id())?;
    Ok(Json(pick_most_commented(visible).into()))
}

/// GET /mentionsOfUser/{id}: photos whose comments mention the user
async fn mentions_of_user(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(user_id): EntityId,
) -> AppResult<Json<Vec<MentionedPhoto>>> {
    let conn = state.db.get()?;
    require_user(&conn, &user_id)?;

    let ids = comments::photo_ids_mentioning(&conn, &user_id)?;
    let mut mentioned = Vec::new();
    for photo in photos::list_by_ids(&conn, &ids)? {
        if !photo.access_list.permits(current.id()) {
            continue;
        }
        mentioned.push(MentionedPhoto {
            owner: users::summary(&conn, &photo.user_id)?,
            id: photo.id,
            file_name: photo.file_name,
            date_time: photo.date_time,
        });
    }
    Ok(Json(mentioned))
}
