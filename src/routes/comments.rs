use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::handlers::record_best_effort;
use crate::db::models::{ActivityKind, AuthoredComment, Comment};
use crate::db::{comments, new_id, photos, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, EntityId};
use crate::mentions::parse_mentions;
use crate::routes::photos::{require_user, require_visible};
use crate::state::AppState;

const MAX_COMMENT_CHARS: usize = 1000;

// --- Forms ---

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub comment: String,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/commentsOfPhoto/{photo_id}", post(create_comment))
        .route("/commentOfUser/{id}", delete(delete_comment))
        .route("/commentsOfUser/{id}", get(comments_of_user))
        .route("/comments/count", get(comment_counts))
}

/// The photo can be deleted between the visibility check and the insert; the
/// foreign key then rejects the comment.
fn photo_gone_as_not_found(e: rusqlite::Error) -> AppError {
    match e {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::NotFound
        }
        other => other.into(),
    }
}

// --- Handlers ---

/// POST /commentsOfPhoto/{photo_id}
async fn create_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(photo_id): EntityId,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Response> {
    let body = req.comment.trim().to_string();
    if body.is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".into()));
    }
    if body.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Comment must be {} characters or less",
            MAX_COMMENT_CHARS
        )));
    }

    let mut conn = state.db.get()?;
    require_visible(&conn, &photo_id, current.id())?;

    let mentions = parse_mentions(&body);
    let comment_id = new_id();
    let date_time = comments::insert(
        &mut conn,
        &comment_id,
        &photo_id,
        current.id(),
        &body,
        &mentions,
    )
    .map_err(photo_gone_as_not_found)?;

    record_best_effort(
        &conn,
        ActivityKind::CommentAdded,
        current.id(),
        Some(&photo_id),
        Some(&comment_id),
    );

    let comment = Comment {
        id: comment_id,
        comment: body,
        date_time,
        user: Some(current.user),
        mentions,
    };
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

/// DELETE /commentOfUser/{id}: `id` is the comment; author or photo owner
async fn delete_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(comment_id): EntityId,
) -> AppResult<StatusCode> {
    let mut conn = state.db.get()?;
    let ownership = comments::ownership(&conn, &comment_id)?.ok_or(AppError::NotFound)?;

    if ownership.author_id != current.id() && ownership.photo_owner_id != current.id() {
        return Err(AppError::Forbidden);
    }

    if !comments::delete(&mut conn, &comment_id)? {
        return Err(AppError::NotFound);
    }
    tracing::info!(
        "{} deleted comment {} on photo {}",
        current.id(),
        comment_id,
        ownership.photo_id
    );
    Ok(StatusCode::NO_CONTENT)
}

/// GET /commentsOfUser/{id}: comments the user wrote on photos visible to the caller
async fn comments_of_user(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(author_id): EntityId,
) -> AppResult<Json<Vec<AuthoredComment>>> {
    let conn = state.db.get()?;
    require_user(&conn, &author_id)?;

    let index = photos::access_index(&conn)?;
    let visible = comments::list_by_author(&conn, &author_id)?
        .into_iter()
        .filter(|c| {
            index
                .get(&c.photo_id)
                .is_some_and(|(_, access)| access.permits(current.id()))
        })
        .collect();
    Ok(Json(visible))
}

/// GET /comments/count: number of comments per author on photos visible to the caller
async fn comment_counts(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<BTreeMap<String, usize>>> {
    let conn = state.db.get()?;
    let mut counts: BTreeMap<String, usize> = users::list(&conn)?
        .into_iter()
        .map(|u| (u.id, 0))
        .collect();

    let index = photos::access_index(&conn)?;
    for (author_id, photo_id) in comments::authorship(&conn)? {
        let visible = index
            .get(&photo_id)
            .is_some_and(|(_, access)| access.permits(current.id()));
        if visible {
            *counts.entry(author_id).or_default() += 1;
        }
    }
    Ok(Json(counts))
}
