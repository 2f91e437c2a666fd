use std::collections::BTreeMap;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::Connection;

use crate::access::{AccessList, PUBLIC_MARKER};
use crate::auth::handlers::record_best_effort;
use crate::db::models::{ActivityKind, Photo};
use crate::db::{comments, new_id, photos, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{parse_id, CurrentUser, EntityId};
use crate::state::AppState;
use crate::uploads;

/// Multipart field carrying the image bytes.
const PHOTO_FIELD: &str = "uploadedphoto";
/// Multipart field carrying the JSON access list.
const ACCESS_FIELD: &str = "access_list";

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/photosOfUser/{id}",
            get(photos_of_user).delete(delete_photo),
        )
        .route("/photos/new", post(upload_photo))
        .route("/photos/count", get(photo_counts))
        .route("/images/{file_name}", get(serve_image))
}

// --- Shared checks ---

pub(crate) fn require_user(conn: &Connection, id: &str) -> AppResult<()> {
    if users::exists(conn, id)? {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

/// Photos the viewer may not see are reported as missing.
pub(crate) fn require_visible(conn: &Connection, photo_id: &str, viewer_id: &str) -> AppResult<()> {
    match photos::access_list(conn, photo_id)? {
        Some(access) if access.permits(viewer_id) => Ok(()),
        _ => Err(AppError::NotFound),
    }
}

/// Keep only the photos `viewer_id` may see and fill in their comments.
pub(crate) fn visible_with_comments(
    conn: &Connection,
    photos: Vec<Photo>,
    viewer_id: &str,
) -> AppResult<Vec<Photo>> {
    let mut visible: Vec<Photo> = photos
        .into_iter()
        .filter(|p| p.access_list.permits(viewer_id))
        .collect();
    comments::attach(conn, &mut visible)?;
    Ok(visible)
}

/// Parse the `access_list` form field. Entries other than the public marker
/// must be user ids.
fn parse_access_field(text: &str) -> AppResult<Option<Vec<String>>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let entries: Vec<String> = serde_json::from_str(text)
        .map_err(|e| AppError::BadRequest(format!("Invalid access_list: {}", e)))?;
    entries
        .into_iter()
        .map(|entry| {
            if entry == PUBLIC_MARKER {
                Ok(entry)
            } else {
                parse_id(&entry)
            }
        })
        .collect::<AppResult<Vec<_>>>()
        .map(Some)
}

// --- Handlers ---

/// GET /photosOfUser/{id}: the user's photos visible to the caller
async fn photos_of_user(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(user_id): EntityId,
) -> AppResult<Json<Vec<Photo>>> {
    let conn = state.db.get()?;
    require_user(&conn, &user_id)?;

    let owned = photos::list_for_owner(&conn, &user_id)?;
    let visible = visible_with_comments(&conn, owned, current.id())?;
    Ok(Json(visible))
}

/// POST /photos/new: multipart upload with an optional access list
async fn upload_photo(
    State(state): State<AppState>,
    current: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut upload = None;
    let mut requested_access = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(PHOTO_FIELD) => {
                let original_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                upload = Some((original_name, bytes));
            }
            Some(ACCESS_FIELD) => {
                let text = field.text().await?;
                requested_access = parse_access_field(&text)?;
            }
            _ => {}
        }
    }

    let (original_name, bytes) = upload
        .ok_or_else(|| AppError::BadRequest(format!("Missing {} file", PHOTO_FIELD)))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }

    let photo_id = new_id();
    let file_name = uploads::stored_name(&photo_id, original_name.as_deref())?;
    let access_list = AccessList::for_owner(current.id(), requested_access);

    let uploads_dir = state.config.uploads_path();
    uploads::save(&uploads_dir, &file_name, &bytes).await?;

    let inserted = match state.db.get() {
        Ok(mut conn) => {
            photos::insert(&mut conn, &photo_id, current.id(), &file_name, &access_list)
                .map_err(AppError::from)
        }
        Err(e) => Err(AppError::from(e)),
    };
    let photo = match inserted {
        Ok(photo) => photo,
        Err(e) => {
            // The row never landed, so the file must not outlive it
            uploads::remove_all(&uploads_dir, [&file_name]).await;
            return Err(e);
        }
    };

    {
        let conn = state.db.get()?;
        record_best_effort(
            &conn,
            ActivityKind::PhotoUpload,
            current.id(),
            Some(&photo.id),
            None,
        );
    }
    tracing::info!(
        "{} uploaded {} ({} bytes, public: {})",
        current.id(),
        file_name,
        bytes.len(),
        photo.access_list.is_public()
    );

    Ok((StatusCode::CREATED, Json(photo)).into_response())
}

/// DELETE /photosOfUser/{id}: `id` is the photo; owner only
async fn delete_photo(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(photo_id): EntityId,
) -> AppResult<StatusCode> {
    let file_name = {
        let mut conn = state.db.get()?;
        let photo = photos::find(&conn, &photo_id)?.ok_or(AppError::NotFound)?;
        if photo.user_id != current.id() {
            return Err(AppError::Forbidden);
        }
        photos::delete_cascade(&mut conn, &photo_id)?.ok_or(AppError::NotFound)?
    };

    uploads::remove_all(&state.config.uploads_path(), [&file_name]).await;
    tracing::info!("{} deleted photo {}", current.id(), photo_id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /photos/count: number of visible photos per user
async fn photo_counts(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<BTreeMap<String, usize>>> {
    let conn = state.db.get()?;
    let mut counts: BTreeMap<String, usize> = users::list(&conn)?
        .into_iter()
        .map(|u| (u.id, 0))
        .collect();

    for (owner_id, access) in photos::access_index(&conn)?.into_values() {
        if access.permits(current.id()) {
            *counts.entry(owner_id).or_default() += 1;
        }
    }
    Ok(Json(counts))
}

/// GET /images/{file_name}: stored photo bytes, if visible to the caller
async fn serve_image(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(file_name): Path<String>,
) -> AppResult<Response> {
    {
        let conn = state.db.get()?;
        let access = photos::access_for_file(&conn, &file_name)?.ok_or(AppError::NotFound)?;
        if !access.permits(current.id()) {
            return Err(AppError::NotFound);
        }
    }

    let bytes = uploads::read(&state.config.uploads_path(), &file_name).await?;
    let mime = mime_guess::from_path(&file_name).first_or_octet_stream();

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.to_string())],
        bytes,
    )
        .into_response())
}
