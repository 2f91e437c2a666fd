use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{password, session};
use crate::db::models::{ActivityKind, NewUser, UserSummary};
use crate::db::{activities, new_id, users};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct LoginRequest {
    pub login_name: String,
    pub password: String,
}

// -- Cookie helpers --

pub(crate) fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

pub(crate) fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

/// Log an activity without failing the request it belongs to.
pub(crate) fn record_best_effort(
    conn: &rusqlite::Connection,
    kind: ActivityKind,
    user_id: &str,
    photo_id: Option<&str>,
    comment_id: Option<&str>,
) {
    if let Err(e) = activities::record(conn, kind, user_id, photo_id, comment_id) {
        tracing::warn!("Failed to record {} activity for {}: {}", kind.as_str(), user_id, e);
    }
}

async fn hash_blocking(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

async fn verify_blocking(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verify task failed: {}", e)))
}

fn open_session(state: &AppState, conn: &rusqlite::Connection, user: UserSummary) -> AppResult<Response> {
    let hours = state.config.auth.session_hours;
    let token = session::create_session(conn, &user.id, hours)?;
    let cookie = session_cookie(&state.config.auth.cookie_name, &token, hours);
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(user)).into_response())
}

// -- Handlers --

/// POST /user: register a new account and log it in
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<NewUser>,
) -> AppResult<Response> {
    for (field, value) in [
        ("login_name", &req.login_name),
        ("password", &req.password),
        ("first_name", &req.first_name),
        ("last_name", &req.last_name),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{} is required", field)));
        }
    }

    {
        let conn = state.db.get()?;
        if users::login_exists(&conn, &req.login_name)? {
            return Err(AppError::BadRequest(format!(
                "Login name {} is already taken",
                req.login_name.trim()
            )));
        }
    }

    let password_hash = hash_blocking(req.password.clone(), state.config.auth.bcrypt_cost).await?;

    let id = new_id();
    let conn = state.db.get()?;
    match users::insert(&conn, &id, &req, &password_hash) {
        Ok(()) => {}
        // Lost a race with a concurrent registration of the same name
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            return Err(AppError::BadRequest(format!(
                "Login name {} is already taken",
                req.login_name.trim()
            )));
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!("Registered user {} ({})", req.login_name.trim(), id);

    record_best_effort(&conn, ActivityKind::UserRegistered, &id, None, None);

    let user = users::summary(&conn, &id)?.ok_or(AppError::NotFound)?;
    open_session(&state, &conn, user)
}

/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let credentials = {
        let conn = state.db.get()?;
        users::find_credentials(&conn, &req.login_name)?
    };

    let Some((user, hash)) = credentials else {
        tracing::info!("Login failed: unknown login name {}", req.login_name.trim());
        return Err(AppError::Unauthorized);
    };

    if !verify_blocking(req.password, hash).await? {
        tracing::info!("Login failed: wrong password for {}", user.id);
        return Err(AppError::Unauthorized);
    }

    let conn = state.db.get()?;
    record_best_effort(&conn, ActivityKind::UserLogin, &user.id, None, None);
    tracing::info!("{} logged in", user.display_name());
    open_session(&state, &conn, user)
}

/// POST /admin/logout
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;

    // The activity row is written first and is not transactional with the
    // session destroy
    record_best_effort(&conn, ActivityKind::UserLogout, current.id(), None, None);
    session::delete_session(&conn, &current.session_token)?;

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )],
        Json(json!({ "logged_out": true })),
    )
        .into_response())
}

/// GET /admin/check-session
pub async fn check_session(current: CurrentUser) -> Json<UserSummary> {
    Json(current.user)
}
