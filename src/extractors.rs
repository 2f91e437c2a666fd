use axum::extract::{FromRequestParts, Path};
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::session;
use crate::db::models::UserSummary;
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserSummary,
    pub session_token: String,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session found.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(parts, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?
            .to_string();

        let conn = state.db.get()?;
        let user = session::find_user(&conn, &token)?.ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser {
            user,
            session_token: token,
        })
    }
}

/// A single entity id taken from the request path.
/// Anything that is not a uuid is rejected with 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityId(pub String);

impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::BadRequest("Missing id".into()))?;

        parse_id(&raw).map(EntityId)
    }
}

/// Normalize a uuid string, rejecting anything malformed.
pub fn parse_id(raw: &str) -> Result<String, AppError> {
    uuid::Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| AppError::BadRequest(format!("Malformed id: {}", raw)))
}

pub(crate) fn extract_session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(cookie: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(header::COOKIE, cookie)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn finds_named_cookie_among_others() {
        let parts = parts_with_cookie("theme=dark; photoshare_session=abc123; lang=en");
        assert_eq!(
            extract_session_token(&parts, "photoshare_session"),
            Some("abc123")
        );
    }

    #[test]
    fn missing_or_empty_cookie_is_none() {
        let parts = parts_with_cookie("theme=dark");
        assert_eq!(extract_session_token(&parts, "photoshare_session"), None);
        let parts = parts_with_cookie("photoshare_session=");
        assert_eq!(extract_session_token(&parts, "photoshare_session"), None);
    }

    #[test]
    fn parse_id_accepts_uuid() {
        let id = uuid::Uuid::now_v7().to_string();
        assert_eq!(parse_id(&id).unwrap(), id);
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(matches!(parse_id("not-an-id"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_id(""), Err(AppError::BadRequest(_))));
    }
}
