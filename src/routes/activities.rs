use std::collections::HashMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::db::models::Activity;
use crate::db::{activities, photos};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/activities", get(recent_activities))
}

/// GET /activities: the latest entries, with photos the caller cannot see
/// stripped from them
async fn recent_activities(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<Activity>>> {
    let conn = state.db.get()?;
    let mut feed = activities::recent(&conn, state.config.feed.limit)?;

    let mut visibility: HashMap<String, bool> = HashMap::new();
    for activity in feed.iter_mut() {
        let Some(photo_id) = activity.photo.as_ref().map(|p| p.id.clone()) else {
            continue;
        };
        let visible = match visibility.get(&photo_id) {
            Some(visible) => *visible,
            None => {
                let visible = photos::access_list(&conn, &photo_id)?
                    .is_some_and(|access| access.permits(current.id()));
                visibility.insert(photo_id, visible);
                visible
            }
        };
        if !visible {
            activity.photo = None;
            activity.comment = None;
        }
    }
    Ok(Json(feed))
}
