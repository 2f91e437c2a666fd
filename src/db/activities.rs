//! Append-only activity log.

use rusqlite::{params, Connection, ToSql};

use crate::db::models::{Activity, ActivityKind, CommentRef, PhotoRef, UserSummary};
use crate::db::{new_id, placeholders, timestamp};

/// Append an activity row. Returns its id.
pub fn record(
    conn: &Connection,
    kind: ActivityKind,
    user_id: &str,
    photo_id: Option<&str>,
    comment_id: Option<&str>,
) -> rusqlite::Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO activities (id, kind, user_id, photo_id, comment_id, date_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, kind.as_str(), user_id, photo_id, comment_id, timestamp()],
    )?;
    Ok(id)
}

/// The `limit` most recent activities, newest first, with actor, photo and
/// comment references resolved. References whose rows are gone come back as
/// `None`. Rows with an unknown kind are excluded before the limit applies.
pub fn recent(conn: &Connection, limit: u32) -> rusqlite::Result<Vec<Activity>> {
    let kinds: Vec<&str> = ActivityKind::ALL.iter().map(|k| k.as_str()).collect();
    let sql = format!(
        "SELECT a.id, a.kind, a.date_time, a.user_id,
                u.id, u.first_name, u.last_name,
                p.id, p.file_name,
                c.id, c.body
         FROM activities a
         LEFT JOIN users u ON u.id = a.user_id
         LEFT JOIN photos p ON p.id = a.photo_id
         LEFT JOIN comments c ON c.id = a.comment_id
         WHERE a.kind IN ({})
         ORDER BY a.date_time DESC, a.id DESC
         LIMIT ?{}",
        placeholders(kinds.len()),
        kinds.len() + 1
    );
    let mut args: Vec<&dyn ToSql> = kinds.iter().map(|k| k as &dyn ToSql).collect();
    args.push(&limit);

    let mut stmt = conn.prepare(&sql)?;
    let activities = stmt
        .query_map(args.as_slice(), |row| {
            let user = match row.get::<_, Option<String>>(4)? {
                Some(id) => Some(UserSummary {
                    id,
                    first_name: row.get(5)?,
                    last_name: row.get(6)?,
                }),
                None => None,
            };
            let photo = match row.get::<_, Option<String>>(7)? {
                Some(id) => Some(PhotoRef {
                    id,
                    file_name: row.get(8)?,
                }),
                None => None,
            };
            let comment = match row.get::<_, Option<String>>(9)? {
                Some(id) => Some(CommentRef {
                    id,
                    comment: row.get(10)?,
                }),
                None => None,
            };
            Ok(Activity {
                id: row.get(0)?,
                kind: row.get(1)?,
                date_time: row.get(2)?,
                user_id: row.get(3)?,
                user,
                photo,
                comment,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(activities)
}
