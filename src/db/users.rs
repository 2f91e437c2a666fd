use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{NewUser, ProfileUpdate, UserDetail, UserSummary};
use crate::db::{engagement, timestamp};

fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserSummary> {
    Ok(UserSummary {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
    })
}

pub fn insert(
    conn: &Connection,
    id: &str,
    user: &NewUser,
    password_hash: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, login_name, password_hash, first_name, last_name,
                            location, description, occupation, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            user.login_name.trim(),
            password_hash,
            user.first_name.trim(),
            user.last_name.trim(),
            user.location,
            user.description,
            user.occupation,
            timestamp(),
        ],
    )?;
    Ok(())
}

pub fn login_exists(conn: &Connection, login_name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE login_name = ?1",
        params![login_name.trim()],
        |row| row.get(0),
    )
}

/// Look up a user by login name, returning the summary and stored password hash.
pub fn find_credentials(
    conn: &Connection,
    login_name: &str,
) -> rusqlite::Result<Option<(UserSummary, String)>> {
    conn.query_row(
        "SELECT id, first_name, last_name, password_hash FROM users WHERE login_name = ?1",
        params![login_name.trim()],
        |row| Ok((summary_from_row(row)?, row.get(3)?)),
    )
    .optional()
}

pub fn exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

pub fn summary(conn: &Connection, id: &str) -> rusqlite::Result<Option<UserSummary>> {
    conn.query_row(
        "SELECT id, first_name, last_name FROM users WHERE id = ?1",
        params![id],
        summary_from_row,
    )
    .optional()
}

pub fn list(conn: &Connection) -> rusqlite::Result<Vec<UserSummary>> {
    let mut stmt = conn.prepare("SELECT id, first_name, last_name FROM users ORDER BY id ASC")?;
    let users = stmt
        .query_map([], summary_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

pub fn detail(conn: &Connection, id: &str) -> rusqlite::Result<Option<UserDetail>> {
    let user = conn
        .query_row(
            "SELECT id, login_name, first_name, last_name, location, description, occupation
             FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(UserDetail {
                    id: row.get(0)?,
                    login_name: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                    location: row.get(4)?,
                    description: row.get(5)?,
                    occupation: row.get(6)?,
                    favorites: Vec::new(),
                    liked: Vec::new(),
                })
            },
        )
        .optional()?;

    match user {
        Some(mut user) => {
            user.favorites = engagement::favorite_ids(conn, &user.id)?;
            user.liked = engagement::liked_ids(conn, &user.id)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

/// Apply the provided fields; returns false when the user does not exist.
pub fn update_profile(
    conn: &Connection,
    id: &str,
    update: &ProfileUpdate,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET
            first_name = COALESCE(?2, first_name),
            last_name = COALESCE(?3, last_name),
            location = COALESCE(?4, location),
            description = COALESCE(?5, description),
            occupation = COALESCE(?6, occupation)
         WHERE id = ?1",
        params![
            id,
            update.first_name.as_deref().map(str::trim),
            update.last_name.as_deref().map(str::trim),
            update.location,
            update.description,
            update.occupation,
        ],
    )?;
    Ok(changed > 0)
}

/// Delete a user and everything hanging off them in one transaction.
///
/// Removes the user's photos (with their comments, likes, favorites and
/// viewer rows), comments the user wrote on other photos, the user's
/// favorites, likes and sessions, their entries in other photos' access
/// lists, and every activity row referencing any of these. Returns the file
/// names of the deleted photos so the caller can remove them from disk, or
/// `None` when the user does not exist.
pub fn delete_cascade(conn: &mut Connection, id: &str) -> rusqlite::Result<Option<Vec<String>>> {
    let tx = conn.transaction()?;

    let found: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if !found {
        return Ok(None);
    }

    let file_names = {
        let mut stmt = tx.prepare("SELECT file_name FROM photos WHERE user_id = ?1")?;
        let names = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        names
    };

    tx.execute(
        "DELETE FROM activities
         WHERE user_id = ?1
            OR photo_id IN (SELECT id FROM photos WHERE user_id = ?1)
            OR comment_id IN (SELECT id FROM comments WHERE user_id = ?1)
            OR comment_id IN (SELECT c.id FROM comments c
                              JOIN photos p ON p.id = c.photo_id
                              WHERE p.user_id = ?1)",
        params![id],
    )?;
    tx.execute("DELETE FROM comments WHERE user_id = ?1", params![id])?;
    tx.execute("DELETE FROM photo_viewers WHERE user_id = ?1", params![id])?;
    // Photos cascade to their comments, mentions, viewers, likes and favorites
    tx.execute("DELETE FROM photos WHERE user_id = ?1", params![id])?;
    // Sessions, the user's own likes and favorites cascade from the user row
    tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;

    tx.commit()?;
    Ok(Some(file_names))
}

#[cfg(test)]
pub(crate) fn seed(conn: &Connection, login_name: &str) -> String {
    let id = crate::db::new_id();
    let user = NewUser {
        login_name: login_name.to_string(),
        password: String::new(),
        first_name: login_name.to_string(),
        last_name: "Tester".to_string(),
        ..NewUser::default()
    };
    insert(conn, &id, &user, "not-a-real-hash").unwrap();
    id
}
