//! Favorites and likes. Both are idempotent set memberships keyed by
//! `(user_id, photo_id)`.

use rusqlite::{params, Connection};

pub fn add_favorite(conn: &Connection, user_id: &str, photo_id: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO favorites (user_id, photo_id) VALUES (?1, ?2)",
        params![user_id, photo_id],
    )?;
    Ok(())
}

pub fn remove_favorite(conn: &Connection, user_id: &str, photo_id: &str) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM favorites WHERE user_id = ?1 AND photo_id = ?2",
        params![user_id, photo_id],
    )?;
    Ok(removed > 0)
}

pub fn favorite_ids(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<String>> {
    ids_for(conn, "favorites", user_id)
}

pub fn like(conn: &Connection, user_id: &str, photo_id: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO likes (user_id, photo_id) VALUES (?1, ?2)",
        params![user_id, photo_id],
    )?;
    Ok(())
}

pub fn unlike(conn: &Connection, user_id: &str, photo_id: &str) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM likes WHERE user_id = ?1 AND photo_id = ?2",
        params![user_id, photo_id],
    )?;
    Ok(removed > 0)
}

pub fn liked_ids(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<String>> {
    ids_for(conn, "likes", user_id)
}

pub fn like_count(conn: &Connection, photo_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE photo_id = ?1",
        params![photo_id],
        |row| row.get(0),
    )
}

pub fn has_liked(conn: &Connection, user_id: &str, photo_id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM likes WHERE user_id = ?1 AND photo_id = ?2",
        params![user_id, photo_id],
        |row| row.get(0),
    )
}

fn ids_for(conn: &Connection, table: &str, user_id: &str) -> rusqlite::Result<Vec<String>> {
    let sql = format!(
        "SELECT photo_id FROM {} WHERE user_id = ?1 ORDER BY photo_id ASC",
        table
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map(params![user_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessList;
    use crate::db::{photos, test_conn, users};

    #[test]
    fn favorites_are_idempotent() {
        let conn = test_conn();
        let user = users::seed(&conn, "alice");
        let photo = photos::seed(&conn, &user, AccessList::Public);

        add_favorite(&conn, &user, &photo).unwrap();
        add_favorite(&conn, &user, &photo).unwrap();
        assert_eq!(favorite_ids(&conn, &user).unwrap(), vec![photo.clone()]);

        assert!(remove_favorite(&conn, &user, &photo).unwrap());
        assert!(!remove_favorite(&conn, &user, &photo).unwrap());
        assert!(favorite_ids(&conn, &user).unwrap().is_empty());
    }

    #[test]
    fn likes_track_counts() {
        let conn = test_conn();
        let alice = users::seed(&conn, "alice");
        let bob = users::seed(&conn, "bob");
        let photo = photos::seed(&conn, &alice, AccessList::Public);

        like(&conn, &alice, &photo).unwrap();
        like(&conn, &alice, &photo).unwrap();
        like(&conn, &bob, &photo).unwrap();
        assert_eq!(like_count(&conn, &photo).unwrap(), 2);
        assert!(has_liked(&conn, &bob, &photo).unwrap());

        assert!(unlike(&conn, &bob, &photo).unwrap());
        assert_eq!(like_count(&conn, &photo).unwrap(), 1);
        assert!(!has_liked(&conn, &bob, &photo).unwrap());
        assert_eq!(liked_ids(&conn, &alice).unwrap(), vec![photo]);
    }

    #[test]
    fn liking_unknown_photo_fails() {
        let conn = test_conn();
        let alice = users::seed(&conn, "alice");
        assert!(like(&conn, &alice, "missing").is_err());
    }
}
