use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::UserSummary;

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: &str, hours: u64) -> rusqlite::Result<String> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Resolve an unexpired session token to its user.
pub fn find_user(conn: &Connection, token: &str) -> rusqlite::Result<Option<UserSummary>> {
    conn.query_row(
        "SELECT u.id, u.first_name, u.last_name FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
        params![token],
        |row| {
            Ok(UserSummary {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_conn, users};

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
    }

    #[test]
    fn session_resolves_until_deleted() {
        let conn = test_conn();
        let id = users::seed(&conn, "alice");
        let token = create_session(&conn, &id, 1).unwrap();

        assert_eq!(find_user(&conn, &token).unwrap().unwrap().id, id);

        delete_session(&conn, &token).unwrap();
        assert!(find_user(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn expired_session_does_not_resolve() {
        let conn = test_conn();
        let id = users::seed(&conn, "alice");
        let token = create_session(&conn, &id, 1).unwrap();
        conn.execute(
            "UPDATE sessions SET expires_at = datetime('now', '-1 hours') WHERE token = ?1",
            params![token],
        )
        .unwrap();
        assert!(find_user(&conn, &token).unwrap().is_none());
    }
}
