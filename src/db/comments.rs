use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{AuthoredComment, Comment, Photo, UserSummary};
use crate::db::timestamp;
use crate::mentions::Mention;

/// Ownership facts needed to authorize a comment deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentOwnership {
    pub photo_id: String,
    pub author_id: String,
    pub photo_owner_id: String,
}

/// Insert a comment with its mentions. Returns the stored timestamp.
pub fn insert(
    conn: &mut Connection,
    id: &str,
    photo_id: &str,
    author_id: &str,
    body: &str,
    mentions: &[Mention],
) -> rusqlite::Result<String> {
    let date_time = timestamp();
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO comments (id, photo_id, user_id, body, date_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, photo_id, author_id, body, date_time],
    )?;
    for mention in mentions {
        tx.execute(
            "INSERT OR IGNORE INTO comment_mentions (comment_id, user_id, display)
             VALUES (?1, ?2, ?3)",
            params![id, mention.id, mention.display],
        )?;
    }
    tx.commit()?;
    Ok(date_time)
}

fn mentions_for(conn: &Connection, comment_id: &str) -> rusqlite::Result<Vec<Mention>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, display FROM comment_mentions WHERE comment_id = ?1 ORDER BY rowid ASC",
    )?;
    let mentions = stmt
        .query_map(params![comment_id], |row| {
            Ok(Mention {
                id: row.get(0)?,
                display: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(mentions)
}

/// Comments on a photo, oldest first, with author summaries resolved.
/// Authors that no longer exist come back as `user: None`.
pub fn list_for_photo(conn: &Connection, photo_id: &str) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.body, c.date_time, u.id, u.first_name, u.last_name
         FROM comments c
         LEFT JOIN users u ON u.id = c.user_id
         WHERE c.photo_id = ?1
         ORDER BY c.date_time ASC, c.id ASC",
    )?;
    let rows = stmt
        .query_map(params![photo_id], |row| {
            let author = match row.get::<_, Option<String>>(3)? {
                Some(id) => Some(UserSummary {
                    id,
                    first_name: row.get(4)?,
                    last_name: row.get(5)?,
                }),
                None => None,
            };
            Ok(Comment {
                id: row.get(0)?,
                comment: row.get(1)?,
                date_time: row.get(2)?,
                user: author,
                mentions: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|mut comment| {
            comment.mentions = mentions_for(conn, &comment.id)?;
            Ok(comment)
        })
        .collect()
}

/// Fill in the comments of each photo.
pub fn attach(conn: &Connection, photos: &mut [Photo]) -> rusqlite::Result<()> {
    for photo in photos.iter_mut() {
        photo.comments = list_for_photo(conn, &photo.id)?;
    }
    Ok(())
}

pub fn ownership(conn: &Connection, id: &str) -> rusqlite::Result<Option<CommentOwnership>> {
    conn.query_row(
        "SELECT c.photo_id, c.user_id, p.user_id
         FROM comments c
         JOIN photos p ON p.id = c.photo_id
         WHERE c.id = ?1",
        params![id],
        |row| {
            Ok(CommentOwnership {
                photo_id: row.get(0)?,
                author_id: row.get(1)?,
                photo_owner_id: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Delete a comment, its mentions and any activity rows referencing it.
pub fn delete(conn: &mut Connection, id: &str) -> rusqlite::Result<bool> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM activities WHERE comment_id = ?1", params![id])?;
    let removed = tx.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(removed > 0)
}

/// Comments written by `author_id`, oldest first, with their photo.
pub fn list_by_author(conn: &Connection, author_id: &str) -> rusqlite::Result<Vec<AuthoredComment>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.body, c.date_time, p.id, p.file_name, p.user_id
         FROM comments c
         JOIN photos p ON p.id = c.photo_id
         WHERE c.user_id = ?1
         ORDER BY c.date_time ASC, c.id ASC",
    )?;
    let comments = stmt
        .query_map(params![author_id], |row| {
            Ok(AuthoredComment {
                id: row.get(0)?,
                comment: row.get(1)?,
                date_time: row.get(2)?,
                photo_id: row.get(3)?,
                file_name: row.get(4)?,
                photo_owner_id: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(comments)
}

/// Ids of photos with at least one comment mentioning `user_id`, ascending.
pub fn photo_ids_mentioning(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT c.photo_id
         FROM comment_mentions m
         JOIN comments c ON c.id = m.comment_id
         WHERE m.user_id = ?1
         ORDER BY c.photo_id ASC",
    )?;
    let ids = stmt
        .query_map(params![user_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// `(author_id, photo_id)` for every comment.
pub fn authorship(conn: &Connection) -> rusqlite::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT user_id, photo_id FROM comments")?;
    let pairs = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(pairs)
}

#[cfg(test)]
pub(crate) fn seed(conn: &Connection, photo_id: &str, author_id: &str, body: &str) -> String {
    let id = crate::db::new_id();
    conn.execute(
        "INSERT INTO comments (id, photo_id, user_id, body, date_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, photo_id, author_id, body, timestamp()],
    )
    .unwrap();
    for mention in crate::mentions::parse_mentions(body) {
        conn.execute(
            "INSERT INTO comment_mentions (comment_id, user_id, display) VALUES (?1, ?2, ?3)",
            params![id, mention.id, mention.display],
        )
        .unwrap();
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessList;
    use crate::db::models::ActivityKind;
    use crate::db::{activities, photos, test_conn, users};
    use crate::mentions::parse_mentions;

    #[test]
    fn insert_stores_mentions() {
        let mut conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let photo = photos::seed(&conn, &owner, AccessList::Public);
        let body = "Hi @[Bob](U9)";

        insert(&mut conn, "c1", &photo, &owner, body, &parse_mentions(body)).unwrap();

        let comments = list_for_photo(&conn, &photo).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].comment, body);
        assert_eq!(
            comments[0].mentions,
            vec![Mention {
                id: "U9".into(),
                display: "Bob".into()
            }]
        );
        assert_eq!(photo_ids_mentioning(&conn, "U9").unwrap(), vec![photo]);
    }

    #[test]
    fn missing_author_resolves_to_none() {
        let conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let photo = photos::seed(&conn, &owner, AccessList::Public);
        seed(&conn, &photo, "ghost", "boo");
        seed(&conn, &photo, &owner, "hello");

        let comments = list_for_photo(&conn, &photo).unwrap();
        assert_eq!(comments.len(), 2);
        assert!(comments[0].user.is_none());
        assert_eq!(comments[1].user.as_ref().unwrap().id, owner);
    }

    #[test]
    fn attach_gives_empty_comments_for_quiet_photos() {
        let conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let busy = photos::seed(&conn, &owner, AccessList::Public);
        photos::seed(&conn, &owner, AccessList::Public);
        seed(&conn, &busy, &owner, "first");

        let mut list = photos::list_for_owner(&conn, &owner).unwrap();
        attach(&conn, &mut list).unwrap();
        assert_eq!(list[0].comments.len(), 1);
        assert!(list[1].comments.is_empty());
    }

    #[test]
    fn ownership_reports_author_and_photo_owner() {
        let conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let fan = users::seed(&conn, "fan");
        let photo = photos::seed(&conn, &owner, AccessList::Public);
        let id = seed(&conn, &photo, &fan, "nice");

        let facts = ownership(&conn, &id).unwrap().unwrap();
        assert_eq!(facts.author_id, fan);
        assert_eq!(facts.photo_owner_id, owner);
        assert_eq!(facts.photo_id, photo);
        assert!(ownership(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn delete_prunes_activity() {
        let mut conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let photo = photos::seed(&conn, &owner, AccessList::Public);
        let id = seed(&conn, &photo, &owner, "@[Me](x)");
        activities::record(&conn, ActivityKind::CommentAdded, &owner, Some(&photo), Some(&id)).unwrap();
        activities::record(&conn, ActivityKind::PhotoUpload, &owner, Some(&photo), None).unwrap();

        assert!(delete(&mut conn, &id).unwrap());
        assert!(!delete(&mut conn, &id).unwrap());

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM activities", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 1);
        let mentions: i64 = conn
            .query_row("SELECT COUNT(*) FROM comment_mentions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(mentions, 0);
    }

    #[test]
    fn list_by_author_includes_photo() {
        let conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let fan = users::seed(&conn, "fan");
        let photo = photos::seed(&conn, &owner, AccessList::Public);
        seed(&conn, &photo, &fan, "one");
        seed(&conn, &photo, &owner, "two");

        let authored = list_by_author(&conn, &fan).unwrap();
        assert_eq!(authored.len(), 1);
        assert_eq!(authored[0].photo_owner_id, owner);
        assert_eq!(authored[0].file_name, format!("{}.jpg", photo));
        assert_eq!(authorship(&conn).unwrap().len(), 2);
    }
}
