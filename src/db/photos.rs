use std::collections::{BTreeSet, HashMap};

use rusqlite::{params, Connection, OptionalExtension, ToSql};

use crate::access::AccessList;
use crate::db::models::Photo;
use crate::db::{placeholders, timestamp};

const PHOTO_COLUMNS: &str = "p.id, p.user_id, p.file_name, p.is_public, p.date_time,
    (SELECT COUNT(*) FROM likes l WHERE l.photo_id = p.id)";

fn load_access(conn: &Connection, photo_id: &str, is_public: bool) -> rusqlite::Result<AccessList> {
    if is_public {
        return Ok(AccessList::Public);
    }
    let mut stmt = conn.prepare("SELECT user_id FROM photo_viewers WHERE photo_id = ?1")?;
    let viewers = stmt
        .query_map(params![photo_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<BTreeSet<_>>>()?;
    Ok(AccessList::Restricted(viewers))
}

/// Run a photo query and attach access lists. Comments are left empty.
fn query_photos(conn: &Connection, filter: &str, args: &[&dyn ToSql]) -> rusqlite::Result<Vec<Photo>> {
    let sql = format!(
        "SELECT {} FROM photos p {} ORDER BY p.id ASC",
        PHOTO_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(args, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(id, user_id, file_name, is_public, date_time, likes)| {
            let access_list = load_access(conn, &id, is_public)?;
            Ok(Photo {
                id,
                user_id,
                file_name,
                date_time,
                likes,
                access_list,
                comments: Vec::new(),
            })
        })
        .collect()
}

/// Insert a photo and its viewer rows atomically.
pub fn insert(
    conn: &mut Connection,
    id: &str,
    owner_id: &str,
    file_name: &str,
    access_list: &AccessList,
) -> rusqlite::Result<Photo> {
    let date_time = timestamp();
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO photos (id, user_id, file_name, is_public, date_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, owner_id, file_name, access_list.is_public(), date_time],
    )?;
    for viewer in access_list.viewers() {
        tx.execute(
            "INSERT OR IGNORE INTO photo_viewers (photo_id, user_id) VALUES (?1, ?2)",
            params![id, viewer],
        )?;
    }
    tx.commit()?;

    Ok(Photo {
        id: id.to_string(),
        user_id: owner_id.to_string(),
        file_name: file_name.to_string(),
        date_time,
        likes: 0,
        access_list: access_list.clone(),
        comments: Vec::new(),
    })
}

pub fn find(conn: &Connection, id: &str) -> rusqlite::Result<Option<Photo>> {
    Ok(query_photos(conn, "WHERE p.id = ?1", &[&id])?.into_iter().next())
}

pub fn list_for_owner(conn: &Connection, owner_id: &str) -> rusqlite::Result<Vec<Photo>> {
    query_photos(conn, "WHERE p.user_id = ?1", &[&owner_id])
}

pub fn list_by_ids(conn: &Connection, ids: &[String]) -> rusqlite::Result<Vec<Photo>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let filter = format!("WHERE p.id IN ({})", placeholders(ids.len()));
    let args: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();
    query_photos(conn, &filter, &args)
}

pub fn access_list(conn: &Connection, id: &str) -> rusqlite::Result<Option<AccessList>> {
    let is_public: Option<bool> = conn
        .query_row(
            "SELECT is_public FROM photos WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    is_public
        .map(|is_public| load_access(conn, id, is_public))
        .transpose()
}

/// Access list of the photo stored under `file_name`.
pub fn access_for_file(conn: &Connection, file_name: &str) -> rusqlite::Result<Option<AccessList>> {
    let row: Option<(String, bool)> = conn
        .query_row(
            "SELECT id, is_public FROM photos WHERE file_name = ?1",
            params![file_name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    row.map(|(id, is_public)| load_access(conn, &id, is_public))
        .transpose()
}

/// Owner id and access list for every photo, keyed by photo id.
pub fn access_index(conn: &Connection) -> rusqlite::Result<HashMap<String, (String, AccessList)>> {
    let mut stmt = conn.prepare("SELECT id, user_id, is_public FROM photos")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut viewers: HashMap<String, BTreeSet<String>> = HashMap::new();
    let mut stmt = conn.prepare("SELECT photo_id, user_id FROM photo_viewers")?;
    for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))? {
        let (photo_id, user_id) = row?;
        viewers.entry(photo_id).or_default().insert(user_id);
    }

    Ok(rows
        .into_iter()
        .map(|(id, owner_id, is_public)| {
            let access = if is_public {
                AccessList::Public
            } else {
                AccessList::Restricted(viewers.remove(&id).unwrap_or_default())
            };
            (id, (owner_id, access))
        })
        .collect())
}

/// Delete a photo with its comments, likes, favorites and every activity row
/// referencing the photo or one of its comments. Returns the stored file name,
/// or `None` when the photo does not exist.
pub fn delete_cascade(conn: &mut Connection, id: &str) -> rusqlite::Result<Option<String>> {
    let tx = conn.transaction()?;

    let file_name: Option<String> = tx
        .query_row(
            "SELECT file_name FROM photos WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(file_name) = file_name else {
        return Ok(None);
    };

    tx.execute(
        "DELETE FROM activities
         WHERE photo_id = ?1
            OR comment_id IN (SELECT id FROM comments WHERE photo_id = ?1)",
        params![id],
    )?;
    tx.execute("DELETE FROM photos WHERE id = ?1", params![id])?;
    tx.commit()?;

    Ok(Some(file_name))
}

#[cfg(test)]
pub(crate) fn seed(conn: &Connection, owner_id: &str, access_list: AccessList) -> String {
    let id = crate::db::new_id();
    conn.execute(
        "INSERT INTO photos (id, user_id, file_name, is_public, date_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, owner_id, format!("{}.jpg", id), access_list.is_public(), timestamp()],
    )
    .unwrap();
    for viewer in access_list.viewers() {
        conn.execute(
            "INSERT INTO photo_viewers (photo_id, user_id) VALUES (?1, ?2)",
            params![id, viewer],
        )
        .unwrap();
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ActivityKind;
    use crate::db::{activities, comments, engagement, test_conn, users};

    #[test]
    fn insert_stores_restricted_viewers() {
        let mut conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let access = AccessList::for_owner(&owner, Some(vec!["U2".into(), "U5".into()]));

        let photo = insert(&mut conn, "p1", &owner, "p1.jpg", &access).unwrap();
        assert_eq!(photo.likes, 0);

        let stored = access_list(&conn, "p1").unwrap().unwrap();
        assert_eq!(stored, access);
        assert!(stored.permits(&owner));
        assert!(stored.permits("U2"));
        assert!(!stored.permits("U3"));
    }

    #[test]
    fn public_photo_round_trips() {
        let mut conn = test_conn();
        let owner = users::seed(&conn, "owner");
        insert(&mut conn, "p1", &owner, "p1.jpg", &AccessList::Public).unwrap();

        let photo = find(&conn, "p1").unwrap().unwrap();
        assert!(photo.access_list.is_public());
        assert!(photo.comments.is_empty());
        assert_eq!(photo.file_name, "p1.jpg");
    }

    #[test]
    fn list_for_owner_orders_by_id() {
        let conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let other = users::seed(&conn, "other");
        let first = seed(&conn, &owner, AccessList::Public);
        let second = seed(&conn, &owner, AccessList::Public);
        seed(&conn, &other, AccessList::Public);

        let ids: Vec<_> = list_for_owner(&conn, &owner)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn likes_are_counted() {
        let conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let fan = users::seed(&conn, "fan");
        let id = seed(&conn, &owner, AccessList::Public);
        engagement::like(&conn, &owner, &id).unwrap();
        engagement::like(&conn, &fan, &id).unwrap();
        assert_eq!(find(&conn, &id).unwrap().unwrap().likes, 2);
    }

    #[test]
    fn access_index_covers_all_photos() {
        let conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let public = seed(&conn, &owner, AccessList::Public);
        let private = seed(&conn, &owner, AccessList::for_owner(&owner, Some(Vec::new())));

        let index = access_index(&conn).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index[&public].1.is_public());
        assert!(index[&private].1.permits(&owner));
        assert!(!index[&private].1.permits("someone"));
        assert_eq!(index[&private].0, owner);
    }

    #[test]
    fn access_for_file_resolves_stored_name() {
        let conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let public = seed(&conn, &owner, AccessList::Public);
        let private = seed(&conn, &owner, AccessList::for_owner(&owner, Some(Vec::new())));

        let access = access_for_file(&conn, &format!("{}.jpg", public)).unwrap().unwrap();
        assert!(access.is_public());
        let access = access_for_file(&conn, &format!("{}.jpg", private)).unwrap().unwrap();
        assert!(access.permits(&owner));
        assert!(!access.permits("someone"));
        assert!(access_for_file(&conn, "nope.jpg").unwrap().is_none());
    }

    #[test]
    fn delete_cascade_removes_comments_and_activities() {
        let mut conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let fan = users::seed(&conn, "fan");
        let id = seed(&conn, &owner, AccessList::Public);
        let keep = seed(&conn, &owner, AccessList::Public);
        let comment = comments::seed(&conn, &id, &fan, "wow");
        activities::record(&conn, ActivityKind::PhotoUpload, &owner, Some(&id), None).unwrap();
        activities::record(&conn, ActivityKind::CommentAdded, &fan, Some(&id), Some(&comment)).unwrap();
        activities::record(&conn, ActivityKind::PhotoUpload, &owner, Some(&keep), None).unwrap();
        engagement::add_favorite(&conn, &fan, &id).unwrap();

        let file = delete_cascade(&mut conn, &id).unwrap();
        assert_eq!(file, Some(format!("{}.jpg", id)));

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM activities", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 1);
        let comments: i64 = conn
            .query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))
            .unwrap();
        assert_eq!(comments, 0);
        assert!(engagement::favorite_ids(&conn, &fan).unwrap().is_empty());
        assert!(delete_cascade(&mut conn, &id).unwrap().is_none());
    }

    #[test]
    fn list_by_ids_skips_unknown() {
        let conn = test_conn();
        let owner = users::seed(&conn, "owner");
        let id = seed(&conn, &owner, AccessList::Public);
        let photos = list_by_ids(&conn, &[id.clone(), "missing".into()]).unwrap();
        assert_eq!(photos.len(), 1);
        assert!(list_by_ids(&conn, &[]).unwrap().is_empty());
    }
}
