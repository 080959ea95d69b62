//! SQL for users and their photos
//!
//! Every function runs on a connection whose transaction is managed by the
//! caller, so none of them commit or roll back on their own.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use duckdb::{params, Connection};

use crate::domain::{Error, Photo, Result, User};

const SELECT_USER: &str = "SELECT id, username, email, password_hash, salt FROM users";

fn row_to_user(row: &duckdb::Row) -> duckdb::Result<User> {
    Ok(User {
        id: Some(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        salt: row.get(4)?,
        photos: Vec::new(),
    })
}

fn row_to_photo(row: &duckdb::Row) -> duckdb::Result<Photo> {
    let width: i32 = row.get(5)?;
    let height: i32 = row.get(6)?;
    let uploaded_at: String = row.get(7)?;

    Ok(Photo {
        id: Some(row.get(0)?),
        title: row.get(1)?,
        url: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        width: width.max(0) as u32,
        height: height.max(0) as u32,
        uploaded_at: parse_timestamp(&uploaded_at),
    })
}

fn query_users(conn: &Connection, filter: &str, args: &[&dyn duckdb::ToSql]) -> Result<Vec<User>> {
    let sql = format!("{} {}", SELECT_USER, filter);
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map(args, row_to_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(users)
}

fn load_photos(conn: &Connection, user_id: i64) -> Result<Vec<Photo>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, url, latitude, longitude, width, height, uploaded_at
         FROM photos WHERE user_id = ? ORDER BY sort_order, id",
    )?;
    let photos = stmt
        .query_map([user_id], row_to_photo)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(photos)
}

fn with_photos(conn: &Connection, mut user: User) -> Result<User> {
    if let Some(id) = user.id {
        user.photos = load_photos(conn, id)?;
    }
    Ok(user)
}

/// Insert a new user and its photos, returning it with ids assigned
pub fn insert_user(conn: &Connection, user: &User) -> Result<User> {
    let id: i64 = conn.query_row(
        "INSERT INTO users (username, email, password_hash, salt)
         VALUES (?, ?, ?, ?) RETURNING id",
        params![user.username, user.email, user.password_hash, user.salt],
        |row| row.get(0),
    )?;

    let mut stored = user.clone();
    stored.id = Some(id);
    sync_photos(conn, id, &mut stored.photos)?;
    Ok(stored)
}

/// Fetch a user and its photos by username
pub fn find_user(conn: &Connection, username: &str) -> Result<User> {
    let user = query_users(conn, "WHERE username = ?", &[&username])?
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(format!("user '{}'", username)))?;
    with_photos(conn, user)
}

/// Fetch only the salt stored for a username
pub fn find_salt(conn: &Connection, username: &str) -> Result<String> {
    let mut stmt = conn.prepare("SELECT salt FROM users WHERE username = ?")?;
    let salts = stmt
        .query_map([username], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    salts
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(format!("user '{}'", username)))
}

/// Fetch the user whose username and password hash both match
///
/// Succeeds only when exactly one row matches.
pub fn find_by_credentials(conn: &Connection, username: &str, password_hash: &str) -> Result<User> {
    let mut matches = query_users(
        conn,
        "WHERE username = ? AND password_hash = ?",
        &[&username, &password_hash],
    )?;

    if matches.len() != 1 {
        return Err(Error::not_found(format!(
            "no unique user matches the credentials for '{}'",
            username
        )));
    }

    let user = matches.remove(0);
    with_photos(conn, user)
}

/// Fetch the id of a username
pub fn find_user_id(conn: &Connection, username: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM users WHERE username = ?")?;
    let ids = stmt
        .query_map([username], |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    ids.into_iter()
        .next()
        .ok_or_else(|| Error::not_found(format!("user '{}'", username)))
}

/// Merge an in-memory user into its row
///
/// Username and email are updated; the stored hash and salt are left alone.
/// The photo collection replaces what is stored.
pub fn merge_user(conn: &Connection, user: &User) -> Result<User> {
    let id = user
        .id
        .ok_or_else(|| Error::invalid_argument("user has no id; register it first"))?;

    let current: Vec<String> = {
        let mut stmt = conn.prepare("SELECT username FROM users WHERE id = ?")?;
        let rows = stmt.query_map([id], |row| row.get::<_, String>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };
    let current_username = current
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(format!("user with id {}", id)))?;

    let mut merged = user.clone();
    sync_photos(conn, id, &mut merged.photos)?;

    // Only touch the indexed column when it actually changes
    if current_username != user.username {
        conn.execute(
            "UPDATE users SET username = ? WHERE id = ?",
            params![user.username, id],
        )?;
    }
    conn.execute("UPDATE users SET email = ? WHERE id = ?", params![user.email, id])?;

    // Hash and salt come from the store, never from the caller
    let stored = query_users(conn, "WHERE id = ?", &[&id])?
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(format!("user with id {}", id)))?;
    merged.password_hash = stored.password_hash;
    merged.salt = stored.salt;

    Ok(merged)
}

/// Delete a user and every photo it owns
///
/// `None` means the user was not found by the caller.
pub fn remove_user(conn: &Connection, user: Option<&User>) -> Result<()> {
    let user = user.ok_or_else(|| Error::not_found("user to delete"))?;
    let id = user
        .id
        .ok_or_else(|| Error::not_found(format!("user '{}' was never stored", user.username)))?;

    // Photos first; they reference the user row
    conn.execute("DELETE FROM photos WHERE user_id = ?", [id])?;
    let deleted = conn.execute("DELETE FROM users WHERE id = ?", [id])?;

    if deleted == 0 {
        return Err(Error::not_found(format!("user with id {}", id)));
    }
    Ok(())
}

/// Write a user's photo collection, assigning ids to new photos
///
/// Stored photos missing from the collection are deleted.
fn sync_photos(conn: &Connection, user_id: i64, photos: &mut [Photo]) -> Result<()> {
    let existing: HashSet<i64> = {
        let mut stmt = conn.prepare("SELECT id FROM photos WHERE user_id = ?")?;
        let rows = stmt.query_map([user_id], |row| row.get::<_, i64>(0))?;
        rows.collect::<std::result::Result<_, _>>()?
    };

    let mut kept = HashSet::new();

    for (position, photo) in photos.iter_mut().enumerate() {
        let sort_order = position as i64;
        let uploaded_at = photo.uploaded_at.to_rfc3339();

        match photo.id.filter(|id| existing.contains(id)) {
            Some(id) => {
                conn.execute(
                    "UPDATE photos
                     SET sort_order = ?, title = ?, url = ?, latitude = ?, longitude = ?,
                         width = ?, height = ?, uploaded_at = ?
                     WHERE id = ?",
                    params![
                        sort_order,
                        photo.title,
                        photo.url,
                        photo.latitude,
                        photo.longitude,
                        photo.width as i64,
                        photo.height as i64,
                        uploaded_at,
                        id,
                    ],
                )?;
                kept.insert(id);
            }
            None => {
                let id: i64 = conn.query_row(
                    "INSERT INTO photos (user_id, sort_order, title, url, latitude, longitude,
                                         width, height, uploaded_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
                    params![
                        user_id,
                        sort_order,
                        photo.title,
                        photo.url,
                        photo.latitude,
                        photo.longitude,
                        photo.width as i64,
                        photo.height as i64,
                        uploaded_at,
                    ],
                    |row| row.get(0),
                )?;
                photo.id = Some(id);
                kept.insert(id);
            }
        }
    }

    for orphan in existing.difference(&kept) {
        conn.execute("DELETE FROM photos WHERE id = ?", [*orphan])?;
    }

    Ok(())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::migrations::MIGRATIONS;
    use crate::services::MigrationService;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        MigrationService::new(&conn, MIGRATIONS).run_pending().unwrap();
        conn
    }

    fn alice() -> User {
        User::new("alice", "alice@example.com", "hash-a", "salt-a").unwrap()
    }

    #[test]
    fn test_insert_assigns_ids() {
        let conn = setup();
        let mut user = alice();
        user.photos.push(Photo::new("Harbor", "https://img/1.jpg", 800, 600));

        let stored = insert_user(&conn, &user).unwrap();
        assert!(stored.id.is_some());
        assert!(stored.photos[0].id.is_some());

        let fetched = find_user(&conn, "alice").unwrap();
        assert_eq!(fetched.id, stored.id);
        assert_eq!(fetched.photos.len(), 1);
        assert_eq!(fetched.photos[0].title, "Harbor");
    }

    #[test]
    fn test_lookups_for_missing_user() {
        let conn = setup();

        assert!(find_user(&conn, "ghost").unwrap_err().is_not_found());
        assert!(find_salt(&conn, "ghost").unwrap_err().is_not_found());
        assert!(find_user_id(&conn, "ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn test_find_by_credentials_requires_both_fields() {
        let conn = setup();
        insert_user(&conn, &alice()).unwrap();

        assert!(find_by_credentials(&conn, "alice", "hash-a").is_ok());
        assert!(find_by_credentials(&conn, "alice", "hash-b").is_err());
        assert!(find_by_credentials(&conn, "bob", "hash-a").is_err());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let conn = setup();
        insert_user(&conn, &alice()).unwrap();

        let err = insert_user(&conn, &alice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_merge_keeps_credentials_and_syncs_photos() {
        let conn = setup();
        let mut user = insert_user(&conn, &alice()).unwrap();

        user.email = "new@example.com".to_string();
        user.password_hash = "tampered".to_string();
        user.photos.push(Photo::new("A", "u/a", 10, 10).with_location(1.0, 2.0));
        user.photos.push(Photo::new("B", "u/b", 10, 20));
        let merged = merge_user(&conn, &user).unwrap();
        assert_eq!(merged.password_hash, "hash-a");

        // Drop the first photo and retitle the second
        let mut next = merged.clone();
        next.photos.remove(0);
        next.photos[0].title = "B2".to_string();
        merge_user(&conn, &next).unwrap();

        let fetched = find_user(&conn, "alice").unwrap();
        assert_eq!(fetched.email, "new@example.com");
        assert_eq!(fetched.password_hash, "hash-a");
        assert_eq!(fetched.photos.len(), 1);
        assert_eq!(fetched.photos[0].title, "B2");
        assert_eq!(fetched.photos[0].id, merged.photos[1].id);
    }

    #[test]
    fn test_merge_without_id_is_invalid() {
        let conn = setup();
        let err = merge_user(&conn, &alice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_remove_user_cascades_to_photos() {
        let conn = setup();
        let mut user = alice();
        user.photos.push(Photo::new("A", "u/a", 1, 1));
        let stored = insert_user(&conn, &user).unwrap();

        remove_user(&conn, Some(&stored)).unwrap();

        let photos: i64 = conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))
            .unwrap();
        assert_eq!(photos, 0);
        assert!(find_user(&conn, "alice").is_err());
    }

    #[test]
    fn test_remove_absent_user_is_not_found() {
        let conn = setup();
        assert!(remove_user(&conn, None).unwrap_err().is_not_found());
    }
}
