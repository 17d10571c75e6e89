use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::User;

#[derive(Debug, thiserror::Error)]
pub enum DeleteUserError {
    /// Deleting a user that still owns recipes or comments is refused;
    /// content has no sensible owner afterwards.
    #[error("user still owns {recipes} recipe(s) and {comments} comment(s)")]
    HasContent { recipes: i64, comments: i64 },

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

fn map_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        image_file: row.get(4)?,
        is_admin: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const USER_COLUMNS: &str = "id, username, email, password_hash, image_file, is_admin, created_at";

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        map_user,
    )
    .optional()
}

pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email],
        map_user,
    )
    .optional()
}

/// Pre-insert friendliness check; the UNIQUE constraint is the authoritative
/// guard against concurrent registrations.
pub fn username_taken(
    conn: &Connection,
    username: &str,
    exclude_id: Option<i64>,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1 AND id != IFNULL(?2, -1)",
        params![username, exclude_id],
        |row| row.get(0),
    )
}

pub fn email_taken(
    conn: &Connection,
    email: &str,
    exclude_id: Option<i64>,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1 AND id != IFNULL(?2, -1)",
        params![email, exclude_id],
        |row| row.get(0),
    )
}

pub fn insert(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
        params![username, email, password_hash],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_profile(
    conn: &Connection,
    id: i64,
    username: &str,
    email: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET username = ?1, email = ?2 WHERE id = ?3",
        params![username, email, id],
    )?;
    Ok(())
}

pub fn set_image(conn: &Connection, id: i64, image_file: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET image_file = ?1 WHERE id = ?2",
        params![image_file, id],
    )?;
    Ok(())
}

pub fn set_admin(conn: &Connection, id: i64, is_admin: bool) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET is_admin = ?1 WHERE id = ?2",
        params![is_admin, id],
    )?;
    Ok(())
}

pub fn count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}

/// Delete a user, refusing while they still own content. Sessions go with
/// the user; recipes and comments never cascade from here.
pub fn delete(conn: &Connection, id: i64) -> Result<bool, DeleteUserError> {
    let recipes: i64 = conn.query_row(
        "SELECT COUNT(*) FROM recipes WHERE user_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    let comments: i64 = conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE user_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if recipes > 0 || comments > 0 {
        return Err(DeleteUserError::HasContent { recipes, comments });
    }

    conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![id])?;
    let affected = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn insert_and_find_round_trip() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let id = insert(&conn, "alice", "alice@example.com", "hash").unwrap();

        let by_id = find_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert_eq!(by_id.image_file, "default.jpg");
        assert!(!by_id.is_admin);

        let by_email = find_by_email(&conn, "alice@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, id);

        assert!(find_by_id(&conn, id + 1).unwrap().is_none());
    }

    #[test]
    fn taken_checks_respect_exclusion() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let id = insert(&conn, "alice", "alice@example.com", "hash").unwrap();

        assert!(username_taken(&conn, "alice", None).unwrap());
        assert!(email_taken(&conn, "alice@example.com", None).unwrap());
        assert!(!username_taken(&conn, "bob", None).unwrap());

        // A user keeping their own name is not a collision
        assert!(!username_taken(&conn, "alice", Some(id)).unwrap());
        assert!(!email_taken(&conn, "alice@example.com", Some(id)).unwrap());
    }

    #[test]
    fn delete_refuses_while_user_owns_content() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let id = insert(&conn, "alice", "alice@example.com", "hash").unwrap();
        conn.execute(
            "INSERT INTO recipes (title, ingredients, instructions, user_id)
             VALUES ('Toast', 'bread', 'toast it', ?1)",
            params![id],
        )
        .unwrap();

        let err = delete(&conn, id).unwrap_err();
        match err {
            DeleteUserError::HasContent { recipes, comments } => {
                assert_eq!(recipes, 1);
                assert_eq!(comments, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(find_by_id(&conn, id).unwrap().is_some());
    }

    #[test]
    fn delete_removes_user_and_sessions_when_contentless() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let id = insert(&conn, "alice", "alice@example.com", "hash").unwrap();
        conn.execute(
            "INSERT INTO sessions (id, user_id, token, expires_at)
             VALUES ('s1', ?1, 'tok', datetime('now', '+1 hour'))",
            params![id],
        )
        .unwrap();

        assert!(delete(&conn, id).unwrap());
        assert!(find_by_id(&conn, id).unwrap().is_none());
        let sessions: i64 = conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(sessions, 0);
    }
}
