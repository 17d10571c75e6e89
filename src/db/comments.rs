use rusqlite::{params, Connection};

/// Comment joined with its author's name, for the recipe detail page.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub id: i64,
    pub body: String,
    pub created_at: String,
    pub author: String,
}

/// Moderation row: comment plus where it lives.
#[derive(Debug, Clone)]
pub struct CommentListItem {
    pub id: i64,
    pub body: String,
    pub created_at: String,
    pub author: String,
    pub recipe_id: i64,
    pub recipe_title: String,
}

pub fn insert(
    conn: &Connection,
    recipe_id: i64,
    user_id: i64,
    body: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO comments (body, recipe_id, user_id) VALUES (?1, ?2, ?3)",
        params![body, recipe_id, user_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn for_recipe(conn: &Connection, recipe_id: i64) -> rusqlite::Result<Vec<CommentView>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.body, c.created_at, u.username FROM comments c \
         JOIN users u ON u.id = c.user_id \
         WHERE c.recipe_id = ?1 ORDER BY c.created_at DESC, c.id DESC",
    )?;
    let rows = stmt.query_map(params![recipe_id], |row| {
        Ok(CommentView {
            id: row.get(0)?,
            body: row.get(1)?,
            created_at: row.get(2)?,
            author: row.get(3)?,
        })
    })?;
    rows.collect()
}

/// Every comment newest-first, for the moderation list.
pub fn list_newest(conn: &Connection) -> rusqlite::Result<Vec<CommentListItem>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.body, c.created_at, u.username, r.id, r.title FROM comments c \
         JOIN users u ON u.id = c.user_id \
         JOIN recipes r ON r.id = c.recipe_id \
         ORDER BY c.created_at DESC, c.id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(CommentListItem {
            id: row.get(0)?,
            body: row.get(1)?,
            created_at: row.get(2)?,
            author: row.get(3)?,
            recipe_id: row.get(4)?,
            recipe_title: row.get(5)?,
        })
    })?;
    rows.collect()
}

pub fn count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))
}

/// Returns false when the id does not exist.
pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let affected = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}
