use rusqlite::{params, Connection, OptionalExtension};

use super::models::Tag;

pub const MAX_TAG_LEN: usize = 40;

/// Normalize free-text tag input: split on commas, trim, lowercase, drop
/// empty or over-long entries, dedupe keeping first-seen order.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for part in raw.split(',') {
        let name = part.trim().to_lowercase();
        if name.is_empty() || name.chars().count() > MAX_TAG_LEN {
            continue;
        }
        if seen.insert(name.clone()) {
            out.push(name);
        }
    }
    out
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Tag>> {
    conn.query_row(
        "SELECT id, name FROM tags WHERE id = ?1",
        params![id],
        |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn find_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Tag>> {
    conn.query_row(
        "SELECT id, name FROM tags WHERE name = ?1",
        params![name],
        |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Look up a tag by (already normalized) name, creating it on first use.
pub fn find_or_create(conn: &Connection, name: &str) -> rusqlite::Result<i64> {
    if let Some(tag) = find_by_name(conn, name)? {
        return Ok(tag.id);
    }
    conn.execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

/// Associate each named tag with the recipe, creating unseen tags.
pub fn attach_tags(conn: &Connection, recipe_id: i64, names: &[String]) -> rusqlite::Result<()> {
    for name in names {
        let tag_id = find_or_create(conn, name)?;
        // Composite PK makes re-attaching the same tag a no-op
        conn.execute(
            "INSERT OR IGNORE INTO recipe_tags (recipe_id, tag_id) VALUES (?1, ?2)",
            params![recipe_id, tag_id],
        )?;
    }
    Ok(())
}

/// Clear a recipe's associations and attach the given set instead. Detached
/// tags are never deleted; only an admin removes tags outright.
pub fn replace_tags(conn: &Connection, recipe_id: i64, names: &[String]) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM recipe_tags WHERE recipe_id = ?1",
        params![recipe_id],
    )?;
    attach_tags(conn, recipe_id, names)
}

pub fn for_recipe(conn: &Connection, recipe_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name FROM tags t \
         JOIN recipe_tags rt ON rt.tag_id = t.id \
         WHERE rt.recipe_id = ?1 ORDER BY t.name",
    )?;
    let rows = stmt.query_map(params![recipe_id], |row| row.get(0))?;
    rows.collect()
}

pub fn all_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM tags ORDER BY name")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

pub fn top_names(conn: &Connection, limit: u32) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM tags ORDER BY name LIMIT ?1")?;
    let rows = stmt.query_map(params![limit], |row| row.get(0))?;
    rows.collect()
}

/// Tags with their usage counts, name-ascending, for the moderation view.
pub fn list_with_counts(conn: &Connection) -> rusqlite::Result<Vec<(Tag, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, COUNT(rt.recipe_id) FROM tags t \
         LEFT JOIN recipe_tags rt ON rt.tag_id = t.id \
         GROUP BY t.id, t.name ORDER BY t.name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            },
            row.get(2)?,
        ))
    })?;
    rows.collect()
}

pub fn recipe_count(conn: &Connection, tag_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM recipe_tags WHERE tag_id = ?1",
        params![tag_id],
        |row| row.get(0),
    )
}

pub fn count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
}

/// Admin-only removal. Detaches the tag from every recipe that referenced
/// it; the recipes themselves are untouched. Returns false when absent.
pub fn delete(conn: &mut Connection, id: i64) -> rusqlite::Result<bool> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM recipe_tags WHERE tag_id = ?1", params![id])?;
    let affected = tx.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(affected > 0)
}
