use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{Difficulty, Recipe};

/// Fields for a freshly submitted recipe. `date_posted` is set by the
/// insert and never touched again.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub summary: Option<String>,
    pub image_file: String,
    pub cuisine: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub cook_time_mins: Option<i64>,
    pub ingredients: String,
    pub instructions: String,
    pub video_url: Option<String>,
    pub user_id: i64,
}

/// Editable fields. `image_file: None` keeps the current image.
#[derive(Debug, Clone)]
pub struct RecipeChanges {
    pub title: String,
    pub summary: Option<String>,
    pub image_file: Option<String>,
    pub cuisine: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub cook_time_mins: Option<i64>,
    pub ingredients: String,
    pub instructions: String,
    pub video_url: Option<String>,
}

/// Listing row: recipe card fields plus the author's username.
#[derive(Debug, Clone)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub image_file: String,
    pub cuisine: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub cook_time_mins: Option<i64>,
    pub date_posted: String,
    pub author: String,
}

const RECIPE_COLUMNS: &str = "id, title, summary, image_file, cuisine, difficulty, \
     cook_time_mins, ingredients, instructions, video_url, date_posted, user_id";

pub(crate) const SUMMARY_COLUMNS: &str = "r.id, r.title, r.summary, r.image_file, r.cuisine, \
     r.difficulty, r.cook_time_mins, r.date_posted, u.username";

fn map_recipe(row: &Row) -> rusqlite::Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        title: row.get(1)?,
        summary: row.get(2)?,
        image_file: row.get(3)?,
        cuisine: row.get(4)?,
        difficulty: row
            .get::<_, Option<String>>(5)?
            .as_deref()
            .and_then(Difficulty::parse),
        cook_time_mins: row.get(6)?,
        ingredients: row.get(7)?,
        instructions: row.get(8)?,
        video_url: row.get(9)?,
        date_posted: row.get(10)?,
        user_id: row.get(11)?,
    })
}

pub(crate) fn map_summary(row: &Row) -> rusqlite::Result<RecipeSummary> {
    Ok(RecipeSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        summary: row.get(2)?,
        image_file: row.get(3)?,
        cuisine: row.get(4)?,
        difficulty: row
            .get::<_, Option<String>>(5)?
            .as_deref()
            .and_then(Difficulty::parse),
        cook_time_mins: row.get(6)?,
        date_posted: row.get(7)?,
        author: row.get(8)?,
    })
}

pub fn insert(conn: &Connection, new: &NewRecipe) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO recipes (title, summary, image_file, cuisine, difficulty, cook_time_mins, \
         ingredients, instructions, video_url, user_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            new.title,
            new.summary,
            new.image_file,
            new.cuisine,
            new.difficulty.map(|d| d.as_str()),
            new.cook_time_mins,
            new.ingredients,
            new.instructions,
            new.video_url,
            new.user_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update(conn: &Connection, id: i64, changes: &RecipeChanges) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE recipes SET title = ?1, summary = ?2, cuisine = ?3, difficulty = ?4, \
         cook_time_mins = ?5, ingredients = ?6, instructions = ?7, video_url = ?8, \
         image_file = IFNULL(?9, image_file) \
         WHERE id = ?10",
        params![
            changes.title,
            changes.summary,
            changes.cuisine,
            changes.difficulty.map(|d| d.as_str()),
            changes.cook_time_mins,
            changes.ingredients,
            changes.instructions,
            changes.video_url,
            changes.image_file,
            id,
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, id: i64) -> rusqlite::Result<Option<Recipe>> {
    conn.query_row(
        &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
        params![id],
        map_recipe,
    )
    .optional()
}

/// Delete a recipe and everything it exclusively owns, in one transaction:
/// its comments, its tag associations, then the recipe row. Tags themselves
/// are shared and survive. Returns false when the id does not exist.
pub fn delete_cascade(conn: &mut Connection, id: i64) -> rusqlite::Result<bool> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM comments WHERE recipe_id = ?1", params![id])?;
    tx.execute("DELETE FROM recipe_tags WHERE recipe_id = ?1", params![id])?;
    let affected = tx.execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(affected > 0)
}

pub fn count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))
}

/// All recipes newest-first, for the moderation list.
pub fn list_newest(conn: &Connection) -> rusqlite::Result<Vec<RecipeSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM recipes r JOIN users u ON u.id = r.user_id \
         ORDER BY r.date_posted DESC, r.id DESC"
    ))?;
    let rows = stmt.query_map([], map_summary)?;
    rows.collect()
}

pub fn latest(conn: &Connection, limit: u32) -> rusqlite::Result<Vec<RecipeSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM recipes r JOIN users u ON u.id = r.user_id \
         ORDER BY r.date_posted DESC, r.id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], map_summary)?;
    rows.collect()
}

/// Recipes carrying the "featured" tag, for the homepage carousel.
pub fn featured(conn: &Connection, limit: u32) -> rusqlite::Result<Vec<RecipeSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM recipes r \
         JOIN users u ON u.id = r.user_id \
         JOIN recipe_tags rt ON rt.recipe_id = r.id \
         JOIN tags t ON t.id = rt.tag_id \
         WHERE t.name = 'featured' \
         ORDER BY r.date_posted DESC, r.id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], map_summary)?;
    rows.collect()
}

/// Distinct cuisines present in storage, for the filter dropdown.
pub fn distinct_cuisines(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT cuisine FROM recipes WHERE cuisine IS NOT NULL ORDER BY cuisine",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{tags, test_pool, users};

    fn seed_user(conn: &Connection) -> i64 {
        users::insert(conn, "alice", "alice@example.com", "hash").unwrap()
    }

    fn toast(user_id: i64) -> NewRecipe {
        NewRecipe {
            title: "Toast".into(),
            summary: Some("Crispy bread".into()),
            image_file: "default_recipe.jpg".into(),
            cuisine: Some("French".into()),
            difficulty: Some(Difficulty::Easy),
            cook_time_mins: Some(5),
            ingredients: "bread\nbutter".into(),
            instructions: "toast it\nbutter it".into(),
            video_url: None,
            user_id,
        }
    }

    #[test]
    fn insert_and_find_round_trip() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user_id = seed_user(&conn);
        let id = insert(&conn, &toast(user_id)).unwrap();

        let recipe = find(&conn, id).unwrap().unwrap();
        assert_eq!(recipe.title, "Toast");
        assert_eq!(recipe.difficulty, Some(Difficulty::Easy));
        assert_eq!(recipe.cook_time_mins, Some(5));
        assert_eq!(recipe.user_id, user_id);
        assert!(!recipe.date_posted.is_empty());
    }

    #[test]
    fn update_keeps_image_and_date_posted_unless_replaced() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user_id = seed_user(&conn);
        let id = insert(&conn, &toast(user_id)).unwrap();
        let before = find(&conn, id).unwrap().unwrap();

        let changes = RecipeChanges {
            title: "Better Toast".into(),
            summary: None,
            image_file: None,
            cuisine: None,
            difficulty: Some(Difficulty::Medium),
            cook_time_mins: None,
            ingredients: "sourdough\nbutter".into(),
            instructions: "toast well".into(),
            video_url: Some("https://example.com/toast".into()),
        };
        update(&conn, id, &changes).unwrap();

        let after = find(&conn, id).unwrap().unwrap();
        assert_eq!(after.title, "Better Toast");
        assert_eq!(after.summary, None);
        assert_eq!(after.image_file, before.image_file);
        assert_eq!(after.date_posted, before.date_posted);
        assert_eq!(after.difficulty, Some(Difficulty::Medium));

        let mut changes = changes;
        changes.image_file = Some("abc123.jpg".into());
        update(&conn, id, &changes).unwrap();
        assert_eq!(find(&conn, id).unwrap().unwrap().image_file, "abc123.jpg");
    }

    #[test]
    fn delete_cascade_removes_comments_but_keeps_tags() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let user_id = seed_user(&conn);
        let id = insert(&conn, &toast(user_id)).unwrap();
        tags::attach_tags(&conn, id, &["quick".into(), "snack".into()]).unwrap();
        for n in 0..3 {
            conn.execute(
                "INSERT INTO comments (body, recipe_id, user_id) VALUES (?1, ?2, ?3)",
                params![format!("comment {n}"), id, user_id],
            )
            .unwrap();
        }

        assert!(delete_cascade(&mut conn, id).unwrap());

        assert!(find(&conn, id).unwrap().is_none());
        let orphans: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM comments WHERE recipe_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
        let links: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM recipe_tags WHERE recipe_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(links, 0);

        // Tags are shared resources and survive with their count decremented
        let tag = tags::find_by_name(&conn, "quick").unwrap().unwrap();
        assert_eq!(tags::recipe_count(&conn, tag.id).unwrap(), 0);
    }

    #[test]
    fn delete_cascade_reports_missing_recipe() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        assert!(!delete_cascade(&mut conn, 42).unwrap());
    }

    #[test]
    fn featured_returns_only_tagged_recipes() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user_id = seed_user(&conn);
        let starred = insert(&conn, &toast(user_id)).unwrap();
        let _plain = insert(&conn, &toast(user_id)).unwrap();
        tags::attach_tags(&conn, starred, &["featured".into()]).unwrap();

        let featured = featured(&conn, 5).unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].id, starred);
    }

    #[test]
    fn distinct_cuisines_skips_null_and_duplicates() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user_id = seed_user(&conn);
        insert(&conn, &toast(user_id)).unwrap();
        insert(&conn, &toast(user_id)).unwrap();
        let mut no_cuisine = toast(user_id);
        no_cuisine.cuisine = None;
        insert(&conn, &no_cuisine).unwrap();

        assert_eq!(distinct_cuisines(&conn).unwrap(), vec!["French".to_string()]);
    }
}
