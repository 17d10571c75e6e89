use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::models::Difficulty;
use super::recipes::{map_summary, RecipeSummary, SUMMARY_COLUMNS};

pub const PAGE_SIZE: u32 = 6;

/// Optional listing filters, kept as the raw strings the user supplied so
/// the form can be re-rendered with them. Empty means absent; a `max_time`
/// that is not a non-negative integer is treated as absent, not an error.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilters {
    pub search: String,
    pub cuisine: String,
    pub difficulty: String,
    pub max_time: String,
    pub ingredient: String,
    pub tag: String,
    pub page: u32,
}

/// One page of filtered results plus the data pagination controls need.
#[derive(Debug)]
pub struct FilterPage {
    pub recipes: Vec<RecipeSummary>,
    pub total: i64,
    pub page: u32,
    pub total_pages: u32,
}

impl RecipeFilters {
    pub fn for_page(page: u32) -> Self {
        RecipeFilters {
            page,
            ..Default::default()
        }
    }

    fn max_time_mins(&self) -> Option<i64> {
        self.max_time.trim().parse::<i64>().ok().filter(|n| *n >= 0)
    }

    /// AND-conjunction of the present predicates. Predicates are independent,
    /// so the fixed emission order here only pins the SQL text, not the
    /// result set.
    fn build_where(&self) -> (String, Vec<Value>) {
        let mut sql = String::from(" WHERE 1=1");
        let mut params: Vec<Value> = Vec::new();

        let search = self.search.trim();
        if !search.is_empty() {
            let pattern = format!("%{search}%");
            sql.push_str(&format!(
                " AND (r.title LIKE ?{} OR IFNULL(r.summary, '') LIKE ?{})",
                params.len() + 1,
                params.len() + 2
            ));
            params.push(Value::Text(pattern.clone()));
            params.push(Value::Text(pattern));
        }

        let cuisine = self.cuisine.trim();
        if !cuisine.is_empty() {
            sql.push_str(&format!(" AND r.cuisine = ?{}", params.len() + 1));
            params.push(Value::Text(cuisine.to_string()));
        }

        // Only values from the closed enumeration ever reach the query
        if let Some(difficulty) = Difficulty::parse(self.difficulty.trim()) {
            sql.push_str(&format!(" AND r.difficulty = ?{}", params.len() + 1));
            params.push(Value::Text(difficulty.as_str().to_string()));
        }

        if let Some(max_time) = self.max_time_mins() {
            sql.push_str(&format!(" AND r.cook_time_mins <= ?{}", params.len() + 1));
            params.push(Value::Integer(max_time));
        }

        let ingredient = self.ingredient.trim();
        if !ingredient.is_empty() {
            sql.push_str(&format!(" AND r.ingredients LIKE ?{}", params.len() + 1));
            params.push(Value::Text(format!("%{ingredient}%")));
        }

        let tag = self.tag.trim().to_lowercase();
        if !tag.is_empty() {
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt \
                 JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.name = ?{})",
                params.len() + 1
            ));
            params.push(Value::Text(tag));
        }

        (sql, params)
    }

    /// Rebuild the query string for a given page, echoing the other filters.
    pub fn query_string(&self, page: u32) -> String {
        use crate::routes::urlencode;

        let mut parts = vec![format!("page={page}")];
        for (key, value) in [
            ("search", &self.search),
            ("cuisine", &self.cuisine),
            ("difficulty", &self.difficulty),
            ("max_time", &self.max_time),
            ("ingredient", &self.ingredient),
            ("tag", &self.tag),
        ] {
            let value = value.trim();
            if !value.is_empty() {
                parts.push(format!("{key}={}", urlencode(value)));
            }
        }
        format!("?{}", parts.join("&"))
    }
}

/// Run the filter engine: conjunctive predicates, newest-first ordering with
/// id as the deterministic tie-break, fixed page size.
pub fn run(conn: &Connection, filters: &RecipeFilters) -> rusqlite::Result<FilterPage> {
    let (where_sql, where_params) = filters.build_where();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM recipes r{where_sql}"),
        params_from_iter(where_params.iter().cloned()),
        |row| row.get(0),
    )?;

    let page = filters.page.max(1);
    // Widen before multiplying; page comes straight off the query string
    let offset = (page as i64 - 1) * PAGE_SIZE as i64;

    let mut params = where_params;
    let limit_idx = params.len() + 1;
    let offset_idx = params.len() + 2;
    params.push(Value::Integer(PAGE_SIZE as i64));
    params.push(Value::Integer(offset));

    let mut stmt = conn.prepare(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM recipes r JOIN users u ON u.id = r.user_id\
         {where_sql} ORDER BY r.date_posted DESC, r.id DESC LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
    ))?;
    let rows = stmt.query_map(params_from_iter(params), map_summary)?;
    let recipes: Vec<RecipeSummary> = rows.collect::<Result<_, _>>()?;

    let total_pages = ((total as u32) + PAGE_SIZE - 1) / PAGE_SIZE;
    Ok(FilterPage {
        recipes,
        total,
        page,
        total_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Difficulty as D;
    use crate::db::recipes::NewRecipe;
    use crate::db::{recipes, tags, test_pool, users};
    use crate::state::DbPool;

    fn seed(pool: &DbPool) {
        let conn = pool.get().unwrap();
        let alice = users::insert(&conn, "alice", "alice@example.com", "h").unwrap();
        let bob = users::insert(&conn, "bob", "bob@example.com", "h").unwrap();

        let mut add = |title: &str,
                       cuisine: Option<&str>,
                       difficulty: Option<D>,
                       mins: Option<i64>,
                       ingredients: &str,
                       tag_names: &[&str],
                       user_id: i64,
                       posted: &str| {
            let id = recipes::insert(
                &conn,
                &NewRecipe {
                    title: title.into(),
                    summary: Some(format!("{title} summary")),
                    image_file: "default_recipe.jpg".into(),
                    cuisine: cuisine.map(String::from),
                    difficulty,
                    cook_time_mins: mins,
                    ingredients: ingredients.into(),
                    instructions: "cook it".into(),
                    video_url: None,
                    user_id,
                },
            )
            .unwrap();
            // Spread date_posted so ordering is observable
            conn.execute(
                "UPDATE recipes SET date_posted = ?1 WHERE id = ?2",
                rusqlite::params![posted, id],
            )
            .unwrap();
            let names: Vec<String> = tag_names.iter().map(|s| s.to_string()).collect();
            tags::attach_tags(&conn, id, &names).unwrap();
        };

        add("Carbonara", Some("Italian"), Some(D::Easy), Some(25), "pasta\neggs\nguanciale", &["dinner"], alice, "2024-01-10 12:00:00");
        add("Lasagna", Some("Italian"), Some(D::Hard), Some(90), "pasta\nbeef\ntomato", &["dinner", "baked"], alice, "2024-01-11 12:00:00");
        add("Ramen", Some("Japanese"), Some(D::Medium), Some(45), "noodles\npork\negg", &["soup"], bob, "2024-01-12 12:00:00");
        add("Bruschetta", Some("Italian"), Some(D::Easy), Some(10), "bread\ntomato\nbasil", &["snack", "quick"], bob, "2024-01-13 12:00:00");
        add("Mystery Stew", None, None, None, "whatever is left", &[], alice, "2024-01-14 12:00:00");
    }

    fn titles(page: &FilterPage) -> Vec<&str> {
        page.recipes.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn no_filters_returns_everything_newest_first() {
        let pool = test_pool();
        seed(&pool);
        let conn = pool.get().unwrap();
        let page = run(&conn, &RecipeFilters::for_page(1)).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(
            titles(&page),
            vec!["Mystery Stew", "Bruschetta", "Ramen", "Lasagna", "Carbonara"]
        );
    }

    #[test]
    fn filters_are_conjunctive() {
        let pool = test_pool();
        seed(&pool);
        let conn = pool.get().unwrap();

        let mut filters = RecipeFilters::for_page(1);
        filters.cuisine = "Italian".into();
        filters.difficulty = "Easy".into();
        let page = run(&conn, &filters).unwrap();
        assert_eq!(titles(&page), vec!["Bruschetta", "Carbonara"]);

        // Intersection of the single-filter result sets
        let mut only_cuisine = RecipeFilters::for_page(1);
        only_cuisine.cuisine = "Italian".into();
        let mut only_difficulty = RecipeFilters::for_page(1);
        only_difficulty.difficulty = "Easy".into();
        let cuisine_ids: Vec<i64> = run(&conn, &only_cuisine)
            .unwrap()
            .recipes
            .iter()
            .map(|r| r.id)
            .collect();
        let both_ids: Vec<i64> = page.recipes.iter().map(|r| r.id).collect();
        for id in &both_ids {
            assert!(cuisine_ids.contains(id));
        }
        assert_eq!(
            run(&conn, &only_difficulty).unwrap().total, 2,
            "difficulty alone matches the same two"
        );
    }

    #[test]
    fn search_matches_title_or_summary_case_insensitively() {
        let pool = test_pool();
        seed(&pool);
        let conn = pool.get().unwrap();

        let mut filters = RecipeFilters::for_page(1);
        filters.search = "CARBO".into();
        assert_eq!(titles(&run(&conn, &filters).unwrap()), vec!["Carbonara"]);

        filters.search = "stew summary".into();
        assert_eq!(titles(&run(&conn, &filters).unwrap()), vec!["Mystery Stew"]);
    }

    #[test]
    fn max_time_is_inclusive_and_ignores_garbage() {
        let pool = test_pool();
        seed(&pool);
        let conn = pool.get().unwrap();

        let mut filters = RecipeFilters::for_page(1);
        filters.max_time = "45".into();
        // Recipes without a cook time drop out of a numeric comparison
        assert_eq!(
            titles(&run(&conn, &filters).unwrap()),
            vec!["Bruschetta", "Ramen", "Carbonara"]
        );

        filters.max_time = "soon".into();
        assert_eq!(run(&conn, &filters).unwrap().total, 5);

        filters.max_time = "-3".into();
        assert_eq!(run(&conn, &filters).unwrap().total, 5);
    }

    #[test]
    fn ingredient_and_tag_filters() {
        let pool = test_pool();
        seed(&pool);
        let conn = pool.get().unwrap();

        let mut filters = RecipeFilters::for_page(1);
        filters.ingredient = "tomato".into();
        assert_eq!(
            titles(&run(&conn, &filters).unwrap()),
            vec!["Bruschetta", "Lasagna"]
        );

        let mut filters = RecipeFilters::for_page(1);
        filters.tag = "Dinner".into(); // matched case-insensitively
        assert_eq!(
            titles(&run(&conn, &filters).unwrap()),
            vec!["Lasagna", "Carbonara"]
        );
    }

    #[test]
    fn unknown_difficulty_is_treated_as_absent() {
        let pool = test_pool();
        seed(&pool);
        let conn = pool.get().unwrap();
        let mut filters = RecipeFilters::for_page(1);
        filters.difficulty = "Impossible".into();
        assert_eq!(run(&conn, &filters).unwrap().total, 5);
    }

    #[test]
    fn pagination_is_exhaustive_and_non_overlapping() {
        let pool = test_pool();
        {
            let conn = pool.get().unwrap();
            let user = users::insert(&conn, "alice", "alice@example.com", "h").unwrap();
            for n in 0..14 {
                let id = recipes::insert(
                    &conn,
                    &NewRecipe {
                        title: format!("Recipe {n}"),
                        summary: None,
                        image_file: "default_recipe.jpg".into(),
                        cuisine: None,
                        difficulty: None,
                        cook_time_mins: None,
                        ingredients: "stuff".into(),
                        instructions: "cook".into(),
                        video_url: None,
                        user_id: user,
                    },
                )
                .unwrap();
                conn.execute(
                    "UPDATE recipes SET date_posted = ?1 WHERE id = ?2",
                    rusqlite::params![format!("2024-02-{:02} 08:00:00", n + 1), id],
                )
                .unwrap();
            }
        }
        let conn = pool.get().unwrap();

        let mut seen = Vec::new();
        let first = run(&conn, &RecipeFilters::for_page(1)).unwrap();
        assert_eq!(first.total, 14);
        assert_eq!(first.total_pages, 3);
        for page_no in 1..=first.total_pages {
            let page = run(&conn, &RecipeFilters::for_page(page_no)).unwrap();
            assert!(page.recipes.len() <= PAGE_SIZE as usize);
            for r in &page.recipes {
                assert!(!seen.contains(&r.id), "page overlap at recipe {}", r.id);
                seen.push(r.id);
            }
        }
        assert_eq!(seen.len(), 14);

        // Concatenated pages reproduce the single sorted set
        let everything: Vec<i64> = {
            let mut stmt = conn
                .prepare("SELECT id FROM recipes ORDER BY date_posted DESC, id DESC")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .map(|r| r.unwrap())
                .collect()
        };
        assert_eq!(seen, everything);

        // Out-of-range pages are empty, not an error
        let beyond = run(&conn, &RecipeFilters::for_page(4)).unwrap();
        assert!(beyond.recipes.is_empty());

        // Page 0 clamps to 1
        let clamped = run(&conn, &RecipeFilters::for_page(0)).unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.recipes.len(), PAGE_SIZE as usize);
    }

    #[test]
    fn absurd_page_numbers_return_an_empty_page() {
        let pool = test_pool();
        seed(&pool);
        let conn = pool.get().unwrap();
        let page = run(&conn, &RecipeFilters::for_page(u32::MAX)).unwrap();
        assert!(page.recipes.is_empty());
        assert_eq!(page.total, 5);
        assert_eq!(page.page, u32::MAX);
    }

    #[test]
    fn query_string_echoes_only_present_filters() {
        let mut filters = RecipeFilters::for_page(1);
        filters.search = "pasta bake".into();
        filters.tag = "dinner".into();
        assert_eq!(
            filters.query_string(2),
            "?page=2&search=pasta%20bake&tag=dinner"
        );
        assert_eq!(RecipeFilters::for_page(1).query_string(1), "?page=1");
    }
}
