pub mod admin;
pub mod assets;
pub mod home;
pub mod recipes;
pub mod users;

pub use home::Html;

use crate::db::filter::{FilterPage, RecipeFilters};
use crate::db::recipes::RecipeSummary;
use crate::extractors::CurrentUser;

/// Data the shared page chrome needs: who is signed in, if anyone.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub logged_in: bool,
    pub username: String,
    pub is_admin: bool,
}

impl Nav {
    pub fn for_user(user: &Option<CurrentUser>) -> Nav {
        match user {
            Some(u) => Nav {
                logged_in: true,
                username: u.username.clone(),
                is_admin: u.is_admin,
            },
            None => Nav::default(),
        }
    }
}

/// Percent-encode a query-string value (RFC 3986 unreserved set passes).
pub fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Render a stored `datetime('now')` string as e.g. "Jan 10, 2024".
/// Unparseable values are shown as-is rather than dropped.
pub fn format_date(s: &str) -> String {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|_| s.to_string())
}

/// Display-ready recipe card used by every listing page.
#[derive(Debug, Clone)]
pub struct RecipeCard {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub image_url: String,
    pub cuisine: String,
    pub difficulty: String,
    pub cook_time: String,
    pub date: String,
    pub author: String,
}

impl RecipeCard {
    pub fn from_summary(s: &RecipeSummary) -> RecipeCard {
        RecipeCard {
            id: s.id,
            title: s.title.clone(),
            summary: s.summary.clone().unwrap_or_default(),
            image_url: recipe_image_url(&s.image_file),
            cuisine: s.cuisine.clone().unwrap_or_default(),
            difficulty: s.difficulty.map(|d| d.as_str().to_string()).unwrap_or_default(),
            cook_time: s
                .cook_time_mins
                .map(|m| format!("{m} min"))
                .unwrap_or_default(),
            date: format_date(&s.date_posted),
            author: s.author.clone(),
        }
    }
}

pub fn recipe_image_url(image_file: &str) -> String {
    format!("/media/{}/{}", crate::uploads::RECIPE_DIR, image_file)
}

pub fn profile_image_url(image_file: &str) -> String {
    format!("/media/{}/{}", crate::uploads::PROFILE_DIR, image_file)
}

/// Pagination controls for a filtered listing. Links echo the active
/// filters so moving between pages keeps them applied.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub show: bool,
    pub links: Vec<PageLink>,
    pub has_prev: bool,
    pub prev_href: String,
    pub has_next: bool,
    pub next_href: String,
}

#[derive(Debug, Clone)]
pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

impl Pagination {
    pub fn build(page: &FilterPage, filters: &RecipeFilters, base: &str) -> Pagination {
        if page.total_pages <= 1 {
            return Pagination::default();
        }
        let links = (1..=page.total_pages)
            .map(|n| PageLink {
                number: n,
                href: format!("{base}{}", filters.query_string(n)),
                current: n == page.page,
            })
            .collect();
        Pagination {
            show: true,
            links,
            has_prev: page.page > 1,
            prev_href: format!("{base}{}", filters.query_string(page.page.saturating_sub(1))),
            has_next: page.page < page.total_pages,
            next_href: format!("{base}{}", filters.query_string(page.page + 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencode_passes_unreserved_and_escapes_the_rest() {
        assert_eq!(urlencode("abc-123_~."), "abc-123_~.");
        assert_eq!(urlencode("/recipe/5"), "%2Frecipe%2F5");
        assert_eq!(urlencode("pasta bake"), "pasta%20bake");
        assert_eq!(urlencode("a&b=c"), "a%26b%3Dc");
    }

    #[test]
    fn format_date_renders_sqlite_timestamps() {
        assert_eq!(format_date("2024-01-10 12:00:00"), "Jan 10, 2024");
        assert_eq!(format_date("not a date"), "not a date");
    }

    #[test]
    fn pagination_hides_for_single_page() {
        let page = FilterPage {
            recipes: vec![],
            total: 3,
            page: 1,
            total_pages: 1,
        };
        let pagination = Pagination::build(&page, &RecipeFilters::for_page(1), "/recipes");
        assert!(!pagination.show);
        assert!(pagination.links.is_empty());
    }

    #[test]
    fn pagination_links_echo_filters() {
        let mut filters = RecipeFilters::for_page(2);
        filters.cuisine = "Italian".into();
        let page = FilterPage {
            recipes: vec![],
            total: 14,
            page: 2,
            total_pages: 3,
        };
        let pagination = Pagination::build(&page, &filters, "/recipes");
        assert!(pagination.show);
        assert_eq!(pagination.links.len(), 3);
        assert!(pagination.links[1].current);
        assert_eq!(pagination.prev_href, "/recipes?page=1&cuisine=Italian");
        assert_eq!(pagination.next_href, "/recipes?page=3&cuisine=Italian");
    }
}
