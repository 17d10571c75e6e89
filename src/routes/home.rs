use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::db::filter::{self, RecipeFilters};
use crate::db::{recipes, tags};
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::routes::{Nav, Pagination, RecipeCard};
use crate::state::AppState;

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/home", get(index))
        .route("/about", get(about))
        .route("/tips", get(tips))
        .route("/categories", get(categories))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct HomeQuery {
    page: String,
    notice: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/home.html")]
struct HomeTemplate {
    title: String,
    nav: Nav,
    notice: String,
    cards: Vec<RecipeCard>,
    featured: Vec<RecipeCard>,
    top_tags: Vec<String>,
    pagination: Pagination,
}

/// Homepage: newest recipes (paginated), featured carousel, top tags.
async fn index(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<HomeQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let filters = RecipeFilters::for_page(crate::routes::recipes::parse_page(&query.page));
    let page = filter::run(&conn, &filters)?;
    let cards = page.recipes.iter().map(RecipeCard::from_summary).collect();
    let pagination = Pagination::build(&page, &filters, "/");

    let featured = recipes::featured(&conn, 5)?
        .iter()
        .map(RecipeCard::from_summary)
        .collect();
    let top_tags = tags::top_names(&conn, 10)?;

    Ok(Html(HomeTemplate {
        title: "Home".into(),
        nav: Nav::for_user(&maybe_user.0),
        notice: query.notice.unwrap_or_default(),
        cards,
        featured,
        top_tags,
        pagination,
    })
    .into_response())
}

#[derive(Template)]
#[template(path = "pages/about.html")]
struct AboutTemplate {
    title: String,
    nav: Nav,
    notice: String,
}

async fn about(maybe_user: MaybeUser) -> AppResult<Response> {
    Ok(Html(AboutTemplate {
        title: "About".into(),
        nav: Nav::for_user(&maybe_user.0),
        notice: String::new(),
    })
    .into_response())
}

struct Tip {
    title: &'static str,
    body: &'static str,
}

#[derive(Template)]
#[template(path = "pages/tips.html")]
struct TipsTemplate {
    title: String,
    nav: Nav,
    notice: String,
    tips: Vec<Tip>,
}

async fn tips(maybe_user: MaybeUser) -> AppResult<Response> {
    let tips = vec![
        Tip {
            title: "Kitchen Safety Basics",
            body: "Wash hands, tie hair back, and keep your bench clean.",
        },
        Tip {
            title: "How to Season Properly",
            body: "Taste as you go. Add salt gradually and balance with acid (lemon/vinegar).",
        },
        Tip {
            title: "Food Storage",
            body: "Cool foods quickly, refrigerate within 2 hours, and label containers.",
        },
    ];
    Ok(Html(TipsTemplate {
        title: "Cooking Tips".into(),
        nav: Nav::for_user(&maybe_user.0),
        notice: String::new(),
        tips,
    })
    .into_response())
}

struct CategoryTile {
    title: &'static str,
    href: &'static str,
}

#[derive(Template)]
#[template(path = "pages/categories.html")]
struct CategoriesTemplate {
    title: String,
    nav: Nav,
    notice: String,
    tiles: Vec<CategoryTile>,
    latest: Vec<RecipeCard>,
    top_tags: Vec<String>,
}

/// Quick-navigation tiles that pre-fill the recipe list filters.
async fn categories(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    let tiles = vec![
        CategoryTile {
            title: "Italian",
            href: "/recipes?cuisine=Italian",
        },
        CategoryTile {
            title: "Asian",
            href: "/recipes?cuisine=Asian",
        },
        CategoryTile {
            title: "Mexican",
            href: "/recipes?cuisine=Mexican",
        },
        CategoryTile {
            title: "Dessert",
            href: "/recipes?cuisine=Dessert",
        },
        CategoryTile {
            title: "Easy",
            href: "/recipes?difficulty=Easy",
        },
        CategoryTile {
            title: "Under 30 mins",
            href: "/recipes?max_time=30",
        },
    ];

    let conn = state.db.get()?;
    let latest = recipes::latest(&conn, 6)?
        .iter()
        .map(RecipeCard::from_summary)
        .collect();
    let top_tags = tags::top_names(&conn, 12)?;

    Ok(Html(CategoriesTemplate {
        title: "Categories".into(),
        nav: Nav::for_user(&maybe_user.0),
        notice: String::new(),
        tiles,
        latest,
        top_tags,
    })
    .into_response())
}
