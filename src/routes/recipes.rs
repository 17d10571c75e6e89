use askama::Template;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::filter::{self, RecipeFilters};
use crate::db::models::{Difficulty, Recipe};
use crate::db::recipes::{NewRecipe, RecipeChanges};
use crate::db::{comments, recipes, tags};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::forms::{CommentForm, FieldErrors, MultipartForm, RecipeForm};
use crate::routes::{
    format_date, recipe_image_url, urlencode, Html, Nav, Pagination, RecipeCard,
};
use crate::state::AppState;
use crate::uploads;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list))
        .route("/recipe/new", get(new_form).post(create))
        .route("/recipe/{id}", get(detail).post(add_comment))
        .route("/recipe/{id}/update", get(edit_form).post(update))
        .route("/recipe/{id}/delete", post(delete))
}

// -- Listing --

#[derive(Deserialize, Default)]
#[serde(default)]
struct ListQuery {
    search: String,
    cuisine: String,
    difficulty: String,
    max_time: String,
    ingredient: String,
    tag: String,
    page: String,
    notice: Option<String>,
}

impl ListQuery {
    fn into_filters(self) -> RecipeFilters {
        RecipeFilters {
            search: self.search,
            cuisine: self.cuisine,
            difficulty: self.difficulty,
            max_time: self.max_time,
            ingredient: self.ingredient,
            tag: self.tag,
            page: parse_page(&self.page),
        }
    }
}

/// A page that is not a positive integer means the first page, not an error.
pub(crate) fn parse_page(raw: &str) -> u32 {
    raw.trim().parse().ok().filter(|n| *n >= 1).unwrap_or(1)
}

#[derive(Template)]
#[template(path = "recipes/list.html")]
struct ListTemplate {
    title: String,
    nav: Nav,
    notice: String,
    cards: Vec<RecipeCard>,
    total: i64,
    filters: RecipeFilters,
    cuisines: Vec<String>,
    difficulties: Vec<String>,
    tag_names: Vec<String>,
    pagination: Pagination,
}

/// Browse all recipes with the filter panel. Every filter is optional and
/// they combine conjunctively.
async fn list(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let notice = query.notice.clone().unwrap_or_default();
    let filters = query.into_filters();
    let page = filter::run(&conn, &filters)?;
    let cards = page.recipes.iter().map(RecipeCard::from_summary).collect();
    let pagination = Pagination::build(&page, &filters, "/recipes");

    Ok(Html(ListTemplate {
        title: "Browse Recipes".into(),
        nav: Nav::for_user(&maybe_user.0),
        notice,
        cards,
        total: page.total,
        filters,
        cuisines: recipes::distinct_cuisines(&conn)?,
        difficulties: Difficulty::ALL.iter().map(|d| d.as_str().to_string()).collect(),
        tag_names: tags::all_names(&conn)?,
        pagination,
    })
    .into_response())
}

// -- Detail --

#[derive(Deserialize, Default)]
#[serde(default)]
struct DetailQuery {
    notice: Option<String>,
}

struct CommentRow {
    id: i64,
    body: String,
    date: String,
    author: String,
}

#[derive(Template)]
#[template(path = "recipes/detail.html")]
struct DetailTemplate {
    title: String,
    nav: Nav,
    notice: String,
    id: i64,
    summary: String,
    image_url: String,
    cuisine: String,
    difficulty: String,
    cook_time: String,
    date: String,
    author: String,
    ingredients: Vec<String>,
    instructions: Vec<String>,
    video_url: String,
    tag_names: Vec<String>,
    can_edit: bool,
    logged_in: bool,
    comments: Vec<CommentRow>,
    comment_body: String,
    comment_error: String,
}

fn detail_template(
    conn: &rusqlite::Connection,
    recipe: &Recipe,
    user: &Option<CurrentUser>,
    notice: String,
    comment_body: String,
    comment_error: String,
) -> AppResult<DetailTemplate> {
    let author: String = conn.query_row(
        "SELECT username FROM users WHERE id = ?1",
        rusqlite::params![recipe.user_id],
        |row| row.get(0),
    )?;

    let comment_rows = comments::for_recipe(conn, recipe.id)?
        .into_iter()
        .map(|c| CommentRow {
            id: c.id,
            body: c.body,
            date: format_date(&c.created_at),
            author: c.author,
        })
        .collect();

    let can_edit = user
        .as_ref()
        .map(|u| u.id == recipe.user_id || u.is_admin)
        .unwrap_or(false);

    Ok(DetailTemplate {
        title: recipe.title.clone(),
        nav: Nav::for_user(user),
        notice,
        id: recipe.id,
        summary: recipe.summary.clone().unwrap_or_default(),
        image_url: recipe_image_url(&recipe.image_file),
        cuisine: recipe.cuisine.clone().unwrap_or_default(),
        difficulty: recipe
            .difficulty
            .map(|d| d.as_str().to_string())
            .unwrap_or_default(),
        cook_time: recipe
            .cook_time_mins
            .map(|m| format!("{m} min"))
            .unwrap_or_default(),
        date: format_date(&recipe.date_posted),
        author,
        ingredients: lines(&recipe.ingredients),
        instructions: lines(&recipe.instructions),
        video_url: recipe.video_url.clone().unwrap_or_default(),
        tag_names: tags::for_recipe(conn, recipe.id)?,
        can_edit,
        logged_in: user.is_some(),
        comments: comment_rows,
        comment_body,
        comment_error,
    })
}

fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

async fn detail(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
    Query(query): Query<DetailQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let recipe = recipes::find(&conn, id)?.ok_or(AppError::NotFound)?;
    let template = detail_template(
        &conn,
        &recipe,
        &maybe_user.0,
        query.notice.unwrap_or_default(),
        String::new(),
        String::new(),
    )?;
    Ok(Html(template).into_response())
}

// -- Comments --

async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let recipe = recipes::find(&conn, id)?.ok_or(AppError::NotFound)?;

    let errors = form.validate();
    if !errors.is_empty() {
        // Re-render the detail page with the rejected text still in the box
        let template = detail_template(
            &conn,
            &recipe,
            &Some(user),
            String::new(),
            form.body,
            errors.get("body"),
        )?;
        return Ok(Html(template).into_response());
    }

    comments::insert(&conn, id, user.id, form.body.trim())?;
    tracing::info!(recipe_id = id, user_id = user.id, "comment posted");
    Ok(redirect_to_recipe(id, "Your comment has been posted."))
}

// -- Create --

#[derive(Template)]
#[template(path = "recipes/form.html")]
struct FormTemplate {
    title: String,
    nav: Nav,
    notice: String,
    legend: String,
    action: String,
    v: RecipeForm,
    errors: FieldErrors,
}

async fn new_form(user: CurrentUser) -> AppResult<Response> {
    Ok(Html(FormTemplate {
        title: "New Recipe".into(),
        nav: Nav::for_user(&Some(user)),
        notice: String::new(),
        legend: "New Recipe".into(),
        action: "/recipe/new".into(),
        v: RecipeForm::default(),
        errors: FieldErrors::new(),
    })
    .into_response())
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let raw = MultipartForm::read(multipart).await?;
    let form = RecipeForm::from_multipart(&raw);
    let mut errors = form.validate();

    let image_file = match raw.file {
        Some(ref file) if errors.is_empty() => {
            match uploads::save_image(
                &file.bytes,
                &file.filename,
                state.config.uploads_path(),
                uploads::RECIPE_DIR,
                uploads::RECIPE_MAX_DIM,
            ) {
                Ok(name) => Some(name),
                Err(uploads::ImageError::Io(e)) => {
                    return Err(AppError::Internal(format!("storing image: {e}")))
                }
                Err(e) => {
                    errors.add("image", e.to_string());
                    None
                }
            }
        }
        _ => None,
    };

    if !errors.is_empty() {
        return Ok(Html(FormTemplate {
            title: "New Recipe".into(),
            nav: Nav::for_user(&Some(user)),
            notice: String::new(),
            legend: "New Recipe".into(),
            action: "/recipe/new".into(),
            v: form,
            errors,
        })
        .into_response());
    }

    let conn = state.db.get()?;
    let id = recipes::insert(
        &conn,
        &NewRecipe {
            title: form.title.clone(),
            summary: form.summary_opt(),
            image_file: image_file.unwrap_or_else(|| "default_recipe.jpg".to_string()),
            cuisine: form.cuisine_opt(),
            difficulty: form.difficulty(),
            cook_time_mins: form.cook_time(),
            ingredients: form.ingredients.clone(),
            instructions: form.instructions.clone(),
            video_url: form.video_url_opt(),
            user_id: user.id,
        },
    )?;
    tags::attach_tags(&conn, id, &tags::parse_tags(&form.tags))?;
    tracing::info!(recipe_id = id, user_id = user.id, "recipe created");

    Ok(redirect_to_recipe(id, "Your recipe has been created!"))
}

// -- Edit --

async fn edit_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let recipe = recipes::find(&conn, id)?.ok_or(AppError::NotFound)?;
    user.require_owner_or_admin(recipe.user_id)?;

    let v = RecipeForm {
        title: recipe.title.clone(),
        summary: recipe.summary.clone().unwrap_or_default(),
        cuisine: recipe.cuisine.clone().unwrap_or_default(),
        difficulty: recipe
            .difficulty
            .map(|d| d.as_str().to_string())
            .unwrap_or_default(),
        cook_time_mins: recipe
            .cook_time_mins
            .map(|m| m.to_string())
            .unwrap_or_default(),
        ingredients: recipe.ingredients.clone(),
        instructions: recipe.instructions.clone(),
        video_url: recipe.video_url.clone().unwrap_or_default(),
        tags: tags::for_recipe(&conn, id)?.join(", "),
    };

    Ok(Html(FormTemplate {
        title: format!("Edit {}", recipe.title),
        nav: Nav::for_user(&Some(user)),
        notice: String::new(),
        legend: "Edit Recipe".into(),
        action: format!("/recipe/{id}/update"),
        v,
        errors: FieldErrors::new(),
    })
    .into_response())
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let recipe = recipes::find(&conn, id)?.ok_or(AppError::NotFound)?;
    user.require_owner_or_admin(recipe.user_id)?;

    let raw = MultipartForm::read(multipart).await?;
    let form = RecipeForm::from_multipart(&raw);
    let mut errors = form.validate();

    let image_file = match raw.file {
        Some(ref file) if errors.is_empty() => {
            match uploads::save_image(
                &file.bytes,
                &file.filename,
                state.config.uploads_path(),
                uploads::RECIPE_DIR,
                uploads::RECIPE_MAX_DIM,
            ) {
                Ok(name) => Some(name),
                Err(uploads::ImageError::Io(e)) => {
                    return Err(AppError::Internal(format!("storing image: {e}")))
                }
                Err(e) => {
                    errors.add("image", e.to_string());
                    None
                }
            }
        }
        _ => None,
    };

    if !errors.is_empty() {
        return Ok(Html(FormTemplate {
            title: "Edit Recipe".into(),
            nav: Nav::for_user(&Some(user)),
            notice: String::new(),
            legend: "Edit Recipe".into(),
            action: format!("/recipe/{id}/update"),
            v: form,
            errors,
        })
        .into_response());
    }

    recipes::update(
        &conn,
        id,
        &RecipeChanges {
            title: form.title.clone(),
            summary: form.summary_opt(),
            image_file,
            cuisine: form.cuisine_opt(),
            difficulty: form.difficulty(),
            cook_time_mins: form.cook_time(),
            ingredients: form.ingredients.clone(),
            instructions: form.instructions.clone(),
            video_url: form.video_url_opt(),
        },
    )?;
    tags::replace_tags(&conn, id, &tags::parse_tags(&form.tags))?;
    tracing::info!(recipe_id = id, user_id = user.id, "recipe updated");

    Ok(redirect_to_recipe(id, "Your recipe has been updated!"))
}

// -- Delete --

async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let recipe = recipes::find(&conn, id)?.ok_or(AppError::NotFound)?;
    user.require_owner_or_admin(recipe.user_id)?;

    recipes::delete_cascade(&mut conn, id)?;
    tracing::info!(recipe_id = id, user_id = user.id, "recipe deleted");

    Ok(Redirect::to(&format!(
        "/recipes?notice={}",
        urlencode("Your recipe has been deleted.")
    ))
    .into_response())
}

fn redirect_to_recipe(id: i64, notice: &str) -> Response {
    Redirect::to(&format!("/recipe/{id}?notice={}", urlencode(notice))).into_response()
}
