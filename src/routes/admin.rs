use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::tags::MAX_TAG_LEN;
use crate::db::{comments, recipes, tags, users};
use crate::error::{AppError, AppResult};
use crate::extractors::AdminUser;
use crate::routes::{format_date, urlencode, Html, Nav};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/recipes", get(recipe_list))
        .route("/admin/comments", get(comment_list))
        .route("/admin/tags", get(tag_list).post(create_tag))
        .route("/admin/comment/{id}/delete", post(delete_comment))
        .route("/admin/tag/{id}/delete", post(delete_tag))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct NoticeQuery {
    notice: Option<String>,
}

// -- Dashboard --

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct DashboardTemplate {
    title: String,
    nav: Nav,
    notice: String,
    user_count: i64,
    recipe_count: i64,
    comment_count: i64,
    tag_count: i64,
}

async fn dashboard(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    Ok(Html(DashboardTemplate {
        title: "Moderation".into(),
        nav: Nav::for_user(&Some(admin.0)),
        notice: query.notice.unwrap_or_default(),
        user_count: users::count(&conn)?,
        recipe_count: recipes::count(&conn)?,
        comment_count: comments::count(&conn)?,
        tag_count: tags::count(&conn)?,
    })
    .into_response())
}

// -- Recipes --

struct AdminRecipeRow {
    id: i64,
    title: String,
    author: String,
    date: String,
}

#[derive(Template)]
#[template(path = "admin/recipes.html")]
struct AdminRecipesTemplate {
    title: String,
    nav: Nav,
    notice: String,
    rows: Vec<AdminRecipeRow>,
}

async fn recipe_list(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let rows = recipes::list_newest(&conn)?
        .into_iter()
        .map(|r| AdminRecipeRow {
            id: r.id,
            title: r.title,
            author: r.author,
            date: format_date(&r.date_posted),
        })
        .collect();
    Ok(Html(AdminRecipesTemplate {
        title: "Moderate Recipes".into(),
        nav: Nav::for_user(&Some(admin.0)),
        notice: query.notice.unwrap_or_default(),
        rows,
    })
    .into_response())
}

// -- Comments --

struct AdminCommentRow {
    id: i64,
    body: String,
    author: String,
    date: String,
    recipe_id: i64,
    recipe_title: String,
}

#[derive(Template)]
#[template(path = "admin/comments.html")]
struct AdminCommentsTemplate {
    title: String,
    nav: Nav,
    notice: String,
    rows: Vec<AdminCommentRow>,
}

async fn comment_list(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let rows = comments::list_newest(&conn)?
        .into_iter()
        .map(|c| AdminCommentRow {
            id: c.id,
            body: c.body,
            author: c.author,
            date: format_date(&c.created_at),
            recipe_id: c.recipe_id,
            recipe_title: c.recipe_title,
        })
        .collect();
    Ok(Html(AdminCommentsTemplate {
        title: "Moderate Comments".into(),
        nav: Nav::for_user(&Some(admin.0)),
        notice: query.notice.unwrap_or_default(),
        rows,
    })
    .into_response())
}

async fn delete_comment(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    if !comments::delete(&conn, id)? {
        return Err(AppError::NotFound);
    }
    tracing::info!(comment_id = id, admin_id = admin.0.id, "comment removed");
    Ok(redirect_with_notice("/admin/comments", "Comment deleted."))
}

// -- Tags --

struct AdminTagRow {
    id: i64,
    name: String,
    recipe_count: i64,
}

#[derive(Template)]
#[template(path = "admin/tags.html")]
struct AdminTagsTemplate {
    title: String,
    nav: Nav,
    notice: String,
    rows: Vec<AdminTagRow>,
}

async fn tag_list(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let rows = tags::list_with_counts(&conn)?
        .into_iter()
        .map(|(tag, recipe_count)| AdminTagRow {
            id: tag.id,
            name: tag.name,
            recipe_count,
        })
        .collect();
    Ok(Html(AdminTagsTemplate {
        title: "Moderate Tags".into(),
        nav: Nav::for_user(&Some(admin.0)),
        notice: query.notice.unwrap_or_default(),
        rows,
    })
    .into_response())
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CreateTagForm {
    name: String,
}

/// Seed a tag ahead of any recipe using it, e.g. "featured".
async fn create_tag(
    State(state): State<AppState>,
    admin: AdminUser,
    Form(form): Form<CreateTagForm>,
) -> AppResult<Response> {
    let name = form.name.trim().to_lowercase();
    if name.is_empty() || name.chars().count() > MAX_TAG_LEN {
        return Ok(redirect_with_notice(
            "/admin/tags",
            "Tag names must be between 1 and 40 characters.",
        ));
    }

    let conn = state.db.get()?;
    let notice = if tags::find_by_name(&conn, &name)?.is_some() {
        format!("Tag \"{name}\" already exists.")
    } else {
        tags::find_or_create(&conn, &name)?;
        tracing::info!(tag = %name, admin_id = admin.0.id, "tag created");
        format!("Tag \"{name}\" created.")
    };
    Ok(redirect_with_notice("/admin/tags", &notice))
}

async fn delete_tag(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    if !tags::delete(&mut conn, id)? {
        return Err(AppError::NotFound);
    }
    tracing::info!(tag_id = id, admin_id = admin.0.id, "tag removed");
    Ok(redirect_with_notice("/admin/tags", "Tag deleted."))
}

fn redirect_with_notice(base: &str, notice: &str) -> Response {
    Redirect::to(&format!("{base}?notice={}", urlencode(notice))).into_response()
}
