use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    /// Anonymous access to a protected route. Carries the originally
    /// requested path so login can send the user back there afterwards.
    #[error("Unauthorized")]
    Unauthorized { next: String },

    #[error("Forbidden")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Template)]
#[template(path = "errors/not_found.html")]
struct NotFoundTemplate;

#[derive(Template)]
#[template(path = "errors/forbidden.html")]
struct ForbiddenTemplate;

fn error_page<T: Template>(status: StatusCode, template: T, fallback: &str) -> Response {
    let body = template.render().unwrap_or_else(|_| fallback.to_string());
    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => error_page(StatusCode::NOT_FOUND, NotFoundTemplate, "Not found"),
            AppError::Forbidden => {
                error_page(StatusCode::FORBIDDEN, ForbiddenTemplate, "Forbidden")
            }
            AppError::Unauthorized { next } => {
                let target = format!("/login?next={}", crate::routes::urlencode(&next));
                Redirect::to(&target).into_response()
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
