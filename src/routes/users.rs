use askama::Template;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::{self, session, RegisterError};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{self, CurrentUser, MaybeUser};
use crate::forms::{AccountForm, FieldErrors, LoginForm, MultipartForm, RegisterForm};
use crate::routes::{profile_image_url, urlencode, Html, Nav};
use crate::state::AppState;
use crate::uploads;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route("/account", get(account_form).post(update_account))
}

// -- Cookies --

fn session_cookie(cookie_name: &str, token: &str, hours: u64) -> String {
    format!(
        "{cookie_name}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        hours * 3600
    )
}

fn clear_session_cookie(cookie_name: &str) -> String {
    format!("{cookie_name}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Only relative, non-protocol-relative paths are safe redirect targets;
/// anything else goes to the homepage.
fn safe_next(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") {
        next
    } else {
        "/"
    }
}

// -- Registration --

#[derive(Template)]
#[template(path = "users/register.html")]
struct RegisterTemplate {
    title: String,
    nav: Nav,
    notice: String,
    username: String,
    email: String,
    errors: FieldErrors,
}

async fn register_form(maybe_user: MaybeUser) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(RegisterTemplate {
        title: "Register".into(),
        nav: Nav::default(),
        notice: String::new(),
        username: String::new(),
        email: String::new(),
        errors: FieldErrors::new(),
    })
    .into_response())
}

async fn register(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let mut errors = form.validate();
    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();

    if errors.is_empty() {
        let conn = state.db.get()?;
        match auth::register(&conn, &username, &email, &form.password) {
            Ok(id) => {
                tracing::info!(user_id = id, "account created");
                return Ok(Redirect::to(&format!(
                    "/login?notice={}",
                    urlencode("Your account has been created! You can now log in.")
                ))
                .into_response());
            }
            Err(RegisterError::DuplicateUsername) => {
                errors.add("username", RegisterError::DuplicateUsername.to_string());
            }
            Err(RegisterError::DuplicateEmail) => {
                errors.add("email", RegisterError::DuplicateEmail.to_string());
            }
            Err(e) => return Err(AppError::Internal(e.to_string())),
        }
    }

    Ok(Html(RegisterTemplate {
        title: "Register".into(),
        nav: Nav::default(),
        notice: String::new(),
        username,
        email,
        errors,
    })
    .into_response())
}

// -- Login --

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginQuery {
    next: Option<String>,
    notice: Option<String>,
}

#[derive(Template)]
#[template(path = "users/login.html")]
struct LoginTemplate {
    title: String,
    nav: Nav,
    notice: String,
    email: String,
    next: String,
    error: String,
}

async fn login_form(maybe_user: MaybeUser, Query(query): Query<LoginQuery>) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(LoginTemplate {
        title: "Log In".into(),
        nav: Nav::default(),
        notice: query.notice.unwrap_or_default(),
        email: String::new(),
        next: query.next.unwrap_or_default(),
        error: String::new(),
    })
    .into_response())
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginSubmission {
    email: String,
    password: String,
    remember: Option<String>,
    next: String,
}

async fn login(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Form(submission): Form<LoginSubmission>,
) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let form = LoginForm {
        email: submission.email.trim().to_string(),
        password: submission.password,
        remember: submission.remember,
    };

    let authenticated = {
        let conn = state.db.get()?;
        auth::authenticate(&conn, &form.email, &form.password)
    };

    let user = match authenticated {
        Ok(user) => user,
        Err(auth::AuthenticateError::InvalidCredentials) => {
            return Ok((
                StatusCode::OK,
                Html(LoginTemplate {
                    title: "Log In".into(),
                    nav: Nav::default(),
                    notice: String::new(),
                    email: form.email,
                    next: submission.next,
                    error: auth::AuthenticateError::InvalidCredentials.to_string(),
                }),
            )
                .into_response());
        }
        Err(auth::AuthenticateError::Db(e)) => return Err(e.into()),
    };

    let hours = if form.remember_me() {
        state.config.auth.remember_hours
    } else {
        state.config.auth.session_hours
    };
    let token = session::create_session(&state.db, user.id, hours)?;
    tracing::info!(user_id = user.id, remember = form.remember_me(), "login");

    let headers = [(
        header::SET_COOKIE,
        session_cookie(&state.config.auth.cookie_name, &token, hours),
    )];
    Ok((headers, Redirect::to(safe_next(&submission.next))).into_response())
}

// -- Logout --

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = extractors::extract_session_token(&headers, &state.config.auth.cookie_name)
    {
        session::delete_session(&state.db, token)?;
    }
    let headers = [(
        header::SET_COOKIE,
        clear_session_cookie(&state.config.auth.cookie_name),
    )];
    Ok((headers, Redirect::to("/")).into_response())
}

// -- Account --

#[derive(Deserialize, Default)]
#[serde(default)]
struct AccountQuery {
    notice: Option<String>,
}

#[derive(Template)]
#[template(path = "users/account.html")]
struct AccountTemplate {
    title: String,
    nav: Nav,
    notice: String,
    username: String,
    email: String,
    image_url: String,
    errors: FieldErrors,
}

async fn account_form(user: CurrentUser, Query(query): Query<AccountQuery>) -> AppResult<Response> {
    Ok(Html(AccountTemplate {
        title: "Account".into(),
        nav: Nav::for_user(&Some(user.clone())),
        notice: query.notice.unwrap_or_default(),
        username: user.username,
        email: user.email,
        image_url: profile_image_url(&user.image_file),
        errors: FieldErrors::new(),
    })
    .into_response())
}

async fn update_account(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let raw = MultipartForm::read(multipart).await?;
    let form = AccountForm::from_multipart(&raw);
    let mut errors = form.validate();

    let conn = state.db.get()?;
    if errors.is_empty() {
        // Keeping your own name or email is not a collision
        if users::username_taken(&conn, &form.username, Some(user.id))? {
            errors.add("username", "That username is taken. Please choose another.");
        }
        if users::email_taken(&conn, &form.email, Some(user.id))? {
            errors.add("email", "That email is taken. Please choose another.");
        }
    }

    let mut image_url = profile_image_url(&user.image_file);
    if errors.is_empty() {
        if let Some(ref file) = raw.file {
            match uploads::save_image(
                &file.bytes,
                &file.filename,
                state.config.uploads_path(),
                uploads::PROFILE_DIR,
                uploads::PROFILE_MAX_DIM,
            ) {
                Ok(name) => {
                    users::set_image(&conn, user.id, &name)?;
                    image_url = profile_image_url(&name);
                }
                Err(uploads::ImageError::Io(e)) => {
                    return Err(AppError::Internal(format!("storing image: {e}")))
                }
                Err(e) => errors.add("image", e.to_string()),
            }
        }
    }

    if !errors.is_empty() {
        return Ok(Html(AccountTemplate {
            title: "Account".into(),
            nav: Nav::for_user(&Some(user)),
            notice: String::new(),
            username: form.username,
            email: form.email,
            image_url,
            errors,
        })
        .into_response());
    }

    users::update_profile(&conn, user.id, &form.username, &form.email)?;
    tracing::info!(user_id = user.id, "account updated");

    Ok(Redirect::to(&format!(
        "/account?notice={}",
        urlencode("Your account has been updated!")
    ))
    .into_response())
}
