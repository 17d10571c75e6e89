pub mod password;
pub mod session;

use rusqlite::Connection;

use crate::db::models::User;
use crate::db::users;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegisterError {
    #[error("That username is taken. Please choose another.")]
    DuplicateUsername,

    #[error("That email is taken. Please choose another.")]
    DuplicateEmail,

    #[error("database error")]
    Db(String),

    #[error("password hashing failed")]
    Hash(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthenticateError {
    /// Deliberately silent about whether the email or the password was wrong.
    #[error("Login unsuccessful. Please check email and password.")]
    InvalidCredentials,

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

/// Create an account. Duplicates are pre-checked for a friendly error; the
/// UNIQUE constraints catch the losing side of a concurrent race, which is
/// mapped back onto the same variants.
pub fn register(
    conn: &Connection,
    username: &str,
    email: &str,
    plain_password: &str,
) -> Result<i64, RegisterError> {
    if users::username_taken(conn, username, None).map_err(db_err)? {
        return Err(RegisterError::DuplicateUsername);
    }
    if users::email_taken(conn, email, None).map_err(db_err)? {
        return Err(RegisterError::DuplicateEmail);
    }

    let hashed = password::hash(plain_password).map_err(|e| RegisterError::Hash(e.to_string()))?;

    users::insert(conn, username, email, &hashed).map_err(|e| match constraint_column(&e) {
        Some(column) if column.ends_with("username") => RegisterError::DuplicateUsername,
        Some(column) if column.ends_with("email") => RegisterError::DuplicateEmail,
        _ => db_err(e),
    })
}

/// Verify credentials and return the account.
pub fn authenticate(
    conn: &Connection,
    email: &str,
    plain_password: &str,
) -> Result<User, AuthenticateError> {
    let user =
        users::find_by_email(conn, email)?.ok_or(AuthenticateError::InvalidCredentials)?;
    if password::verify(plain_password, &user.password_hash) {
        Ok(user)
    } else {
        Err(AuthenticateError::InvalidCredentials)
    }
}

fn db_err(e: rusqlite::Error) -> RegisterError {
    RegisterError::Db(e.to_string())
}

/// Extract the column name from a UNIQUE constraint violation, e.g.
/// "UNIQUE constraint failed: users.email" -> "users.email".
fn constraint_column(e: &rusqlite::Error) -> Option<&str> {
    match e {
        rusqlite::Error::SqliteFailure(err, Some(msg))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            msg.rsplit(": ").next()
        }
        _ => None,
    }
}
