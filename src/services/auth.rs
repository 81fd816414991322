use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::crypto::password;
use crate::error::{AppError, Result};
use crate::models::user::Principal;
use crate::repositories::user as user_repo;
use crate::validation::auth::*;

/// Registers a new user.
///
/// Email uniqueness is checked here first so the caller gets a clean
/// `Conflict` instead of a generic storage failure; the unique constraint
/// in the database covers the remaining race window.
///
/// # Arguments
///
/// * `db` - The database connection pool.
/// * `name` - The user's full name.
/// * `email` - The user's email address.
/// * `password` - The user's plaintext password.
///
/// # Returns
///
/// A `Result` containing the new `Principal`. Session installation is the
/// HTTP layer's job.
pub async fn register(
    db: &Pool,
    name: &str,
    email: &str,
    password_plain: &str,
) -> Result<Principal> {
    validate_name(name)?;
    validate_email(email)?;
    validate_password(password_plain)?;

    if user_repo::find_by_email(db, email).await?.is_some() {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let hashed_password = password::hash_password(password_plain)?;
    let user = user_repo::create(db, Uuid::new_v4(), name, email, &hashed_password).await?;

    tracing::info!("✅ User registered: {}", user.id);
    Ok(Principal::from(user))
}

/// Authenticates a user by email and password.
///
/// Unknown email, wrong password, and a deactivated account all return the
/// same `InvalidCredentials` error: the response must not reveal whether
/// the email exists.
///
/// # Returns
///
/// A `Result` containing the authenticated `Principal`, password hash
/// stripped.
pub async fn login(db: &Pool, email: &str, password_plain: &str) -> Result<Principal> {
    tracing::debug!("🔐 Login attempt");

    let user = user_repo::find_by_email(db, email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !password::verify_password(password_plain, &user.password)? {
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!("✅ User authenticated: {}", user.id);
    Ok(Principal::from(user))
}
