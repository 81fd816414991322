use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::User,
};

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        password: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        is_active: row.try_get("is_active").map_err(|_| AppError::MissingData("is_active".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

/// A typed, allow-listed set of updatable user fields.
///
/// Updates never accept an open key/value map: only these columns can be
/// touched, and `password` must already be hashed by the caller.
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    /// An Argon2 PHC string, never a plaintext password.
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    /// Returns `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.is_active.is_none()
    }

    /// The columns this update will touch, in bind order.
    fn columns(&self) -> Vec<&'static str> {
        let mut cols = Vec::new();
        if self.name.is_some() {
            cols.push("name");
        }
        if self.email.is_some() {
            cols.push("email");
        }
        if self.password_hash.is_some() {
            cols.push("password");
        }
        if self.is_active.is_some() {
            cols.push("is_active");
        }
        cols
    }

    /// Builds the SET clause, e.g. `name = $1, email = $2`.
    fn set_clause(&self) -> String {
        self.columns()
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ${}", col, i + 1))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Creates a new user in the database.
///
/// A unique violation on `email` maps to `Conflict`: the service layer
/// checks first, this is the backstop for the check-then-insert race.
pub async fn create(
    pool: &Pool,
    id: Uuid,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO users (id, name, email, password, is_active)
            VALUES ($1, $2, $3, $4, true)
            RETURNING id, name, email, password, is_active, created_at
            "#,
            &[&id, &name, &email, &password_hash],
        )
        .await
        .map_err(|e| {
            if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                AppError::Conflict("Email already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;
    row_to_user(&row)
}

/// Finds a user by their email address. Equality is case-sensitive.
pub async fn find_by_email(pool: &Pool, email: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, name, email, password, is_active, created_at
            FROM users
            WHERE email = $1
            "#,
            &[&email],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Finds a user by their ID.
pub async fn find_by_id(pool: &Pool, user_id: &Uuid) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, name, email, password, is_active, created_at
            FROM users
            WHERE id = $1
            "#,
            &[user_id],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Lists all users, newest first.
pub async fn list(pool: &Pool) -> Result<Vec<User>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT id, name, email, password, is_active, created_at
            FROM users
            ORDER BY created_at DESC
            "#,
            &[],
        )
        .await?;
    rows.iter().map(row_to_user).collect()
}

/// Applies a typed update to a user.
///
/// Returns `NotFound` if the id does not exist and `Conflict` if the new
/// email collides with another user.
pub async fn update(pool: &Pool, user_id: &Uuid, changes: &UserUpdate) -> Result<()> {
    if changes.is_empty() {
        return Err(AppError::Validation("No data sent for update".to_string()));
    }

    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
    if let Some(name) = &changes.name {
        params.push(name);
    }
    if let Some(email) = &changes.email {
        params.push(email);
    }
    if let Some(password_hash) = &changes.password_hash {
        params.push(password_hash);
    }
    if let Some(is_active) = &changes.is_active {
        params.push(is_active);
    }

    let sql = format!(
        "UPDATE users SET {} WHERE id = ${}",
        changes.set_clause(),
        params.len() + 1
    );
    params.push(user_id);

    let client = pool.get().await?;
    let rows_affected = client
        .execute(&sql, &params)
        .await
        .map_err(|e| {
            if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                AppError::Conflict("Email already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

    if rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Deletes a user. Returns `NotFound` if no row matched.
pub async fn delete(pool: &Pool, user_id: &Uuid) -> Result<()> {
    let client = pool.get().await?;
    let rows_affected = client
        .execute("DELETE FROM users WHERE id = $1", &[user_id])
        .await?;

    if rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_has_no_columns() {
        let changes = UserUpdate::default();
        assert!(changes.is_empty());
        assert!(changes.columns().is_empty());
    }

    #[test]
    fn set_clause_only_names_allow_listed_columns() {
        let changes = UserUpdate {
            name: Some("Alice".to_string()),
            is_active: Some(false),
            ..Default::default()
        };
        assert_eq!(changes.set_clause(), "name = $1, is_active = $2");
    }

    #[test]
    fn password_field_binds_to_the_password_column() {
        let changes = UserUpdate {
            email: Some("b@x.com".to_string()),
            password_hash: Some("$argon2id$...".to_string()),
            ..Default::default()
        };
        assert_eq!(changes.set_clause(), "email = $1, password = $2");
    }
}
