use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A full user record as stored, password hash included.
///
/// Never serialized: anything that crosses the HTTP boundary or lands in a
/// session goes through [`Principal`] first.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's full name.
    pub name: String,
    /// The user's email address. Unique, compared case-sensitively.
    pub email: String,
    /// The user's Argon2 password hash (PHC string).
    pub password: String,
    /// Whether the user is active.
    pub is_active: bool,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
}

/// The public view of a user: the password hash is stripped.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Principal {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's full name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// Whether the user is active.
    pub is_active: bool,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Principal {
            id: user.id,
            name: user.name,
            email: user.email,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_json_never_contains_password() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            password: "$argon2id$v=19$m=19456,t=3,p=6$abc$def".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        let principal = Principal::from(user);
        let json = serde_json::to_string(&principal).unwrap();

        assert!(json.contains("\"name\":\"Alice\""));
        assert!(json.contains("\"email\":\"a@x.com\""));
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }
}
