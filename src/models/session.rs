use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::Principal;

/// Represents a server-side session, stored in Redis under `session:{id}`.
///
/// A session starts anonymous (`principal: None`) so a CSRF token can be
/// issued before registration. The CSRF token is generated lazily, at most
/// once per session, and is bound to this session only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The authenticated user, if any. Password hash is never stored here.
    pub principal: Option<Principal>,
    /// The anti-forgery token bound to this session, if one was issued.
    pub csrf_token: Option<String>,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns `true` if an authenticated principal is attached.
    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}

/// The id of the session a request arrived with, attached as a request
/// extension by the auth middleware.
#[derive(Debug, Clone, Copy)]
pub struct SessionId(pub uuid::Uuid);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_session_round_trips_through_json() {
        let session = Session {
            principal: None,
            csrf_token: Some("tok".to_string()),
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::days(7),
        };

        let json = sonic_rs::to_string(&session).unwrap();
        let back: Session = sonic_rs::from_str(&json).unwrap();

        assert!(!back.is_authenticated());
        assert_eq!(back.csrf_token.as_deref(), Some("tok"));
    }
}
