use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::{
    crypto::csrf,
    error::{AppError, Result},
    models::{session::Session, user::Principal},
};

/// The server-side session store, backed by Redis.
///
/// Sessions are keyed by an opaque UUID that travels only in an HttpOnly
/// cookie. The store is the single owner of session state: handlers get a
/// snapshot and write back through it.
#[derive(Clone)]
pub struct SessionStore {
    redis: ConnectionManager,
    session_duration_days: i64,
}

impl SessionStore {
    /// Creates a new `SessionStore`.
    pub fn new(redis: ConnectionManager, session_duration_days: i64) -> Self {
        Self {
            redis,
            session_duration_days,
        }
    }

    fn key(session_id: &Uuid) -> String {
        format!("session:{}", session_id)
    }

    /// Creates a fresh session under a new random id.
    ///
    /// # Arguments
    ///
    /// * `principal` - `None` for an anonymous session (pre-registration
    ///   CSRF issuance), `Some` for an authenticated one.
    pub async fn create(&self, principal: Option<Principal>) -> Result<(Uuid, Session)> {
        let session_id = Uuid::new_v4();
        let now = Utc::now();
        let session = Session {
            principal,
            csrf_token: None,
            created_at: now,
            expires_at: now + chrono::Duration::days(self.session_duration_days),
        };

        self.save(&session_id, &session).await?;
        tracing::debug!("🔑 Session created: {}", session_id);
        Ok((session_id, session))
    }

    /// Loads a session, dropping it if it has expired.
    pub async fn load(&self, session_id: &Uuid) -> Result<Option<Session>> {
        let mut conn = self.redis.clone();
        let session_json: Option<String> = conn.get(Self::key(session_id)).await?;

        let Some(session_json) = session_json else {
            return Ok(None);
        };

        let session: Session = sonic_rs::from_str(&session_json)
            .map_err(|e| AppError::Internal(format!("Session deserialization failed: {}", e)))?;

        if Utc::now() > session.expires_at {
            tracing::debug!("⏰ Session expired: {}", session_id);
            self.destroy(session_id).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Persists a session with a TTL matching its remaining lifetime.
    pub async fn save(&self, session_id: &Uuid, session: &Session) -> Result<()> {
        let session_json = sonic_rs::to_string(session)
            .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))?;

        let remaining = (session.expires_at - Utc::now()).num_seconds().max(1) as u64;

        let mut conn = self.redis.clone();
        let _: () = conn
            .set_ex(Self::key(session_id), session_json, remaining)
            .await?;
        Ok(())
    }

    /// Returns the session's CSRF token, generating it on first use.
    ///
    /// Idempotent within a session's lifetime: a second call returns the
    /// same token.
    pub async fn issue_csrf(&self, session_id: &Uuid, session: &mut Session) -> Result<String> {
        if let Some(token) = &session.csrf_token {
            return Ok(token.clone());
        }

        let token = csrf::generate_csrf_token();
        session.csrf_token = Some(token.clone());
        self.save(session_id, session).await?;
        tracing::debug!("🔐 CSRF token issued for session {}", session_id);
        Ok(token)
    }

    /// Destroys a session server-side.
    pub async fn destroy(&self, session_id: &Uuid) -> Result<()> {
        let mut conn = self.redis.clone();
        let _: () = conn.del(Self::key(session_id)).await?;
        tracing::debug!("🗑️ Session destroyed: {}", session_id);
        Ok(())
    }

    /// Replaces a session across the anonymous→authenticated transition.
    ///
    /// The old session id (if any) is destroyed and a fresh id is minted so
    /// a pre-set cookie can never carry authentication (session fixation).
    /// The new session starts without a CSRF token; clients fetch one anew.
    pub async fn rotate(
        &self,
        old_session_id: Option<&Uuid>,
        principal: Principal,
    ) -> Result<(Uuid, Session)> {
        if let Some(old_id) = old_session_id {
            self.destroy(old_id).await?;
        }
        self.create(Some(principal)).await
    }
}
