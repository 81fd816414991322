use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::session::SessionId,
    state::AppState,
};

/// The name of the session cookie.
pub const SESSION_COOKIE: &str = "session_id";

/// Extracts the session id from the request cookies.
///
/// # Arguments
///
/// * `cookies` - The request cookies.
///
/// # Returns
///
/// An `Option` containing the session ID if found.
pub fn extract_session_id(cookies: &Cookies) -> Option<Uuid> {
    cookies
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// A middleware that requires an authenticated session.
///
/// The session cookie must reference a live, unexpired session with a
/// principal attached; anonymous sessions do not pass. On success the
/// `Session` and its id are attached to the request as extensions.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let session_id = extract_session_id(&cookies).ok_or_else(|| {
        tracing::warn!("❌ No session_id cookie found");
        AppError::Unauthorized
    })?;

    let session = state
        .sessions
        .load(&session_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("❌ Unknown or expired session: {}", session_id);
            AppError::Unauthorized
        })?;

    if !session.is_authenticated() {
        tracing::warn!("❌ Anonymous session on a protected route: {}", session_id);
        return Err(AppError::Unauthorized);
    }

    request.extensions_mut().insert(SessionId(session_id));
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
