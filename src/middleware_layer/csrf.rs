use axum::{
    body::Body,
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    crypto::csrf,
    error::{AppError, Result},
    middleware_layer::auth::extract_session_id,
    models::session::Session,
    state::AppState,
};

/// A middleware that verifies the `X-CSRF-Token` header against the token
/// stored in the session.
///
/// Safe methods are exempt. The token travels only in a request header,
/// never a cookie, so a cross-site request that auto-attaches the session
/// cookie still cannot present it. When stacked under `require_auth` the
/// session is taken from the request extensions; on anonymous routes
/// (registration) it is loaded from the cookie directly.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `req` - The incoming request.
/// * `next` - The next middleware in the chain.
pub async fn verify_csrf(
    State(state): State<AppState>,
    cookies: Cookies,
    req: Request<Body>,
    next: Next,
) -> Result<Response> {
    if req.method() == Method::GET
        || req.method() == Method::HEAD
        || req.method() == Method::OPTIONS
    {
        tracing::debug!("✅ CSRF exemption: {} request", req.method());
        return Ok(next.run(req).await);
    }

    let presented = req
        .headers()
        .get("x-csrf-token")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            tracing::warn!("❌ CSRF: x-csrf-token header missing or malformed");
            AppError::Forbidden("Missing CSRF token header".to_string())
        })?;

    // Session was already loaded if require_auth ran in front of us.
    let session = match req.extensions().get::<Session>() {
        Some(session) => session.clone(),
        None => {
            let session_id = extract_session_id(&cookies).ok_or_else(|| {
                tracing::warn!("❌ CSRF: no session cookie");
                AppError::Forbidden("No session".to_string())
            })?;
            state
                .sessions
                .load(&session_id)
                .await?
                .ok_or_else(|| {
                    tracing::warn!("❌ CSRF: unknown or expired session");
                    AppError::Forbidden("No session".to_string())
                })?
        }
    };

    let expected = session.csrf_token.as_deref().ok_or_else(|| {
        tracing::warn!("❌ CSRF: session has no token issued");
        AppError::Forbidden("No CSRF token issued".to_string())
    })?;

    if !csrf::tokens_match(expected, &presented) {
        tracing::warn!("❌ CSRF: token mismatch");
        return Err(AppError::Forbidden("CSRF token mismatch".to_string()));
    }

    tracing::debug!("✅ CSRF token valid");
    Ok(next.run(req).await)
}
