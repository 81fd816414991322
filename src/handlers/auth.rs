use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    error::Result,
    middleware_layer::auth::{extract_session_id, SESSION_COOKIE},
    models::session::SessionId,
    models::user::Principal,
    services::auth as auth_service,
    state::AppState,
};

/// The request payload for user registration.
#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// The request payload for user login.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The response payload for registration.
#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub id: Uuid,
    pub user: Principal,
    pub message: String,
}

/// The response payload for login.
#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Principal,
}

/// The response payload for logout.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// The response payload for the CSRF token fetch.
#[derive(Serialize)]
pub struct CsrfTokenResponse {
    pub token: String,
}

/// Creates the session cookie: HttpOnly, SameSite=Lax, Secure in production.
fn create_session_cookie(value: String, max_age_days: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);

    let is_production = std::env::var("APP_ENV")
        .unwrap_or_else(|_| "development".to_string()) == "production";

    cookie.set_http_only(true);

    if is_production {
        cookie.set_secure(true);
    }

    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::seconds(max_age_days * 86400));
    cookie.set_path("/");

    cookie
}

/// Installs a freshly rotated, authenticated session for `principal`.
///
/// The session id presented by the client (if any) is destroyed first so an
/// attacker-chosen id can never survive the anonymous→authenticated
/// transition.
async fn install_session(
    state: &AppState,
    cookies: &Cookies,
    principal: Principal,
) -> Result<Uuid> {
    let old_session_id = extract_session_id(cookies);

    let (session_id, _session) = state
        .sessions
        .rotate(old_session_id.as_ref(), principal)
        .await?;

    cookies.add(create_session_cookie(
        session_id.to_string(),
        state.config.session_duration_days,
    ));

    tracing::info!("✅ Session cookie set: {}", session_id);
    Ok(session_id)
}

/// Handles user registration.
///
/// The CSRF middleware has already checked the pre-session token fetched
/// from `/api/csrf-token`. On success the new user is logged in under a
/// regenerated session id.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt");

    let principal = auth_service::register(
        &state.db,
        &payload.name,
        &payload.email,
        &payload.password,
    )
    .await?;

    install_session(&state, &cookies, principal.clone()).await?;

    let response = RegisterResponse {
        success: true,
        id: principal.id,
        user: principal,
        message: "Registration successful. You are now logged in.".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user login.
///
/// Login carries no CSRF check: it is unauthenticated but state-changing,
/// a tension preserved deliberately from the upstream behavior (see
/// DESIGN.md). The session id is regenerated on success.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    let principal = auth_service::login(&state.db, &payload.email, &payload.password).await?;

    install_session(&state, &cookies, principal.clone()).await?;

    let response = LoginResponse {
        success: true,
        user: principal,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout: the session is destroyed server-side, not merely
/// forgotten by the client.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    cookies: Cookies,
) -> Result<Response> {
    state.sessions.destroy(&session_id.0).await?;

    let mut session_cookie = Cookie::new(SESSION_COOKIE, "");
    session_cookie.set_max_age(Duration::seconds(0));
    session_cookie.set_path("/");
    cookies.remove(session_cookie);

    tracing::info!("👋 User logged out, session {} destroyed", session_id.0);

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Issues the session's CSRF token, creating an anonymous session first if
/// the client has none. Idempotent: repeated calls return the same token.
#[axum::debug_handler]
pub async fn csrf_token(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Response> {
    let existing = match extract_session_id(&cookies) {
        Some(id) => state.sessions.load(&id).await?.map(|s| (id, s)),
        None => None,
    };

    let (session_id, mut session) = match existing {
        Some(found) => found,
        None => {
            let (session_id, session) = state.sessions.create(None).await?;
            cookies.add(create_session_cookie(
                session_id.to_string(),
                state.config.session_duration_days,
            ));
            (session_id, session)
        }
    };

    let token = state.sessions.issue_csrf(&session_id, &mut session).await?;

    Ok((StatusCode::OK, Json(CsrfTokenResponse { token })).into_response())
}
