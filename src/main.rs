use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use http::{header, Method};
use std::net::SocketAddr;
use std::time::Duration;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod state;
mod db;
mod crypto {
    pub mod csrf;
    pub mod password;
}

mod models {
    pub mod session;
    pub mod user;
}

mod repositories {
    pub mod user;
}

mod services {
    pub mod auth;
    pub mod session;
}

mod handlers {
    pub mod auth;
    pub mod upload;
    pub mod users;
}

mod middleware_layer {
    pub mod auth;
    pub mod csrf;
}

mod validation {
    pub mod auth;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::COOKIE,
            "x-csrf-token".parse().unwrap(),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400));

    // Anonymous endpoints. Login deliberately skips the CSRF guard; see
    // DESIGN.md for the recorded policy choice.
    let anon_routes = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/csrf-token", get(handlers::auth::csrf_token))
        .with_state(state.clone());

    // Registration is anonymous but state-changing: it requires the
    // pre-session CSRF token fetched from /api/csrf-token.
    let register_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::csrf::verify_csrf,
        ))
        .with_state(state.clone());

    // Authenticated, non-mutating endpoints.
    let protected_routes = Router::new()
        .route(
            "/api/auth/logout",
            get(handlers::auth::logout).post(handlers::auth::logout),
        )
        .route("/api/users", get(handlers::users::list_users))
        .route("/api/users/get", get(handlers::users::get_user))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    // Mutating endpoints: auth runs first (outermost), then CSRF.
    let mutating_routes = Router::new()
        .route(
            "/api/users/update",
            post(handlers::users::update_user).put(handlers::users::update_user),
        )
        .route("/api/users/delete", post(handlers::users::delete_user))
        .route("/api/files/upload", post(handlers::upload::upload_file))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::csrf::verify_csrf,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let app = Router::new()
        .merge(anon_routes)
        .merge(register_routes)
        .merge(protected_routes)
        .merge(mutating_routes)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024))
        .layer(cors);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
