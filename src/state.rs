use deadpool_postgres::Pool;

use crate::config::Config;
use crate::error::Result;
use crate::services::session::SessionStore;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool (the user store's capability).
    pub db: Pool,
    /// The server-side session store.
    pub sessions: SessionStore,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized with deadpool-postgres");

        let redis_client = redis::Client::open(config.redis_url.as_str())?;
        let redis = redis::aio::ConnectionManager::new(redis_client).await?;
        tracing::info!("✅ Redis connection manager initialized");

        let sessions = SessionStore::new(redis, config.session_duration_days);
        tracing::info!("✅ Session store initialized");

        Ok(AppState {
            db,
            sessions,
            config: config.clone(),
        })
    }
}
