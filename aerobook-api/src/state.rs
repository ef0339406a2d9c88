use std::sync::Arc;
use std::time::Duration;

use aerobook_core::repository::{AdminRepository, BookingRepository, FlightRepository, SessionStore};
use aerobook_store::app_config::{BookingRules, Config, SessionBackend};
use aerobook_store::{
    DbClient, MemorySessionStore, RedisSessionStore, SqliteAdminRepository,
    SqliteBookingRepository, SqliteFlightRepository,
};
use anyhow::Context;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub flight_repo: Arc<dyn FlightRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub admin_repo: Arc<dyn AdminRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub auth: AuthConfig,
    pub booking_rules: BookingRules,
}

impl AppState {
    /// Connects storage, applies migrations and picks the session backend.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let db = DbClient::new(&config.database.url, config.database.max_connections)
            .await
            .context("Failed to connect to database")?;
        db.migrate().await.context("Failed to run migrations")?;

        let ttl = config.session.ttl_seconds;
        let sessions: Arc<dyn SessionStore> = match config.session.backend {
            SessionBackend::Memory => Arc::new(MemorySessionStore::new(Duration::from_secs(ttl))),
            SessionBackend::Redis => {
                let url = config
                    .session
                    .redis_url
                    .as_deref()
                    .context("session.redis_url must be set for the redis backend")?;
                let store = RedisSessionStore::new(url, ttl).context("Invalid Redis URL")?;
                store.ping().await.context("Failed to connect to Redis")?;
                Arc::new(store)
            }
        };
        tracing::info!("Using {:?} session backend", config.session.backend);

        Ok(Self {
            flight_repo: Arc::new(SqliteFlightRepository::new(db.pool.clone())),
            booking_repo: Arc::new(SqliteBookingRepository::new(db.pool.clone())),
            admin_repo: Arc::new(SqliteAdminRepository::new(db.pool)),
            sessions,
            auth: AuthConfig {
                secret: config.auth.jwt_secret.clone(),
                expiration: config.auth.jwt_expiration_seconds,
            },
            booking_rules: config.booking.clone(),
        })
    }
}
