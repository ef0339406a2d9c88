use aerobook_core::SeatLayout;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub auth: AuthConfig,
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub redis_url: Option<String>,
    pub ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    pub max_passengers: u32,
    pub seat_rows: u32,
    pub seat_letters: String,
}

impl BookingRules {
    pub fn seat_layout(&self) -> SeatLayout {
        SeatLayout {
            rows: self.seat_rows,
            letters: self.seat_letters.clone(),
        }
    }
}

impl Default for BookingRules {
    fn default() -> Self {
        let layout = SeatLayout::default();
        Self {
            max_passengers: 9,
            seat_rows: layout.rows,
            seat_letters: layout.letters,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        Self::with_defaults()?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `AEROBOOK__DATABASE__URL=sqlite://prod.db`
            .add_source(config::Environment::with_prefix("AEROBOOK").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let rules = BookingRules::default();
        config::Config::builder()
            .set_default("server.port", 8000_i64)?
            .set_default("database.url", "sqlite://aerobook.db")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("session.backend", "memory")?
            .set_default("session.ttl_seconds", 3600_i64)?
            .set_default("auth.jwt_secret", "change-me-in-production")?
            .set_default("auth.jwt_expiration_seconds", 28_800_i64)?
            .set_default("booking.max_passengers", i64::from(rules.max_passengers))?
            .set_default("booking.seat_rows", i64::from(rules.seat_rows))?
            .set_default("booking.seat_letters", rules.seat_letters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deserialize() {
        let config: Config = Config::with_defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.session.backend, SessionBackend::Memory);
        assert!(config.session.redis_url.is_none());
        assert_eq!(config.booking.max_passengers, 9);
        assert_eq!(config.booking.seat_layout(), SeatLayout::default());
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let config: Config = Config::with_defaults()
            .unwrap()
            .set_override("session.backend", "redis")
            .unwrap()
            .set_override("session.redis_url", "redis://127.0.0.1/")
            .unwrap()
            .set_override("booking.seat_letters", "ABCD")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.session.backend, SessionBackend::Redis);
        assert_eq!(config.session.redis_url.as_deref(), Some("redis://127.0.0.1/"));
        assert_eq!(config.booking.seat_layout().letters(), vec!['A', 'B', 'C', 'D']);
    }
}
