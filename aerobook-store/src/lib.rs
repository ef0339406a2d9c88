pub mod admin_repo;
pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod flight_repo;
pub mod memory_session;
pub mod redis_repo;

pub use admin_repo::SqliteAdminRepository;
pub use booking_repo::SqliteBookingRepository;
pub use database::DbClient;
pub use flight_repo::SqliteFlightRepository;
pub use memory_session::MemorySessionStore;
pub use redis_repo::RedisSessionStore;
