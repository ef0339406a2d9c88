pub mod auth;
pub mod session;

pub use auth::{admin_auth_middleware, AdminClaims};
pub use session::{session_middleware, SessionId};
