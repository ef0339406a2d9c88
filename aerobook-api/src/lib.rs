use axum::Router;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod bookings;
pub mod error;
pub mod flash;
pub mod middleware;
pub mod search;
pub mod state;
pub mod wizard;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(search::routes())
        .merge(wizard::routes())
        .merge(bookings::routes())
        .merge(admin::routes(&state))
        .layer(axum::middleware::from_fn(middleware::session_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
