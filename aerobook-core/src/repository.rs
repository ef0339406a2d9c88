use async_trait::async_trait;

use crate::booking::{BookingDetails, BookingRef, BookingUpdate, Itinerary, NewBooking, SeatCode};
use crate::flight::{Flight, NewFlight};
use crate::identity::AdminAccount;
use crate::search::FlightQuery;
use crate::wizard::WizardState;
use crate::CoreResult;

/// Flight inventory access
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn list_flights(&self) -> CoreResult<Vec<Flight>>;

    async fn get_flight(&self, num: i64) -> CoreResult<Option<Flight>>;

    async fn search_flights(&self, query: &FlightQuery) -> CoreResult<Vec<Flight>>;

    async fn create_flight(&self, flight: &NewFlight) -> CoreResult<Flight>;

    /// Returns `None` when no flight has this number.
    async fn update_flight(&self, num: i64, flight: &NewFlight) -> CoreResult<Option<Flight>>;

    /// Bookings referencing the flight are left untouched.
    async fn delete_flight(&self, num: i64) -> CoreResult<bool>;
}

/// Booking record access. Every lookup takes the id and reference together.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persists the booking, its passengers and their links atomically.
    /// Fails with `CoreError::Conflict` if the seat was taken meanwhile.
    async fn create_booking(&self, booking: &NewBooking) -> CoreResult<BookingRef>;

    async fn find_booking(&self, id: i64, reference: i64) -> CoreResult<Option<BookingDetails>>;

    async fn update_booking(&self, id: i64, reference: i64, update: &BookingUpdate) -> CoreResult<bool>;

    async fn cancel_booking(&self, id: i64, reference: i64) -> CoreResult<bool>;

    /// Seats already sold on any leg of the itinerary.
    async fn taken_seats(&self, itinerary: Itinerary) -> CoreResult<Vec<String>>;

    async fn seat_taken(&self, itinerary: Itinerary, seat: &SeatCode) -> CoreResult<bool>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn find_admin(&self, username: &str) -> CoreResult<Option<AdminAccount>>;

    /// Fails with `CoreError::Conflict` when the username is taken.
    async fn create_admin(&self, username: &str, hash: &str) -> CoreResult<AdminAccount>;
}

/// Per-visitor wizard storage keyed by session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> CoreResult<Option<WizardState>>;

    async fn save(&self, session_id: &str, state: &WizardState) -> CoreResult<()>;

    async fn clear(&self, session_id: &str) -> CoreResult<()>;
}
