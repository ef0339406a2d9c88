pub mod booking;
pub mod flight;
pub mod identity;
pub mod repository;
pub mod search;
pub mod wizard;

pub use booking::{
    Booking, BookingDetails, BookingRef, BookingUpdate, ContactDetails, Itinerary, NewBooking,
    Passenger, PassengerDetails, SeatCode, SeatLayout,
};
pub use flight::{FareClass, Flight, FlightForm, NewFlight};
pub use identity::{AdminAccount, Credentials};
pub use search::{FlightQuery, SearchCriteria, SearchForm};
pub use wizard::{NextStep, WizardError, WizardStage, WizardState};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("Internal service error: {0}")]
    Internal(String),
    #[error("Storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CoreError {
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Storage(err.into())
    }

    /// True for errors the visitor can fix by editing the form they submitted.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_) | CoreError::Conflict(_) | CoreError::Wizard(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

pub(crate) fn required(label: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{} is required.", label)));
    }
    Ok(trimmed.to_string())
}
