use aerobook_core::{CoreError, FareClass, Flight, FlightQuery, SearchCriteria, SearchForm, WizardError, WizardState};
use axum::{
    extract::{Extension, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::error::{bounce, Bounce, PageError};
use crate::flash::{self, Flash};
use crate::middleware::SessionId;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IndexView {
    pub flash: Option<Flash>,
    pub flights: Vec<Flight>,
    pub fare_classes: Vec<&'static str>,
    pub max_passengers: u32,
}

#[derive(Debug, Serialize)]
pub struct FlightListView {
    pub flash: Option<Flash>,
    pub criteria: SearchCriteria,
    pub flights: Vec<Flight>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(search))
        .route("/departure", get(departure))
        .route("/return-flight", get(return_flight))
}

const NO_DEPARTURE: &str = "Sorry, no departure flight found. Change your search or create your own flight in admin panel.";
const NO_RETURN: &str = "Sorry, no return flight found. Change your search or create your own flight in admin panel.";

async fn index(State(state): State<AppState>, jar: CookieJar) -> Result<Response, PageError> {
    let flights = state.flight_repo.list_flights().await?;
    let (jar, flash) = flash::take(jar);
    let view = IndexView {
        flash,
        flights,
        fare_classes: FareClass::ALL.iter().map(|c| c.as_str()).collect(),
        max_passengers: state.booking_rules.max_passengers,
    };
    Ok((jar, Json(view)).into_response())
}

/// Starts a fresh wizard from the search form.
async fn search(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
    Form(form): Form<SearchForm>,
) -> Result<Response, PageError> {
    let criteria = form
        .validate(state.booking_rules.max_passengers)
        .bounce_to(&jar, "/")?;

    tracing::info!(
        "Search {} -> {} on {} ({} passengers, round trip: {})",
        criteria.city_from,
        criteria.city_to,
        criteria.depart_date,
        criteria.passenger_count,
        criteria.is_round_trip()
    );

    state
        .sessions
        .save(session.as_str(), &WizardState::start(criteria))
        .await?;

    Ok(Redirect::to("/departure").into_response())
}

pub(crate) async fn load_wizard(state: &AppState, session: &SessionId) -> Result<WizardState, CoreError> {
    state
        .sessions
        .load(session.as_str())
        .await?
        .ok_or_else(|| WizardError::MissingStep("search").into())
}

async fn list_leg(
    state: &AppState,
    jar: CookieJar,
    criteria: SearchCriteria,
    query: &FlightQuery,
    empty_message: &str,
) -> Result<Response, PageError> {
    let flights = state.flight_repo.search_flights(query).await?;
    if flights.is_empty() {
        return Err(bounce(&jar, "/", empty_message));
    }

    let (jar, flash) = flash::take(jar);
    Ok((jar, Json(FlightListView { flash, criteria, flights })).into_response())
}

async fn departure(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    let wizard = load_wizard(&state, &session).await.bounce_to(&jar, "/")?;
    let query = wizard.criteria.outbound();
    list_leg(&state, jar, wizard.criteria, &query, NO_DEPARTURE).await
}

async fn return_flight(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    let wizard = load_wizard(&state, &session).await.bounce_to(&jar, "/")?;
    if wizard.depart_flight.is_none() {
        return Err(WizardError::MissingStep("departing flight")).bounce_to(&jar, "/");
    }
    let Some(query) = wizard.criteria.inbound() else {
        return Ok(Redirect::to("/personal-details").into_response());
    };
    list_leg(&state, jar, wizard.criteria, &query, NO_RETURN).await
}
