use std::collections::HashMap;

use aerobook_core::booking::normalize_meal;
use aerobook_core::{
    ContactDetails, CoreError, CoreResult, Flight, Itinerary, NextStep, PassengerDetails, SeatCode,
    WizardError,
};
use aerobook_shared::Masked;
use axum::{
    extract::{Extension, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, Bounce, PageError};
use crate::flash::{self, Flash};
use crate::middleware::SessionId;
use crate::search::load_wizard;
use crate::state::AppState;

const SEAT_PAGE: &str = "/seat?chosenSeat=NA";

pub const MEAL_OPTIONS: [&str; 6] = ["Standard", "Vegetarian", "Vegan", "Halal", "Kosher", "Gluten-free"];

#[derive(Debug, Serialize)]
pub struct DetailsView {
    pub flash: Option<Flash>,
    pub passenger_count: u32,
    pub passengers: Vec<PassengerDetails>,
}

#[derive(Debug, Deserialize)]
pub struct SeatQuery {
    #[serde(rename = "chosenSeat", default)]
    pub chosen_seat: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeatView {
    pub flash: Option<Flash>,
    pub rows: u32,
    pub letters: Vec<char>,
    pub taken: Vec<String>,
    pub chosen_seat: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MealView {
    pub flash: Option<Flash>,
    pub options: Vec<&'static str>,
    pub selected: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub flash: Option<Flash>,
    pub depart_flight: Flight,
    pub return_flight: Option<Flight>,
    pub passenger_count: u32,
    pub passengers: Vec<PassengerDetails>,
    pub seat: String,
    pub meal: String,
    pub total_price: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/save_flight/{num}", get(save_flight))
        .route("/personal-details", get(personal_details).post(save_details))
        .route("/seat", get(seat))
        .route("/save-seat/{seat}", get(save_seat))
        .route("/meal", get(meal))
        .route("/meal/{preference}", get(save_meal))
        .route("/payment", get(payment).post(confirm_payment))
}

async fn save_flight(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
    Path(num): Path<i64>,
) -> Result<Response, PageError> {
    let mut wizard = load_wizard(&state, &session).await.bounce_to(&jar, "/")?;

    if state.flight_repo.get_flight(num).await?.is_none() {
        return Err(AppError::NotFoundError("Flight doesn't exist".to_string()).into());
    }

    let next = wizard.choose_flight(num);
    state.sessions.save(session.as_str(), &wizard).await?;

    Ok(match next {
        NextStep::ReturnFlight => Redirect::to("/return-flight"),
        NextStep::PersonalDetails => Redirect::to("/personal-details"),
    }
    .into_response())
}

async fn personal_details(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    let wizard = load_wizard(&state, &session).await.bounce_to(&jar, "/")?;
    wizard.itinerary().bounce_to(&jar, "/")?;

    let (jar, flash) = flash::take(jar);
    let view = DetailsView {
        flash,
        passenger_count: wizard.criteria.passenger_count,
        passengers: wizard.passengers,
    };
    Ok((jar, Json(view)).into_response())
}

async fn save_details(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, PageError> {
    let mut wizard = load_wizard(&state, &session).await.bounce_to(&jar, "/")?;

    let passengers = PassengerDetails::from_form(&form, wizard.criteria.passenger_count)
        .bounce_to(&jar, "/personal-details")?;
    let contact = ContactDetails::from_form(&form).bounce_to(&jar, "/personal-details")?;
    let email = Masked::new(contact.email.clone());

    wizard
        .set_details(passengers, contact)
        .bounce_to(&jar, "/personal-details")?;
    state.sessions.save(session.as_str(), &wizard).await?;

    tracing::debug!("Passenger details saved for contact {}", email);
    Ok(Redirect::to(SEAT_PAGE).into_response())
}

async fn seat(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
    Query(query): Query<SeatQuery>,
) -> Result<Response, PageError> {
    let wizard = load_wizard(&state, &session).await.bounce_to(&jar, "/")?;
    let itinerary = wizard.itinerary().bounce_to(&jar, "/")?;
    let taken = state.booking_repo.taken_seats(itinerary).await?;
    let layout = state.booking_rules.seat_layout();

    let (jar, flash) = flash::take(jar);
    let view = SeatView {
        flash,
        rows: layout.rows,
        letters: layout.letters(),
        taken,
        chosen_seat: query.chosen_seat,
    };
    Ok((jar, Json(view)).into_response())
}

async fn save_seat(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
    Path(raw): Path<String>,
) -> Result<Response, PageError> {
    let mut wizard = load_wizard(&state, &session).await.bounce_to(&jar, "/")?;
    let itinerary = wizard.itinerary().bounce_to(&jar, "/")?;
    let seat = SeatCode::parse(&raw, &state.booking_rules.seat_layout()).bounce_to(&jar, SEAT_PAGE)?;

    if state.booking_repo.seat_taken(itinerary, &seat).await? {
        return Err(CoreError::Conflict(format!(
            "Seat {} is already taken. Please choose another seat.",
            seat
        )))
        .bounce_to(&jar, SEAT_PAGE);
    }

    wizard.choose_seat(seat).bounce_to(&jar, SEAT_PAGE)?;
    state.sessions.save(session.as_str(), &wizard).await?;

    Ok(Redirect::to("/meal").into_response())
}

async fn meal(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    let wizard = load_wizard(&state, &session).await.bounce_to(&jar, "/")?;
    if wizard.seat.is_none() {
        return Err(WizardError::MissingStep("seat")).bounce_to(&jar, "/");
    }

    let (jar, flash) = flash::take(jar);
    let view = MealView {
        flash,
        options: MEAL_OPTIONS.to_vec(),
        selected: wizard.meal,
    };
    Ok((jar, Json(view)).into_response())
}

async fn save_meal(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
    Path(preference): Path<String>,
) -> Result<Response, PageError> {
    let mut wizard = load_wizard(&state, &session).await.bounce_to(&jar, "/")?;
    let meal = normalize_meal(&preference).bounce_to(&jar, "/meal")?;

    wizard.choose_meal(meal).bounce_to(&jar, "/meal")?;
    state.sessions.save(session.as_str(), &wizard).await?;

    Ok(Redirect::to("/payment").into_response())
}

/// Both legs of the itinerary, failing when either was deleted mid-booking.
async fn leg_flights(state: &AppState, itinerary: Itinerary) -> CoreResult<(Flight, Option<Flight>)> {
    let gone = || {
        CoreError::Conflict(
            "The selected flight is no longer available. Please start a new search.".to_string(),
        )
    };

    let depart = state
        .flight_repo
        .get_flight(itinerary.depart)
        .await?
        .ok_or_else(gone)?;

    let ret = match itinerary.ret {
        Some(num) => Some(state.flight_repo.get_flight(num).await?.ok_or_else(gone)?),
        None => None,
    };

    Ok((depart, ret))
}

/// Fare per passenger summed over both legs.
pub fn total_price(depart: &Flight, ret: Option<&Flight>, passengers: u32) -> CoreResult<i64> {
    depart
        .price
        .checked_add(ret.map_or(0, |f| f.price))
        .and_then(|fare| fare.checked_mul(i64::from(passengers)))
        .ok_or_else(|| {
            CoreError::Validation(
                "The total price of this booking is out of range. Please contact the airline.".to_string(),
            )
        })
}

async fn payment(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    let wizard = load_wizard(&state, &session).await.bounce_to(&jar, "/")?;
    let booking = wizard.checkout().bounce_to(&jar, "/")?;
    let (depart_flight, return_flight) = leg_flights(&state, booking.itinerary)
        .await
        .bounce_to(&jar, "/")?;

    let passenger_count = wizard.criteria.passenger_count;
    let total = total_price(&depart_flight, return_flight.as_ref(), passenger_count).bounce_to(&jar, "/")?;

    let (jar, flash) = flash::take(jar);
    let view = PaymentView {
        flash,
        depart_flight,
        return_flight,
        passenger_count,
        passengers: booking.passengers,
        seat: booking.seat.to_string(),
        meal: booking.meal,
        total_price: total,
    };
    Ok((jar, Json(view)).into_response())
}

/// Commits the booking and ends the wizard, so a resubmitted form finds
/// nothing to book.
async fn confirm_payment(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    let wizard = load_wizard(&state, &session).await.bounce_to(&jar, "/")?;
    let booking = wizard.checkout().bounce_to(&jar, "/")?;
    let (depart_flight, return_flight) = leg_flights(&state, booking.itinerary)
        .await
        .bounce_to(&jar, "/")?;
    total_price(&depart_flight, return_flight.as_ref(), wizard.criteria.passenger_count)
        .bounce_to(&jar, "/")?;

    let reference = state
        .booking_repo
        .create_booking(&booking)
        .await
        .bounce_to(&jar, SEAT_PAGE)?;
    state.sessions.clear(session.as_str()).await?;

    info!(
        "Booking {} committed for {} passengers on flights {:?}",
        reference.id,
        booking.passengers.len(),
        booking.itinerary.flight_nums()
    );

    Ok(Redirect::to(&format!("/confirmed/{}/{}", reference.id, reference.reference)).into_response())
}
