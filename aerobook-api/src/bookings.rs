use std::collections::HashMap;

use aerobook_core::{Booking, BookingUpdate, Flight, Passenger};
use aerobook_shared::Masked;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{bounce, AppError, Bounce, PageError};
use crate::flash::{self, Flash, FlashKind};
use crate::state::AppState;

const WRONG_PAIR: &str = "Booking id or reference isn't correct";

#[derive(Debug, Serialize)]
pub struct ConfirmedView {
    pub booking: Booking,
    pub depart_flight: Option<Flight>,
    pub return_flight: Option<Flight>,
    pub passengers: Vec<Passenger>,
}

#[derive(Debug, Serialize)]
pub struct ManageFormView {
    pub flash: Option<Flash>,
}

#[derive(Debug, Deserialize)]
pub struct ManageLookup {
    #[serde(default)]
    pub booking_id: String,
    #[serde(default)]
    pub booking_ref: String,
}

#[derive(Debug, Serialize)]
pub struct ManageView {
    pub flash: Option<Flash>,
    pub booking: Booking,
    pub passengers: Vec<Passenger>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/confirmed/{id}/{reference}", get(confirmed))
        .route("/manage-form", get(manage_form).post(lookup))
        .route("/manage/{id}/{reference}", get(manage).post(update))
        .route("/cancel/{id}/{reference}", get(cancel))
}

async fn confirmed(
    State(state): State<AppState>,
    Path((id, reference)): Path<(i64, i64)>,
) -> Result<Json<ConfirmedView>, AppError> {
    let details = state
        .booking_repo
        .find_booking(id, reference)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking reference number isn't correct.".to_string()))?;

    let itinerary = details.booking.itinerary();
    let depart_flight = state.flight_repo.get_flight(itinerary.depart).await?;
    let return_flight = match itinerary.ret {
        Some(num) => state.flight_repo.get_flight(num).await?,
        None => None,
    };

    Ok(Json(ConfirmedView {
        booking: details.booking,
        depart_flight,
        return_flight,
        passengers: details.passengers,
    }))
}

async fn manage_form(jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    (jar, Json(ManageFormView { flash })).into_response()
}

async fn lookup(jar: CookieJar, Form(form): Form<ManageLookup>) -> Result<Redirect, PageError> {
    let id = form.booking_id.trim().parse::<i64>();
    let reference = form.booking_ref.trim().parse::<i64>();

    match (id, reference) {
        (Ok(id), Ok(reference)) => Ok(Redirect::to(&format!("/manage/{}/{}", id, reference))),
        _ => Err(bounce(&jar, "/manage-form", WRONG_PAIR)),
    }
}

async fn manage(
    State(state): State<AppState>,
    jar: CookieJar,
    Path((id, reference)): Path<(i64, i64)>,
) -> Result<Response, PageError> {
    let Some(details) = state.booking_repo.find_booking(id, reference).await? else {
        return Err(bounce(&jar, "/manage-form", WRONG_PAIR));
    };

    let (jar, flash) = flash::take(jar);
    let view = ManageView {
        flash,
        booking: details.booking,
        passengers: details.passengers,
    };
    Ok((jar, Json(view)).into_response())
}

async fn update(
    State(state): State<AppState>,
    jar: CookieJar,
    Path((id, reference)): Path<(i64, i64)>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, PageError> {
    let Some(details) = state.booking_repo.find_booking(id, reference).await? else {
        return Err(bounce(&jar, "/manage-form", WRONG_PAIR));
    };

    let here = format!("/manage/{}/{}", id, reference);
    let changes = BookingUpdate::from_form(&form, &details.passengers).bounce_to(&jar, &here)?;

    if !state.booking_repo.update_booking(id, reference, &changes).await? {
        return Err(bounce(&jar, "/manage-form", WRONG_PAIR));
    }

    info!(
        "Booking {} updated, contact now {}",
        id,
        Masked::new(changes.contact.email.as_str())
    );
    Ok(flash::redirect(jar, &here, FlashKind::Success, "Changes saved!"))
}

async fn cancel(
    State(state): State<AppState>,
    jar: CookieJar,
    Path((id, reference)): Path<(i64, i64)>,
) -> Result<Response, PageError> {
    if !state.booking_repo.cancel_booking(id, reference).await? {
        return Err(AppError::NotFoundError(WRONG_PAIR.to_string()).into());
    }

    info!("Booking {} cancelled", id);
    Ok(flash::redirect(
        jar,
        "/",
        FlashKind::Success,
        "Successfully deleted booking and passenger records.",
    ))
}
