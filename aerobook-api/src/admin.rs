use aerobook_core::identity::hash_password;
use aerobook_core::{Credentials, Flight, FlightForm};
use aerobook_shared::Masked;
use axum::{
    extract::{Extension, Path, State},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{bounce, AppError, Bounce, PageError};
use crate::flash::{self, Flash, FlashKind};
use crate::middleware::auth::{self as admin_auth, admin_auth_middleware, AdminClaims};
use crate::state::AppState;

const ALREADY_LOGGED_IN: &str = "You are already logged in.";
const MISSING_FLIGHT: &str = "Flight doesn't exist";

#[derive(Debug, Serialize)]
pub struct PanelView {
    pub flash: Option<Flash>,
    pub admin: String,
    pub flights: Vec<Flight>,
}

#[derive(Debug, Serialize)]
pub struct EditView {
    pub flash: Option<Flash>,
    pub flight: Flight,
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub flash: Option<Flash>,
}

pub fn routes(state: &AppState) -> Router<AppState> {
    let panel = Router::new()
        .route("/admin", get(panel).post(create_flight))
        .route("/admin/delete/{num}", get(delete_flight))
        .route("/admin/edit/{num}", get(edit_form).post(edit_flight))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .route("/admin/create", get(account_page).post(create_account))
        .route("/admin/login", get(account_page).post(login))
        .route("/admin/logout", get(logout))
        .merge(panel)
}

async fn panel(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    let flights = state.flight_repo.list_flights().await?;
    let (jar, flash) = flash::take(jar);
    let view = PanelView {
        flash,
        admin: claims.sub,
        flights,
    };
    Ok((jar, Json(view)).into_response())
}

async fn create_flight(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    jar: CookieJar,
    Form(form): Form<FlightForm>,
) -> Result<Response, PageError> {
    let flight = form.validate().bounce_to(&jar, "/admin")?;
    let created = state.flight_repo.create_flight(&flight).await?;

    info!("Admin {} added flight {}", claims.sub, created.num);
    Ok(flash::redirect(jar, "/admin", FlashKind::Success, "Flight added successfully."))
}

async fn delete_flight(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    jar: CookieJar,
    Path(num): Path<i64>,
) -> Result<Response, PageError> {
    if !state.flight_repo.delete_flight(num).await? {
        return Err(AppError::NotFoundError(MISSING_FLIGHT.to_string()).into());
    }

    info!("Admin {} deleted flight {}", claims.sub, num);
    Ok(flash::redirect(jar, "/admin", FlashKind::Success, "Flight deleted."))
}

async fn edit_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(num): Path<i64>,
) -> Result<Response, PageError> {
    let flight = state
        .flight_repo
        .get_flight(num)
        .await?
        .ok_or_else(|| AppError::NotFoundError(MISSING_FLIGHT.to_string()))?;

    let (jar, flash) = flash::take(jar);
    Ok((jar, Json(EditView { flash, flight })).into_response())
}

async fn edit_flight(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    jar: CookieJar,
    Path(num): Path<i64>,
    Form(form): Form<FlightForm>,
) -> Result<Response, PageError> {
    if state.flight_repo.get_flight(num).await?.is_none() {
        return Err(AppError::NotFoundError(MISSING_FLIGHT.to_string()).into());
    }

    let flight = form
        .validate()
        .bounce_to(&jar, &format!("/admin/edit/{}", num))?;

    if state.flight_repo.update_flight(num, &flight).await?.is_none() {
        return Err(AppError::NotFoundError(MISSING_FLIGHT.to_string()).into());
    }

    info!("Admin {} edited flight {}", claims.sub, num);
    Ok(flash::redirect(jar, "/admin", FlashKind::Success, "Changes saved."))
}

/// Shared by the create-account and login pages.
async fn account_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    if admin_auth::current_admin(&state.auth, &jar).is_some() {
        return flash::redirect(jar, "/admin", FlashKind::Success, ALREADY_LOGGED_IN);
    }

    let (jar, flash) = flash::take(jar);
    (jar, Json(AccountView { flash })).into_response()
}

async fn create_account(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Result<Response, PageError> {
    if admin_auth::current_admin(&state.auth, &jar).is_some() {
        return Ok(flash::redirect(jar, "/admin", FlashKind::Success, ALREADY_LOGGED_IN));
    }

    let (username, password) = credentials.validate().bounce_to(&jar, "/admin/create")?;
    if state.admin_repo.find_admin(&username).await?.is_some() {
        return Err(bounce(&jar, "/admin/create", "Username already exists"));
    }

    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Hashing task failed: {}", e)))??;

    let admin = state
        .admin_repo
        .create_admin(&username, &hash)
        .await
        .bounce_to(&jar, "/admin/create")?;

    info!("Admin account {} created (id {})", admin.username, admin.id);
    Ok(flash::redirect(
        jar,
        "/admin/login",
        FlashKind::Success,
        "Account created successfully.",
    ))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Result<Response, PageError> {
    if admin_auth::current_admin(&state.auth, &jar).is_some() {
        return Ok(flash::redirect(jar, "/admin", FlashKind::Success, ALREADY_LOGGED_IN));
    }

    let (username, password) = credentials.validate().bounce_to(&jar, "/admin/login")?;
    let account = state.admin_repo.find_admin(&username).await?;

    let verified = match account {
        Some(account) => {
            let password = password.to_owned();
            tokio::task::spawn_blocking(move || account.verify(&password).then_some(account))
                .await
                .map_err(|e| AppError::InternalServerError(format!("Verification task failed: {}", e)))?
        }
        None => None,
    };

    let Some(account) = verified else {
        warn!("Rejected login for {}", Masked::new(username.as_str()));
        return Err(bounce(&jar, "/admin/login", "Incorrect credentials!"));
    };

    let token = admin_auth::issue_token(&state.auth, account.id, &account.username)?;
    let jar = jar.add(admin_auth::login_cookie(token));

    info!("Admin {} logged in", account.username);
    Ok(flash::redirect(jar, "/admin", FlashKind::Success, "Successfully logged in"))
}

async fn logout(jar: CookieJar) -> Response {
    flash::redirect(
        admin_auth::logout(jar),
        "/admin/login",
        FlashKind::Success,
        "Successfully logged out.",
    )
}
