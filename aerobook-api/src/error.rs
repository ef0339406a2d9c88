use aerobook_core::{CoreError, WizardError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::flash::{self, FlashKind};

pub const SESSION_EXPIRED: &str =
    "Your booking session has expired or is incomplete. Please start a new search.";

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => AppError::ValidationError(msg),
            CoreError::Conflict(msg) => AppError::ConflictError(msg),
            CoreError::Wizard(e) => AppError::ValidationError(e.to_string()),
            other @ (CoreError::Internal(_) | CoreError::Storage(_)) => {
                AppError::Anyhow(anyhow::Error::new(other))
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Anyhow(err)
    }
}

/// Failure of a form-driven page. Mistakes the visitor can correct send them
/// back to a page with a flash message; anything else renders as `AppError`.
pub enum PageError {
    Bounce {
        jar: CookieJar,
        to: String,
        message: String,
    },
    App(AppError),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::Bounce { jar, to, message } => {
                flash::redirect(jar, &to, FlashKind::Error, message)
            }
            PageError::App(err) => err.into_response(),
        }
    }
}

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        PageError::App(err)
    }
}

impl From<CoreError> for PageError {
    fn from(err: CoreError) -> Self {
        PageError::App(err.into())
    }
}

pub trait Bounce<T> {
    /// Sends user-facing failures back to `to` with the error as a flash
    /// message. A missing wizard step always restarts at the search page.
    fn bounce_to(self, jar: &CookieJar, to: &str) -> Result<T, PageError>;
}

impl<T, E: Into<CoreError>> Bounce<T> for Result<T, E> {
    fn bounce_to(self, jar: &CookieJar, to: &str) -> Result<T, PageError> {
        self.map_err(|err| match err.into() {
            CoreError::Wizard(WizardError::MissingStep(step)) => {
                tracing::debug!("Wizard step missing: {}", step);
                PageError::Bounce {
                    jar: jar.clone(),
                    to: "/".to_string(),
                    message: SESSION_EXPIRED.to_string(),
                }
            }
            err if err.is_user_facing() => PageError::Bounce {
                jar: jar.clone(),
                to: to.to_string(),
                message: err.to_string(),
            },
            err => PageError::App(err.into()),
        })
    }
}

pub fn bounce(jar: &CookieJar, to: &str, message: impl Into<String>) -> PageError {
    PageError::Bounce {
        jar: jar.clone(),
        to: to.to_string(),
        message: message.into(),
    }
}
