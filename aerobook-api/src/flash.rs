use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "aerobook_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// One-shot message shown by the next page that renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

pub fn set(jar: CookieJar, kind: FlashKind, message: impl Into<String>) -> CookieJar {
    let flash = Flash {
        kind,
        message: message.into(),
    };

    match serde_json::to_string(&flash) {
        Ok(value) => jar.add(
            Cookie::build((FLASH_COOKIE, value))
                .path("/")
                .http_only(true)
                .build(),
        ),
        Err(e) => {
            tracing::error!("Failed to encode flash message: {}", e);
            jar
        }
    }
}

/// Reads the pending message and schedules its removal.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let flash = match jar.get(FLASH_COOKIE) {
        Some(cookie) => serde_json::from_str(cookie.value()).ok(),
        None => return (jar, None),
    };

    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}

pub fn redirect(jar: CookieJar, to: &str, kind: FlashKind, message: impl Into<String>) -> Response {
    (set(jar, kind, message), Redirect::to(to)).into_response()
}
