use axum::{
    extract::Request,
    http::{header::SET_COOKIE, HeaderValue},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "aerobook_sid";

/// Opaque visitor id keying the wizard state in the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Gives every visitor a session id, minting one when the cookie is absent
/// or malformed.
pub async fn session_middleware(mut req: Request, next: Next) -> Response {
    let existing = CookieJar::from_headers(req.headers())
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| Uuid::parse_str(v).is_ok());

    let (id, fresh) = match existing {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    req.extensions_mut().insert(SessionId(id.clone()));
    let mut response = next.run(req).await;

    if fresh {
        let cookie = Cookie::build((SESSION_COOKIE, id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Failed to set session cookie: {}", e),
        }
    }

    response
}
