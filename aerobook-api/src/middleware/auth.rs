use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::flash::{self, FlashKind};
use crate::state::{AppState, AuthConfig};

pub const ADMIN_COOKIE: &str = "aerobook_admin";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    pub admin_id: i64,
    pub exp: usize,
}

pub fn issue_token(auth: &AuthConfig, admin_id: i64, username: &str) -> Result<String, AppError> {
    let exp = i64::try_from(auth.expiration)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .and_then(|at| usize::try_from(at.timestamp()).ok())
        .ok_or_else(|| {
            AppError::InternalServerError(format!(
                "auth.jwt_expiration_seconds {} is out of range",
                auth.expiration
            ))
        })?;

    let claims = AdminClaims {
        sub: username.to_owned(),
        admin_id,
        exp,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

pub fn login_cookie(token: String) -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn logout(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ADMIN_COOKIE).path("/"))
}

fn decode_claims(auth: &AuthConfig, token: &str) -> Option<AdminClaims> {
    decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

/// The signed-in admin, if the cookie carries a valid token.
pub fn current_admin(auth: &AuthConfig, jar: &CookieJar) -> Option<AdminClaims> {
    jar.get(ADMIN_COOKIE)
        .and_then(|cookie| decode_claims(auth, cookie.value()))
}

/// Guards the admin panel. Accepts the login cookie or a Bearer header;
/// anyone else is sent to the login page.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(|token| decode_claims(&state.auth, token));

    match bearer.or_else(|| current_admin(&state.auth, &jar)) {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => {
            tracing::debug!("Unauthenticated request to {}", req.uri().path());
            flash::redirect(
                jar,
                "/admin/login",
                FlashKind::Error,
                "Please login or create account to access admin panel",
            )
        }
    }
}
