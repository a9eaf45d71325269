use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use weathermail_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "session";

/// Reject requests without a valid session before any handler (and so any
/// data access) runs. On success the claims are available as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = session_claims(req.headers(), &jar, &state.jwt_secret)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Claims from a Bearer header, falling back to the session cookie.
pub fn session_claims(headers: &HeaderMap, jar: &CookieJar, secret: &str) -> Option<Claims> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    match bearer {
        Some(token) => decode_token(token, secret),
        None => jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| decode_token(cookie.value(), secret)),
    }
}

fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}
