//! Access token authentication.
//!
//! [`jwt_auth_layer`] resolves the caller's member id from the `access_token`
//! cookie or a bearer token. Handlers that need a caller take a
//! [`MemberIdentity`] argument, which rejects with 401 when none was resolved.

mod jwt;
mod oauth;

pub use jwt::*;
pub use oauth::*;

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use subtle::ConstantTimeEq;

use crate::errors::{codes, ErrorDetails, ErrorResponse};

/// Cookie carrying the signed access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
/// Cookie carrying the OAuth `state` between login and callback.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Authenticated member id, inserted into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberIdentity(pub String);

impl<S> FromRequestParts<S> for MemberIdentity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<MemberIdentity>()
            .cloned()
            .ok_or_else(|| unauthorized_response("Missing or invalid access token"))
    }
}

/// JWT authentication layer function that takes the verification keys as a parameter.
///
/// Never rejects on its own; an absent or invalid token leaves the request
/// without a [`MemberIdentity`].
pub async fn jwt_auth_layer(keys: JwtKeys, mut request: Request, next: Next) -> Response {
    let cookie_token = CookieJar::from_headers(request.headers())
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string());

    // Fall back to the Authorization header for non-browser clients
    let token = cookie_token.or_else(|| {
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    });

    if let Some(token) = token {
        match keys.verify(&token) {
            Ok(claims) => {
                request.extensions_mut().insert(MemberIdentity(claims.sub));
            }
            Err(e) => tracing::debug!("Ignoring access token: {}", e),
        }
    }

    next.run(request).await
}

/// Perform constant-time string comparison.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::UNAUTHORIZED.to_string(),
            message: message.to_string(),
        },
        revision_id: 0,
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
