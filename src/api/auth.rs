//! Login, signup and profile endpoints.

use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use super::{current_revision, error, success, ApiResponse, ApiResult};
use crate::auth::{constant_time_compare, MemberIdentity, ACCESS_TOKEN_COOKIE, OAUTH_STATE_COOKIE};
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::{MeResponse, SignupRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LoginUrl {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUp {
    pub member_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// GET /v1/auth/login - Authorization URL plus a fresh `state` cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<LoginUrl>), AppErrorWithRevision> {
    let revision_id = current_revision(&state.pool).await;
    let oauth_state = uuid::Uuid::new_v4().to_string();

    let url = state
        .oauth
        .authorize_url(&oauth_state)
        .map_err(|error| AppErrorWithRevision { error, revision_id })?;

    let jar = jar.add(session_cookie(OAUTH_STATE_COOKIE, oauth_state));
    Ok((
        jar,
        ApiResponse::new(
            LoginUrl {
                url: url.to_string(),
            },
            revision_id,
        ),
    ))
}

/// GET /login/oauth2/code/google - OAuth callback.
///
/// Verifies `state`, exchanges the code, records the login and sets the
/// access token cookie before redirecting to the frontend.
pub async fn oauth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), AppError> {
    if let Some(reason) = params.error {
        tracing::warn!("OAuth provider returned error: {}", reason);
        return Err(AppError::Unauthorized(format!("Login failed: {}", reason)));
    }

    let expected = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Missing OAuth state".to_string()))?;
    let provided = params
        .state
        .ok_or_else(|| AppError::BadRequest("Missing state parameter".to_string()))?;
    if !constant_time_compare(&provided, &expected) {
        tracing::warn!("OAuth state mismatch");
        return Err(AppError::Unauthorized("OAuth state mismatch".to_string()));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing code parameter".to_string()))?;

    let token = state.oauth.exchange_code(&code).await?;
    let profile = state.oauth.fetch_profile(&token.access_token).await?;
    tracing::info!(member_id = %profile.id, "OAuth login completed");

    let access_token = state.members.complete_login(profile).await?;

    let jar = jar
        .remove(expired_cookie(OAUTH_STATE_COOKIE))
        .add(session_cookie(ACCESS_TOKEN_COOKIE, access_token));
    Ok((jar, Redirect::temporary(&state.config.frontend_url)))
}

/// POST /v1/auth/logout - Clear the access token cookie.
pub async fn logout(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
    jar: CookieJar,
) -> (CookieJar, ApiResponse<()>) {
    tracing::debug!(member_id = %member_id, "Logging out");
    let revision_id = current_revision(&state.pool).await;
    (
        jar.remove(expired_cookie(ACCESS_TOKEN_COOKIE)),
        ApiResponse::new((), revision_id),
    )
}

/// POST /v1/auth/signup - Complete signup for the caller's transient record.
pub async fn signup(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
    Json(request): Json<SignupRequest>,
) -> ApiResult<SignedUp> {
    let revision_id = current_revision(&state.pool).await;

    match state.members.signup(&member_id, request).await {
        Ok(member_id) => {
            let new_revision = current_revision(&state.pool).await;
            success(SignedUp { member_id }, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /v1/me - The caller's profile, signed up or still transient.
pub async fn me(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
) -> ApiResult<MeResponse> {
    let revision_id = current_revision(&state.pool).await;

    match state.members.me(&member_id).await {
        Ok(me) => success(me, revision_id),
        Err(e) => error(e, revision_id),
    }
}
