//! OAuth 2.0 authorization code flow against the identity provider.

use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

use crate::config::OAuthConfig;
use crate::errors::AppError;
use crate::models::OAuthProfile;

#[derive(Clone)]
pub struct OAuthClient {
    http: Client,
    config: OAuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    picture: String,
    #[serde(default)]
    name: String,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig, http: Client) -> Self {
        Self { http, config }
    }

    /// Authorization URL the browser is sent to.
    pub fn authorize_url(&self, state: &str) -> Result<Url, AppError> {
        let scope = self.config.scopes.join(" ");
        Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
                ("access_type", "offline"),
            ],
        )
        .map_err(|e| AppError::Internal(format!("Invalid OAuth authorization URL: {}", e)))
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await?;

        parse_json(response).await
    }

    pub async fn fetch_profile(&self, access_token: &str) -> Result<OAuthProfile, AppError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let info: UserInfo = parse_json(response).await?;
        Ok(OAuthProfile {
            id: info.sub,
            email: info.email,
            picture: info.picture,
            nickname: info.name,
        })
    }
}

async fn parse_json<T>(response: Response) -> Result<T, AppError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        tracing::warn!(status = %status, "OAuth provider rejected request: {}", body);
        return Err(AppError::Unauthorized(format!(
            "OAuth provider returned {}",
            status
        )));
    }

    Ok(response.json().await?)
}
