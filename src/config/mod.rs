//! Configuration module for the team recruitment backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! The resulting [`Config`] is built once at start-up and handed to the
//! collaborators that need it (JWT keys, OAuth client, transaction manager).

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Upper bound on the lifetime of a single write transaction
    pub tx_timeout: Duration,
    /// Where the browser lands after a completed OAuth login
    pub frontend_url: String,
    pub jwt: JwtConfig,
    pub oauth: OAuthConfig,
}

/// Signing parameters for access tokens.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// OAuth client registration and provider endpoints.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let db_path = env::var("TEAMUP_DB_PATH")
            .unwrap_or_else(|_| "./data/teamup.sqlite".to_string())
            .into();

        let bind_addr = env::var("TEAMUP_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| format!("Invalid TEAMUP_BIND_ADDR format: {}", e))?;

        let log_level = env::var("TEAMUP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let tx_timeout = Duration::from_secs(parse_secs("TEAMUP_TX_TIMEOUT_SECS", 10)?);

        let frontend_url =
            env::var("TEAMUP_FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000/".to_string());

        let jwt = JwtConfig {
            secret: env::var("TEAMUP_JWT_SECRET").unwrap_or_default(),
            ttl: Duration::from_secs(parse_secs("TEAMUP_JWT_TTL_SECS", 30 * 60)?),
        };

        let scopes = env::var("TEAMUP_OAUTH_SCOPES")
            .unwrap_or_else(|_| "openid,email,profile".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let oauth = OAuthConfig {
            client_id: env::var("TEAMUP_OAUTH_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("TEAMUP_OAUTH_CLIENT_SECRET").unwrap_or_default(),
            redirect_url: env::var("TEAMUP_OAUTH_REDIRECT_URL").unwrap_or_else(|_| {
                "http://localhost:8080/login/oauth2/code/google".to_string()
            }),
            scopes,
            auth_url: env::var("TEAMUP_OAUTH_AUTH_URL")
                .unwrap_or_else(|_| GOOGLE_AUTH_URL.to_string()),
            token_url: env::var("TEAMUP_OAUTH_TOKEN_URL")
                .unwrap_or_else(|_| GOOGLE_TOKEN_URL.to_string()),
            userinfo_url: env::var("TEAMUP_OAUTH_USERINFO_URL")
                .unwrap_or_else(|_| GOOGLE_USERINFO_URL.to_string()),
        };

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            tx_timeout,
            frontend_url,
            jwt,
            oauth,
        })
    }
}

fn parse_secs(key: &str, default: u64) -> Result<u64, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {} value '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: &[&str] = &[
        "TEAMUP_DB_PATH",
        "TEAMUP_BIND_ADDR",
        "TEAMUP_LOG_LEVEL",
        "TEAMUP_TX_TIMEOUT_SECS",
        "TEAMUP_FRONTEND_URL",
        "TEAMUP_JWT_SECRET",
        "TEAMUP_JWT_TTL_SECS",
        "TEAMUP_OAUTH_SCOPES",
        "TEAMUP_OAUTH_CLIENT_ID",
    ];

    // Both cases touch process-wide env vars, so they run in one test.
    #[test]
    fn test_config_from_env() {
        for key in KEYS {
            env::remove_var(key);
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/teamup.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.tx_timeout, Duration::from_secs(10));
        assert_eq!(config.jwt.ttl, Duration::from_secs(1800));
        assert_eq!(config.oauth.scopes, vec!["openid", "email", "profile"]);
        assert_eq!(config.oauth.auth_url, GOOGLE_AUTH_URL);

        env::set_var("TEAMUP_OAUTH_SCOPES", "email, profile,");
        env::set_var("TEAMUP_JWT_TTL_SECS", "60");
        let config = Config::from_env().unwrap();
        assert_eq!(config.oauth.scopes, vec!["email", "profile"]);
        assert_eq!(config.jwt.ttl, Duration::from_secs(60));

        env::set_var("TEAMUP_TX_TIMEOUT_SECS", "soon");
        assert!(Config::from_env().is_err());

        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let jwt = JwtConfig {
            secret: "super-secret".to_string(),
            ttl: Duration::from_secs(1),
        };
        assert!(!format!("{:?}", jwt).contains("super-secret"));
    }
}
