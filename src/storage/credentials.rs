//! Cloud Storage Credentials Module
//!
//! Provides OAuth2 access tokens for the storage client using a trait-based design.
//!
//! # Implementations
//!
//! - `StaticToken` - A fixed bearer token (tests, `GCS_ACCESS_TOKEN`)
//! - `ServiceAccountTokenProvider` - Exchanges a signed JWT assertion built from a
//!   service account key for an access token, caching it until shortly before expiry
//!
//! # Example
//!
//! ```
//! use gcs_uploadr::storage::StaticToken;
//!
//! let provider = StaticToken::new("ya29.token");
//! assert_eq!(provider.token(), "ya29.token");
//! ```

use crate::config::StorageConfig;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Environment variable holding a pre-issued access token
pub const ACCESS_TOKEN_ENV: &str = "GCS_ACCESS_TOKEN";

/// OAuth scope requested for uploads
pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// Credential loading errors
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),
}

/// Source of bearer tokens for Cloud Storage requests
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a valid access token, fetching one if needed
    async fn access_token(&self, http: &reqwest::Client) -> Result<String, CredentialsError>;
}

/// Factory for the token provider described by the configuration
pub struct CredentialsProvider;

impl CredentialsProvider {
    /// Load a static token from `GCS_ACCESS_TOKEN`, if set
    pub fn from_env() -> Option<StaticToken> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(StaticToken::new)
    }

    /// Build the provider for a storage configuration
    ///
    /// `GCS_ACCESS_TOKEN` takes precedence; otherwise the service account key at
    /// `credentials_file` is loaded.
    pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn TokenProvider>, CredentialsError> {
        if let Some(token) = Self::from_env() {
            tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
            return Ok(Arc::new(token));
        }

        let key = ServiceAccountKey::from_file(&config.credentials_file)?;
        tracing::debug!(
            client_email = %key.client_email,
            "Loaded service account credentials"
        );
        Ok(Arc::new(ServiceAccountTokenProvider::new(key)?))
    }
}

/// Fixed bearer token
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self, _http: &reqwest::Client) -> Result<String, CredentialsError> {
        Ok(self.token.clone())
    }
}

/// Service account key file contents
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    /// Read a service account key from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CredentialsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CredentialsError::MissingCredentials(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse a service account key from JSON text
    pub fn from_json(json: &str) -> Result<Self, CredentialsError> {
        let key: Self = serde_json::from_str(json)
            .map_err(|e| CredentialsError::InvalidCredentials(e.to_string()))?;

        if key.key_type != "service_account" {
            return Err(CredentialsError::InvalidCredentials(format!(
                "unsupported credentials type '{}'",
                key.key_type
            )));
        }

        Ok(key)
    }
}

/// JWT assertion claims for the OAuth2 JWT bearer grant
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Service account token provider
///
/// Tokens are cached and reused until `REFRESH_MARGIN_SECS` before expiry.
pub struct ServiceAccountTokenProvider {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    /// Create a provider from a parsed key
    pub fn new(key: ServiceAccountKey) -> Result<Self, CredentialsError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| CredentialsError::InvalidCredentials(e.to_string()))?;

        Ok(Self {
            key,
            encoding_key,
            cache: Mutex::new(None),
        })
    }

    /// Service account email
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn cached(&self, now: DateTime<Utc>) -> Option<String> {
        self.cache
            .lock()
            .as_ref()
            .filter(|cached| cached.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now)
            .map(|cached| cached.token.clone())
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, CredentialsError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: STORAGE_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| CredentialsError::InvalidCredentials(e.to_string()))
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    #[tracing::instrument(
        name = "gcs.token_exchange",
        skip(self, http),
        fields(client_email = %self.key.client_email, cached = tracing::field::Empty),
        err
    )]
    async fn access_token(&self, http: &reqwest::Client) -> Result<String, CredentialsError> {
        let now = Utc::now();
        if let Some(token) = self.cached(now) {
            tracing::Span::current().record("cached", true);
            return Ok(token);
        }
        tracing::Span::current().record("cached", false);

        let assertion = self.sign_assertion(now)?;
        let response = http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| CredentialsError::TokenExchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialsError::TokenExchange(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialsError::TokenExchange(e.to_string()))?;

        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                CredentialsError::TokenExchange(format!(
                    "token endpoint returned out of range expires_in {}",
                    token.expires_in
                ))
            })?;
        *self.cache.lock() = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at,
        });

        tracing::debug!(expires_at = %expires_at, "Obtained access token");
        Ok(token.access_token)
    }
}
