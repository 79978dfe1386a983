use crate::config::AppConfig;
use crate::constants::auth::{AUDIENCE, TOKEN_REFRESH_MARGIN_SECS, TOKEN_TTL_SECS};
use crate::errors::ToolError;
use crate::services::logger::Logger;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{0}")]
    Configuration(String),
    #[error("Failed to read private key at {path}: {source}")]
    KeyRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Private key at {path} is not a valid EC (P-256) PKCS#8 key: {source}")]
    InvalidKey {
        path: String,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

impl From<CredentialError> for ToolError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Configuration(message) => ToolError::configuration(message),
            CredentialError::KeyRead { .. } => ToolError::key_read(err.to_string()),
            CredentialError::InvalidKey { .. } => ToolError::configuration(err.to_string())
                .with_hint("Use the .p8 file downloaded from App Store Connect unchanged."),
            CredentialError::Signing(_) => ToolError::internal(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    iat: i64,
    exp: i64,
    aud: &'a str,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Mints short-lived ES256 bearer tokens for the App Store Connect API.
pub struct CredentialMinter {
    logger: Logger,
    key_id: String,
    issuer_id: String,
    private_key_path: PathBuf,
    cache: Mutex<Option<CachedToken>>,
}

impl CredentialMinter {
    /// Checks that key id, issuer id and key path are all present. The key
    /// file itself is not touched until the first [`CredentialMinter::token`].
    pub fn new(logger: Logger, config: &AppConfig) -> Result<Self, CredentialError> {
        config
            .validate()
            .map_err(|err| CredentialError::Configuration(err.message))?;
        Ok(Self {
            logger: logger.child("auth"),
            key_id: config.key_id.trim().to_string(),
            issuer_id: config.issuer_id.trim().to_string(),
            private_key_path: PathBuf::from(config.private_key_path.trim()),
            cache: Mutex::new(None),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns a cached token while it has more than a minute of validity
    /// left, otherwise signs a fresh one.
    pub async fn token(&self) -> Result<String, CredentialError> {
        let now = chrono::Utc::now().timestamp();
        if let Some(token) = self.cached(now) {
            return Ok(token);
        }
        let (token, expires_at) = self.mint(now).await?;
        if let Ok(mut guard) = self.cache.lock() {
            *guard = Some(CachedToken {
                token: token.clone(),
                expires_at,
            });
        }
        Ok(token)
    }

    /// Signs a new token, bypassing the cache.
    pub async fn generate_token(&self) -> Result<String, CredentialError> {
        let now = chrono::Utc::now().timestamp();
        self.mint(now).await.map(|(token, _)| token)
    }

    fn cached(&self, now: i64) -> Option<String> {
        let guard = self.cache.lock().ok()?;
        let entry = guard.as_ref()?;
        if entry.expires_at - TOKEN_REFRESH_MARGIN_SECS <= now {
            return None;
        }
        Some(entry.token.clone())
    }

    async fn mint(&self, now: i64) -> Result<(String, i64), CredentialError> {
        let path_label = self.private_key_path.display().to_string();
        let pem = tokio::fs::read(&self.private_key_path)
            .await
            .map_err(|source| CredentialError::KeyRead {
                path: path_label.clone(),
                source,
            })?;
        let key = EncodingKey::from_ec_pem(&pem).map_err(|source| CredentialError::InvalidKey {
            path: path_label,
            source,
        })?;

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());
        let expires_at = now + TOKEN_TTL_SECS;
        let claims = Claims {
            iss: &self.issuer_id,
            iat: now,
            exp: expires_at,
            aud: AUDIENCE,
        };
        let token = jsonwebtoken::encode(&header, &claims, &key)?;
        self.logger.debug(
            "Minted API token",
            Some(&serde_json::json!({"kid": self.key_id, "expires_at": expires_at})),
        );
        Ok((token, expires_at))
    }
}
