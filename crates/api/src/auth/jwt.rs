//! Session tokens: HS256 access JWTs plus opaque refresh tokens.
//!
//! Access tokens are HS256-signed JWTs containing a [`Claims`] payload.
//! Refresh tokens are opaque random strings; only their SHA-256 hash is stored
//! server-side so a database leak does not compromise active sessions.
//!
//! Handlers and services only see the [`TokenIssuer`] trait so the issuer can
//! be swapped for an external identity provider.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use onboard_core::error::CoreError;
use onboard_core::hashing::sha256_hex;
use onboard_core::tokens::{generate_token, DEFAULT_TOKEN_BYTES};
use onboard_core::types::DbId;
use onboard_db::models::session::CreateSession;
use onboard_db::repository::{SessionRepository, UserRepository};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4).
    pub jti: String,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 60).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 60;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `60`    |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`     |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_token_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");

        Self {
            secret,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_token_expiry_mins * 60
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_token_expiry_days * 24 * 60 * 60
    }
}

/// Generate an HS256 access token for the given user.
pub fn generate_access_token(
    user_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        exp: now + config.access_ttl_secs(),
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate and decode an access token, returning the embedded [`Claims`].
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

/// Generate a cryptographically random refresh token.
///
/// Returns `(plaintext_token, sha256_hex_hash)`. Only the hash is persisted.
pub fn generate_refresh_token() -> (String, String) {
    let plaintext = generate_token(DEFAULT_TOKEN_BYTES);
    let hash = hash_refresh_token(&plaintext);
    (plaintext, hash)
}

/// Compute the SHA-256 hex digest of a refresh token.
pub fn hash_refresh_token(token: &str) -> String {
    sha256_hex(token.as_bytes())
}

// ---------------------------------------------------------------------------
// Issuer
// ---------------------------------------------------------------------------

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user_id: DbId,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub access_expires_in: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: i64,
}

/// Issues, verifies, rotates and revokes sessions.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Start a new session for `user_id`.
    async fn issue(&self, user_id: DbId) -> AppResult<IssuedSession>;

    /// Verify an access token and return its claims.
    fn verify(&self, access_token: &str) -> Result<Claims, CoreError>;

    /// Exchange a live refresh token for a new pair. The old one is revoked.
    async fn refresh(&self, refresh_token: &str) -> AppResult<IssuedSession>;

    /// Revoke the session behind `refresh_token`. Unknown tokens are ignored.
    async fn revoke(&self, refresh_token: &str) -> AppResult<()>;
}

/// [`TokenIssuer`] backed by local JWT signing and the `user_sessions` table.
pub struct JwtTokenIssuer {
    config: JwtConfig,
    sessions: Arc<dyn SessionRepository>,
    users: Arc<dyn UserRepository>,
}

impl JwtTokenIssuer {
    pub fn new(
        config: JwtConfig,
        sessions: Arc<dyn SessionRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            config,
            sessions,
            users,
        }
    }
}

#[async_trait]
impl TokenIssuer for JwtTokenIssuer {
    async fn issue(&self, user_id: DbId) -> AppResult<IssuedSession> {
        let access_token = generate_access_token(user_id, &self.config)
            .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

        let (refresh_plaintext, refresh_hash) = generate_refresh_token();
        let expires_at = Utc::now() + chrono::Duration::days(self.config.refresh_token_expiry_days);

        self.sessions
            .create(&CreateSession {
                user_id,
                refresh_token_hash: refresh_hash,
                expires_at,
            })
            .await?;

        Ok(IssuedSession {
            user_id,
            access_token,
            refresh_token: refresh_plaintext,
            access_expires_in: self.config.access_ttl_secs(),
            refresh_expires_in: self.config.refresh_ttl_secs(),
        })
    }

    fn verify(&self, access_token: &str) -> Result<Claims, CoreError> {
        validate_token(access_token, &self.config)
            .map_err(|_| CoreError::Unauthorized("Invalid or expired token".into()))
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<IssuedSession> {
        let session = self
            .sessions
            .find_active_by_refresh_hash(&hash_refresh_token(refresh_token))
            .await?
            .ok_or_else(|| CoreError::Unauthorized("Invalid or expired refresh token".into()))?;

        // Rotation: a refresh token is usable once.
        if !self.sessions.revoke(session.id).await? {
            return Err(CoreError::Unauthorized("Invalid or expired refresh token".into()).into());
        }

        let user = self
            .users
            .find_by_id(session.user_id)
            .await?
            .ok_or_else(|| CoreError::Unauthorized("User no longer exists".into()))?;
        if !user.is_active {
            return Err(CoreError::Forbidden("Account is deactivated".into()).into());
        }

        self.issue(user.id).await
    }

    async fn revoke(&self, refresh_token: &str) -> AppResult<()> {
        if let Some(session) = self
            .sessions
            .find_active_by_refresh_hash(&hash_refresh_token(refresh_token))
            .await?
        {
            self.sessions.revoke(session.id).await?;
        }
        Ok(())
    }
}
