//! Random token generation and HMAC signing.
//!
//! Invite tokens, password-reset tokens, login codes, webhook signing secrets
//! and API credentials are all minted here from the thread-local CSPRNG.

use hmac::{Hmac, Mac};
use rand::{Rng, RngCore};
use sha2::Sha256;

use crate::hashing::sha256_hex;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default number of random bytes in an invite or reset token.
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// Number of digits in a magic-link login code.
pub const LOGIN_CODE_DIGITS: usize = 6;

/// Wrong guesses a login code survives before it is burned.
pub const MAX_LOGIN_CODE_ATTEMPTS: i32 = 5;

/// Prefix of every public API key.
pub const API_KEY_PREFIX: &str = "obk_";

/// Prefix of every API secret.
pub const API_SECRET_PREFIX: &str = "obs_";

/// Prefix of every webhook signing secret.
pub const WEBHOOK_SECRET_PREFIX: &str = "whsec_";

// ---------------------------------------------------------------------------
// Opaque tokens
// ---------------------------------------------------------------------------

/// Generate `byte_length` cryptographically secure random bytes, hex-encoded.
///
/// The returned string is `2 * byte_length` characters long. A zero length is
/// raised to one byte so a token is never empty.
pub fn generate_token(byte_length: usize) -> String {
    let mut bytes = vec![0u8; byte_length.max(1)];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a zero-padded numeric login code.
pub fn generate_login_code() -> String {
    let mut rng = rand::rng();
    (0..LOGIN_CODE_DIGITS)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Generate a webhook signing secret. Shown to the caller once.
pub fn generate_webhook_secret() -> String {
    format!("{WEBHOOK_SECRET_PREFIX}{}", generate_token(24))
}

// ---------------------------------------------------------------------------
// API credentials
// ---------------------------------------------------------------------------

/// A freshly generated key/secret pair.
pub struct GeneratedApiCredential {
    /// Public identifier, stored and displayed in full.
    pub api_key: String,
    /// Plaintext secret, returned exactly once and never stored.
    pub secret: String,
    /// SHA-256 hex digest of the secret (stored in the database).
    pub secret_hash: String,
}

/// Generate a new API key and secret.
pub fn generate_api_credential() -> GeneratedApiCredential {
    let api_key = format!("{API_KEY_PREFIX}{}", generate_token(12));
    let secret = format!("{API_SECRET_PREFIX}{}", generate_token(DEFAULT_TOKEN_BYTES));
    let secret_hash = sha256_hex(secret.as_bytes());
    GeneratedApiCredential {
        api_key,
        secret,
        secret_hash,
    }
}

// ---------------------------------------------------------------------------
// HMAC signing
// ---------------------------------------------------------------------------

type HmacSha256 = Hmac<Sha256>;

/// Compute a hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn hmac_sha256_hex(secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex-encoded HMAC-SHA256 signature in constant time.
pub fn verify_hmac_sha256_hex(secret: &str, payload: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
