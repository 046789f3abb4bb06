//! Magic-link one-time login codes.

use onboard_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from `login_codes`. Only the SHA-256 of the code is stored.
#[derive(Debug, Clone, FromRow)]
pub struct LoginCode {
    pub id: DbId,
    pub email: String,
    pub code_hash: String,
    pub expires_at: Timestamp,
    /// Wrong guesses so far.
    pub attempts: i32,
    pub consumed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
