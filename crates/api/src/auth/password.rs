//! Argon2id password hashing, strength scoring, and temporary passwords.
//!
//! All password hashes use the Argon2id variant with a cryptographically random
//! salt generated via [`OsRng`]. The PHC string format is used for storage so
//! that algorithm parameters and salt are embedded in the hash itself.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Highest strength score.
pub const MAX_STRENGTH_SCORE: u8 = 5;

const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%^&*-_=+?";

/// Hash a plaintext password using Argon2id with a random salt.
///
/// Returns the PHC-formatted hash string (includes algorithm, params, salt, and hash).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default(); // Argon2id with default params
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted Argon2id hash.
///
/// Returns `Ok(true)` if the password matches, `Ok(false)` if it does not.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Outcome of [`validate_strength`]. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    pub valid: bool,
    /// Every unmet rule, in rule order.
    pub errors: Vec<String>,
    /// 0..=5.
    pub score: u8,
}

impl PasswordStrength {
    /// All error messages joined into one sentence for a 400 response.
    pub fn message(&self) -> String {
        self.errors.join("; ")
    }
}

fn is_symbol(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

/// Score a password against the fixed rule set.
///
/// Rules: at least 8 characters, an uppercase letter, a lowercase letter, a
/// digit, and a symbol. Each satisfied rule adds a point, plus one each for
/// reaching 12 and 16 characters, capped at [`MAX_STRENGTH_SCORE`].
pub fn validate_strength(password: &str) -> PasswordStrength {
    let length = password.chars().count();
    let rules: [(bool, String); 5] = [
        (
            length >= MIN_PASSWORD_LENGTH,
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters long"),
        ),
        (
            password.chars().any(|c| c.is_uppercase()),
            "Password must contain at least one uppercase letter".into(),
        ),
        (
            password.chars().any(|c| c.is_lowercase()),
            "Password must contain at least one lowercase letter".into(),
        ),
        (
            password.chars().any(|c| c.is_ascii_digit()),
            "Password must contain at least one number".into(),
        ),
        (
            password.chars().any(is_symbol),
            "Password must contain at least one special character".into(),
        ),
    ];

    let mut score = 0u8;
    let mut errors = Vec::new();
    for (ok, message) in rules {
        if ok {
            score += 1;
        } else {
            errors.push(message);
        }
    }
    if length >= 12 {
        score += 1;
    }
    if length >= 16 {
        score += 1;
    }

    PasswordStrength {
        valid: errors.is_empty(),
        errors,
        score: score.min(MAX_STRENGTH_SCORE),
    }
}

/// Generate a random password containing every required character class.
///
/// Lengths below [`MIN_PASSWORD_LENGTH`] are raised to it.
pub fn generate_temporary_password(length: usize) -> String {
    let length = length.max(MIN_PASSWORD_LENGTH);
    let mut rng = rand::rng();
    let pick = |set: &[u8], rng: &mut rand::rngs::ThreadRng| set[rng.random_range(0..set.len())];

    let mut chars: Vec<u8> = vec![
        pick(UPPER, &mut rng),
        pick(LOWER, &mut rng),
        pick(DIGITS, &mut rng),
        pick(SYMBOLS, &mut rng),
    ];
    let alphabet: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS].concat();
    while chars.len() < length {
        chars.push(pick(&alphabet, &mut rng));
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("GoodPass123!").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("GoodPass123!", &hash).unwrap());
        assert!(!verify_password("GoodPass123?", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn weak_passwords_are_rejected_with_reasons() {
        for weak in ["short1", "alllowercase1!", "ALLUPPER1!", "NoDigits!", "NoSymbols123"] {
            let result = validate_strength(weak);
            assert!(!result.valid, "{weak} should be rejected");
            assert!(!result.errors.is_empty());
        }
    }

    #[test]
    fn every_unmet_rule_is_reported_in_order() {
        let result = validate_strength("short");
        assert_eq!(result.errors.len(), 4);
        assert!(result.errors[0].contains("at least 8"));
        assert!(result.errors[1].contains("uppercase"));
        assert!(result.errors[2].contains("number"));
        assert!(result.errors[3].contains("special"));
        assert_eq!(result.score, 1);
    }

    #[test]
    fn good_password_is_valid() {
        let result = validate_strength("GoodPass123!");
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.score, 5);
    }

    #[test]
    fn score_is_capped() {
        assert_eq!(validate_strength("VeryLongPassword123!@#").score, 5);
        assert_eq!(validate_strength("abcdefgh").score, 2);
    }

    #[test]
    fn temporary_passwords_are_strong() {
        for requested in [0, 8, 16] {
            let password = generate_temporary_password(requested);
            assert!(password.len() >= MIN_PASSWORD_LENGTH);
            assert!(validate_strength(&password).valid, "{password} should be valid");
        }
        assert_eq!(generate_temporary_password(20).len(), 20);
    }
}
