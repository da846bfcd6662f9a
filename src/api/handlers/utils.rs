//! Small helpers for input validation and confirmation token handling.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Minimum eight characters with at least one uppercase and one lowercase
/// letter.
pub(super) fn valid_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
}

/// Create a new confirmation token for email links.
///
/// The returned token is only sent to the user; only a hash is stored.
pub(super) fn generate_confirmation_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a confirmation token so raw values never touch storage.
pub(super) fn hash_confirmation_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn valid_password_enforces_length_and_case() {
        assert!(valid_password("Password1"));
        assert!(valid_password("LongEnough"));
        assert!(!valid_password("Short1"));
        assert!(!valid_password("alllowercase"));
        assert!(!valid_password("ALLUPPERCASE"));
    }

    #[test]
    fn generate_confirmation_token_round_trip() {
        let token = generate_confirmation_token();
        let decoded = URL_SAFE_NO_PAD.decode(token.as_bytes()).unwrap();
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn hash_confirmation_token_stable() {
        let first = hash_confirmation_token("token");
        let second = hash_confirmation_token("token");
        let different = hash_confirmation_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
    }
}
