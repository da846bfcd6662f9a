//! Core authentication and authorization engine.
//!
//! The engine is deliberately storage-agnostic: identities, claims, and
//! sessions sit behind trait seams with in-memory adapters, and all time
//! handling goes through an injectable [`clock::Clock`].

pub mod claims;
pub mod clock;
pub mod error;
pub mod federation;
pub mod identity;
pub mod policy;
pub mod session;
pub mod signin;
pub mod state;
pub mod token;
pub mod totp;

/// Compare two byte slices without short-circuiting on the first mismatch.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::constant_time_eq;

    #[test]
    fn constant_time_eq_matches_equal_slices() {
        assert!(constant_time_eq(b"123456", b"123456"));
        assert!(!constant_time_eq(b"123456", b"123457"));
        assert!(!constant_time_eq(b"123456", b"12345"));
        assert!(constant_time_eq(b"", b""));
    }
}
