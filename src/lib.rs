//! # Tessera (Authentication & Authorization Service)
//!
//! `tessera` is an authentication and authorization engine for business web
//! applications. It covers password sign-in with lockout, TOTP multi-factor
//! authentication, claims-based dynamic policies, and federation with
//! external identity providers.
//!
//! ## Sign-in
//!
//! Password sign-in is a two-stage flow. A correct password on an account
//! with MFA enabled yields a short-lived challenge session; a TOTP code must
//! then be verified before a full session is issued. Failed attempts at
//! either stage share one counter per identity; five consecutive failures
//! lock the account for fifteen minutes.
//!
//! - **Email Normalization:** emails are trimmed and lowercased before any
//!   lookup or uniqueness check.
//! - **Session Tokens:** raw tokens are returned to the client once; only a
//!   SHA-256 hash is stored server-side.
//!
//! ## Authorization
//!
//! Access decisions go through named policies, each an ordered list of
//! requirements. Requirements are evaluated by handlers registered per
//! requirement kind; a missing claim, handler, or policy always evaluates to
//! deny, never to an error.
//!
//! ## Downstream access
//!
//! Calls to the protected resource server use bearer tokens obtained from a
//! credential exchange and cached per session, with single-flight refresh so
//! concurrent requests trigger at most one upstream exchange.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
