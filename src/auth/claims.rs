//! Claims attached to identities and the store seam that owns them.
//!
//! Claims are single-valued per type: writing a claim replaces any existing
//! claim of the same type instead of appending a duplicate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::StoreError;

/// Employment start date, ISO 8601 date (`YYYY-MM-DD`).
pub const EMPLOYMENT_DATE: &str = "EmploymentDate";
pub const DEPARTMENT: &str = "Department";
pub const POSITION: &str = "Position";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    #[must_use]
    pub fn new(claim_type: &str, value: &str) -> Self {
        Self {
            claim_type: claim_type.to_string(),
            value: value.to_string(),
        }
    }
}

/// Immutable view of an identity's claims at evaluation time.
#[derive(Clone, Debug, Default)]
pub struct ClaimsSnapshot {
    claims: Vec<Claim>,
}

impl ClaimsSnapshot {
    #[must_use]
    pub fn new(claims: Vec<Claim>) -> Self {
        Self { claims }
    }

    /// Value of the claim with the given type, if present.
    #[must_use]
    pub fn get(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|claim| claim.claim_type == claim_type)
            .map(|claim| claim.value.as_str())
    }

    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }
}

/// Storage seam for identity claims.
pub trait ClaimStore: Send + Sync {
    /// Set a claim, replacing any existing claim of the same type.
    fn replace_claim(&self, user_id: Uuid, claim: Claim) -> Result<(), StoreError>;

    fn remove_claim(&self, user_id: Uuid, claim_type: &str) -> Result<(), StoreError>;

    fn claims_for(&self, user_id: Uuid) -> ClaimsSnapshot;
}

/// In-memory claim store used by the server and tests.
#[derive(Debug, Default)]
pub struct InMemoryClaimStore {
    inner: RwLock<HashMap<Uuid, Vec<Claim>>>,
}

impl InMemoryClaimStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClaimStore for InMemoryClaimStore {
    fn replace_claim(&self, user_id: Uuid, claim: Claim) -> Result<(), StoreError> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let claims = map.entry(user_id).or_default();
        claims.retain(|existing| existing.claim_type != claim.claim_type);
        claims.push(claim);
        Ok(())
    }

    fn remove_claim(&self, user_id: Uuid, claim_type: &str) -> Result<(), StoreError> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(claims) = map.get_mut(&user_id) {
            claims.retain(|existing| existing.claim_type != claim_type);
        }
        Ok(())
    }

    fn claims_for(&self, user_id: Uuid) -> ClaimsSnapshot {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        ClaimsSnapshot::new(map.get(&user_id).cloned().unwrap_or_default())
    }
}
