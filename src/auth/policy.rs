//! Named policies evaluated over claims by pluggable requirement handlers.
//!
//! A policy is an ordered list of requirements; evaluation is the logical AND
//! of every requirement. An unknown policy, a requirement kind with no
//! registered handler, or a missing claim all evaluate to deny. Evaluation
//! never errors.

use chrono::{DateTime, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;

use super::claims::{self, ClaimsSnapshot};
use super::clock::Clock;

pub const HR_MANAGER_ONLY: &str = "HRManagerOnly";
pub const ADMIN_ONLY: &str = "AdminOnly";

const DAYS_PER_MONTH: i64 = 30;

/// A single condition a policy imposes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Requirement {
    /// More than `required_months` (of 30 days each) have passed since the
    /// identity's employment date claim.
    ProbationElapsed { required_months: u32 },
    /// A claim of this type exists, whatever its value.
    HasClaim { claim_type: String },
    /// A claim of this type exists with exactly this value.
    ClaimEquals { claim_type: String, value: String },
}

impl Requirement {
    /// Handler registry key for this requirement.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProbationElapsed { .. } => "probation_elapsed",
            Self::HasClaim { .. } => "has_claim",
            Self::ClaimEquals { .. } => "claim_equals",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Read-only view a handler evaluates against.
pub struct AuthorizationContext<'a> {
    pub claims: &'a ClaimsSnapshot,
    pub now: DateTime<chrono::Utc>,
}

/// Evaluates one requirement kind. Handlers only report success; they cannot
/// fail a policy for other handlers or produce errors.
pub trait RequirementHandler: Send + Sync {
    fn is_satisfied(&self, requirement: &Requirement, context: &AuthorizationContext<'_>) -> bool;
}

struct ProbationHandler;

impl RequirementHandler for ProbationHandler {
    fn is_satisfied(&self, requirement: &Requirement, context: &AuthorizationContext<'_>) -> bool {
        let Requirement::ProbationElapsed { required_months } = requirement else {
            return false;
        };
        let Some(value) = context.claims.get(claims::EMPLOYMENT_DATE) else {
            return false;
        };
        let Some(employment_date) = parse_employment_date(value) else {
            return false;
        };
        let days = context
            .now
            .date_naive()
            .signed_duration_since(employment_date)
            .num_days();
        days > DAYS_PER_MONTH * i64::from(*required_months)
    }
}

struct HasClaimHandler;

impl RequirementHandler for HasClaimHandler {
    fn is_satisfied(&self, requirement: &Requirement, context: &AuthorizationContext<'_>) -> bool {
        let Requirement::HasClaim { claim_type } = requirement else {
            return false;
        };
        context.claims.get(claim_type).is_some()
    }
}

struct ClaimEqualsHandler;

impl RequirementHandler for ClaimEqualsHandler {
    fn is_satisfied(&self, requirement: &Requirement, context: &AuthorizationContext<'_>) -> bool {
        let Requirement::ClaimEquals { claim_type, value } = requirement else {
            return false;
        };
        context.claims.get(claim_type) == Some(value.as_str())
    }
}

fn parse_employment_date(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = value.trim().parse::<NaiveDate>() {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Policy registry and evaluator.
pub struct PolicyEvaluator {
    clock: Arc<dyn Clock>,
    policies: HashMap<String, Vec<Requirement>>,
    handlers: HashMap<&'static str, Box<dyn RequirementHandler>>,
}

impl PolicyEvaluator {
    /// An evaluator with the built-in handlers and no policies.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let mut evaluator = Self {
            clock,
            policies: HashMap::new(),
            handlers: HashMap::new(),
        };
        evaluator.register_handler("probation_elapsed", Box::new(ProbationHandler));
        evaluator.register_handler("has_claim", Box::new(HasClaimHandler));
        evaluator.register_handler("claim_equals", Box::new(ClaimEqualsHandler));
        evaluator
    }

    /// The evaluator with the service's standard policies defined.
    #[must_use]
    pub fn standard(clock: Arc<dyn Clock>) -> Self {
        let mut evaluator = Self::new(clock);
        evaluator.define_policy(
            HR_MANAGER_ONLY,
            vec![
                Requirement::ClaimEquals {
                    claim_type: claims::DEPARTMENT.to_string(),
                    value: "HR".to_string(),
                },
                Requirement::ProbationElapsed { required_months: 6 },
            ],
        );
        evaluator.define_policy(
            ADMIN_ONLY,
            vec![Requirement::ClaimEquals {
                claim_type: claims::DEPARTMENT.to_string(),
                value: "Administration".to_string(),
            }],
        );
        evaluator
    }

    pub fn register_handler(&mut self, kind: &'static str, handler: Box<dyn RequirementHandler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn define_policy(&mut self, name: &str, requirements: Vec<Requirement>) {
        self.policies.insert(name.to_string(), requirements);
    }

    /// Evaluate a named policy against a claims snapshot.
    #[must_use]
    pub fn evaluate(&self, policy: &str, claims: &ClaimsSnapshot) -> Decision {
        let Some(requirements) = self.policies.get(policy) else {
            return Decision::Deny;
        };
        let context = AuthorizationContext {
            claims,
            now: self.clock.now(),
        };
        for requirement in requirements {
            let Some(handler) = self.handlers.get(requirement.kind()) else {
                return Decision::Deny;
            };
            if !handler.is_satisfied(requirement, &context) {
                return Decision::Deny;
            }
        }
        Decision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Claim;
    use crate::auth::clock::FixedClock;
    use chrono::{Duration, TimeZone, Utc};

    fn evaluator_at_day_offset(employment_days_ago: i64) -> (PolicyEvaluator, ClaimsSnapshot) {
        let now = Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(now));
        let employment_date = (now - Duration::days(employment_days_ago))
            .date_naive()
            .to_string();
        let snapshot = ClaimsSnapshot::new(vec![
            Claim::new(claims::DEPARTMENT, "HR"),
            Claim::new(claims::EMPLOYMENT_DATE, &employment_date),
        ]);
        (PolicyEvaluator::standard(clock), snapshot)
    }

    #[test]
    fn probation_still_running_denies() {
        // 150 days is short of the 180-day (6 x 30) probation
        let (evaluator, snapshot) = evaluator_at_day_offset(150);
        assert_eq!(evaluator.evaluate(HR_MANAGER_ONLY, &snapshot), Decision::Deny);
    }

    #[test]
    fn probation_elapsed_allows() {
        let (evaluator, snapshot) = evaluator_at_day_offset(200);
        assert_eq!(
            evaluator.evaluate(HR_MANAGER_ONLY, &snapshot),
            Decision::Allow
        );
    }

    #[test]
    fn probation_boundary_is_strict() {
        // Exactly 180 days is not "more than" 6 months
        let (evaluator, snapshot) = evaluator_at_day_offset(180);
        assert_eq!(evaluator.evaluate(HR_MANAGER_ONLY, &snapshot), Decision::Deny);

        let (evaluator, snapshot) = evaluator_at_day_offset(181);
        assert_eq!(
            evaluator.evaluate(HR_MANAGER_ONLY, &snapshot),
            Decision::Allow
        );
    }

    #[test]
    fn missing_claim_denies_without_error() {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap(),
        ));
        let evaluator = PolicyEvaluator::standard(clock);

        // Department present but no employment date
        let snapshot = ClaimsSnapshot::new(vec![Claim::new(claims::DEPARTMENT, "HR")]);
        assert_eq!(evaluator.evaluate(HR_MANAGER_ONLY, &snapshot), Decision::Deny);

        // No claims at all
        assert_eq!(
            evaluator.evaluate(HR_MANAGER_ONLY, &ClaimsSnapshot::default()),
            Decision::Deny
        );
    }

    #[test]
    fn unparseable_employment_date_denies() {
        let (evaluator, _) = evaluator_at_day_offset(200);
        let snapshot = ClaimsSnapshot::new(vec![
            Claim::new(claims::DEPARTMENT, "HR"),
            Claim::new(claims::EMPLOYMENT_DATE, "sometime last year"),
        ]);
        assert_eq!(evaluator.evaluate(HR_MANAGER_ONLY, &snapshot), Decision::Deny);
    }

    #[test]
    fn wrong_department_denies() {
        let (evaluator, _) = evaluator_at_day_offset(200);
        let snapshot = ClaimsSnapshot::new(vec![
            Claim::new(claims::DEPARTMENT, "Sales"),
            Claim::new(claims::EMPLOYMENT_DATE, "2023-01-01"),
        ]);
        assert_eq!(evaluator.evaluate(HR_MANAGER_ONLY, &snapshot), Decision::Deny);
    }

    #[test]
    fn unknown_policy_denies() {
        let (evaluator, snapshot) = evaluator_at_day_offset(200);
        assert_eq!(evaluator.evaluate("NoSuchPolicy", &snapshot), Decision::Deny);
    }

    #[test]
    fn requirement_without_handler_denies() {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap(),
        ));
        let mut evaluator = PolicyEvaluator {
            clock,
            policies: HashMap::new(),
            handlers: HashMap::new(),
        };
        evaluator.define_policy(
            "Orphan",
            vec![Requirement::HasClaim {
                claim_type: claims::DEPARTMENT.to_string(),
            }],
        );
        let snapshot = ClaimsSnapshot::new(vec![Claim::new(claims::DEPARTMENT, "HR")]);
        assert_eq!(evaluator.evaluate("Orphan", &snapshot), Decision::Deny);
    }

    #[test]
    fn admin_policy_checks_department() {
        let (evaluator, _) = evaluator_at_day_offset(200);
        let admin = ClaimsSnapshot::new(vec![Claim::new(claims::DEPARTMENT, "Administration")]);
        assert_eq!(evaluator.evaluate(ADMIN_ONLY, &admin), Decision::Allow);

        let hr = ClaimsSnapshot::new(vec![Claim::new(claims::DEPARTMENT, "HR")]);
        assert_eq!(evaluator.evaluate(ADMIN_ONLY, &hr), Decision::Deny);
    }

    #[test]
    fn rfc3339_employment_date_is_accepted() {
        let now = Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(now));
        let evaluator = PolicyEvaluator::standard(clock);
        let snapshot = ClaimsSnapshot::new(vec![
            Claim::new(claims::DEPARTMENT, "HR"),
            Claim::new(claims::EMPLOYMENT_DATE, "2023-01-15T09:00:00Z"),
        ]);
        assert_eq!(
            evaluator.evaluate(HR_MANAGER_ONLY, &snapshot),
            Decision::Allow
        );
    }

    #[test]
    fn custom_handler_extends_evaluator() {
        struct AlwaysSatisfied;

        impl RequirementHandler for AlwaysSatisfied {
            fn is_satisfied(
                &self,
                _requirement: &Requirement,
                _context: &AuthorizationContext<'_>,
            ) -> bool {
                true
            }
        }

        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap(),
        ));
        let mut evaluator = PolicyEvaluator::new(clock);
        evaluator.register_handler("has_claim", Box::new(AlwaysSatisfied));
        evaluator.define_policy(
            "Open",
            vec![Requirement::HasClaim {
                claim_type: "anything".to_string(),
            }],
        );
        assert_eq!(
            evaluator.evaluate("Open", &ClaimsSnapshot::default()),
            Decision::Allow
        );
    }
}
