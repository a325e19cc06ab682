use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vams_core::AppError;

use crate::{AccessRecord, PermissionType, PermissionVerb, Principal, ResourceAttributes};

/// How conflicting allow and deny entries for the same verb resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedencePolicy {
    /// Any matching deny wins over every allow.
    #[default]
    DenyOverrides,
    /// Any matching allow wins over every deny.
    AllowOverrides,
}

impl PrecedencePolicy {
    /// Returns a stable configuration value for this policy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DenyOverrides => "deny_overrides",
            Self::AllowOverrides => "allow_overrides",
        }
    }
}

impl FromStr for PrecedencePolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "deny_overrides" => Ok(Self::DenyOverrides),
            "allow_overrides" => Ok(Self::AllowOverrides),
            _ => Err(AppError::Validation(format!(
                "unknown precedence policy '{value}'"
            ))),
        }
    }
}

/// Outcome of evaluating access records for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// At least one entry allows and the policy lets it win.
    Allow,
    /// At least one entry denies and the policy lets it win.
    Deny,
    /// No entry of a matching constraint covers the verb.
    NotApplicable,
}

impl AccessDecision {
    /// Returns whether the request may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decides a request from the records fetched for the requester's principals.
///
/// Only entries naming one of `principals` count; records carry full
/// constraint copies and may hold entries for other principals too.
#[must_use]
pub fn decide(
    records: &[AccessRecord],
    principals: &BTreeSet<Principal>,
    resource: &ResourceAttributes,
    verb: PermissionVerb,
    policy: PrecedencePolicy,
) -> AccessDecision {
    let mut allowed = false;
    let mut denied = false;

    for record in records {
        let constraint = record.constraint();
        if !constraint.matches(resource) {
            continue;
        }

        for (principal, entry) in constraint.entries() {
            if entry.permission() != verb || !principals.contains(&principal) {
                continue;
            }
            match entry.permission_type() {
                PermissionType::Allow => allowed = true,
                PermissionType::Deny => denied = true,
            }
        }
    }

    match (allowed, denied, policy) {
        (false, false, _) => AccessDecision::NotApplicable,
        (true, false, _) => AccessDecision::Allow,
        (false, true, _) => AccessDecision::Deny,
        (true, true, PrecedencePolicy::DenyOverrides) => AccessDecision::Deny,
        (true, true, PrecedencePolicy::AllowOverrides) => AccessDecision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{AccessDecision, PrecedencePolicy, decide};
    use crate::{
        AccessRecord, Constraint, ConstraintAudit, Criteria, CriteriaExpression,
        CriteriaOperator, ObjectType, PermissionEntry, PermissionType, PermissionVerb, Principal,
        ResourceAttributes, denormalize,
    };

    fn api_constraint(id: &str, groups: Vec<PermissionEntry>) -> Constraint {
        let criteria = Criteria::Or(vec![
            CriteriaExpression::new("c1", "route__path", CriteriaOperator::StartsWith, "/assets")
                .unwrap_or_else(|error| panic!("{error}")),
        ]);
        Constraint::new(
            id,
            id,
            "assets api",
            ObjectType::Api,
            criteria,
            groups,
            Vec::new(),
            ConstraintAudit::created_now("test"),
        )
        .unwrap_or_else(|error| panic!("{error}"))
    }

    fn entry(principal: &str, verb: PermissionVerb, effect: PermissionType) -> PermissionEntry {
        PermissionEntry::new("p", principal, verb, effect).unwrap_or_else(|error| panic!("{error}"))
    }

    fn records(constraints: &[Constraint]) -> Vec<AccessRecord> {
        constraints
            .iter()
            .flat_map(|constraint| denormalize(constraint).records)
            .collect()
    }

    fn group(name: &str) -> BTreeSet<Principal> {
        BTreeSet::from([Principal::Group(name.to_owned())])
    }

    #[test]
    fn matching_allow_grants_verb() {
        let records = records(&[api_constraint(
            "assets",
            vec![entry("readers", PermissionVerb::Get, PermissionType::Allow)],
        )]);

        let decision = decide(
            &records,
            &group("readers"),
            &ResourceAttributes::api_route("/assets/a-1"),
            PermissionVerb::Get,
            PrecedencePolicy::default(),
        );
        assert_eq!(decision, AccessDecision::Allow);
    }

    #[test]
    fn other_verbs_and_paths_are_not_applicable() {
        let records = records(&[api_constraint(
            "assets",
            vec![entry("readers", PermissionVerb::Get, PermissionType::Allow)],
        )]);
        let principals = group("readers");

        let post = decide(
            &records,
            &principals,
            &ResourceAttributes::api_route("/assets"),
            PermissionVerb::Post,
            PrecedencePolicy::default(),
        );
        assert_eq!(post, AccessDecision::NotApplicable);

        let other_path = decide(
            &records,
            &principals,
            &ResourceAttributes::api_route("/unknown"),
            PermissionVerb::Get,
            PrecedencePolicy::default(),
        );
        assert!(!other_path.is_allowed());
    }

    #[test]
    fn entries_of_other_principals_are_ignored() {
        let records = records(&[api_constraint(
            "assets",
            vec![
                entry("readers", PermissionVerb::Get, PermissionType::Allow),
                entry("writers", PermissionVerb::Put, PermissionType::Allow),
            ],
        )]);

        let decision = decide(
            &records,
            &group("readers"),
            &ResourceAttributes::api_route("/assets"),
            PermissionVerb::Put,
            PrecedencePolicy::default(),
        );
        assert_eq!(decision, AccessDecision::NotApplicable);
    }

    #[test]
    fn conflicting_entries_follow_policy() {
        let records = records(&[
            api_constraint(
                "allow-assets",
                vec![entry("readers", PermissionVerb::Get, PermissionType::Allow)],
            ),
            api_constraint(
                "deny-assets",
                vec![entry("readers", PermissionVerb::Get, PermissionType::Deny)],
            ),
        ]);
        let principals = group("readers");
        let resource = ResourceAttributes::api_route("/assets");

        let deny_wins = decide(
            &records,
            &principals,
            &resource,
            PermissionVerb::Get,
            PrecedencePolicy::DenyOverrides,
        );
        assert_eq!(deny_wins, AccessDecision::Deny);

        let allow_wins = decide(
            &records,
            &principals,
            &resource,
            PermissionVerb::Get,
            PrecedencePolicy::AllowOverrides,
        );
        assert_eq!(allow_wins, AccessDecision::Allow);
    }
}
