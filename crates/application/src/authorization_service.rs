use std::collections::BTreeSet;
use std::sync::Arc;

use vams_domain::{AccessRecord, PrecedencePolicy, Principal};

use crate::{AccessRecordRepository, RoleRepository, UserRoleRepository};

/// Identity of the caller an access decision is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    /// Authenticated user identifier.
    pub user_id: String,
    /// Whether the session was established with MFA.
    pub mfa_enabled: bool,
}

impl Requester {
    /// Creates a requester.
    #[must_use]
    pub fn new(user_id: impl Into<String>, mfa_enabled: bool) -> Self {
        Self {
            user_id: user_id.into(),
            mfa_enabled,
        }
    }
}

/// Principals and records resolved for one requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccess {
    /// The user principal plus one group principal per usable role.
    pub principals: BTreeSet<Principal>,
    /// Records fetched for those principals, unique by record id.
    pub records: Vec<AccessRecord>,
}

/// Application service evaluating constraints for requests.
///
/// Every call reads the current records; nothing is cached between requests.
#[derive(Clone)]
pub struct AuthorizationService {
    access_records: Arc<dyn AccessRecordRepository>,
    roles: Arc<dyn RoleRepository>,
    user_roles: Arc<dyn UserRoleRepository>,
    policy: PrecedencePolicy,
}

impl AuthorizationService {
    /// Creates a new authorization service from repository implementations.
    #[must_use]
    pub fn new(
        access_records: Arc<dyn AccessRecordRepository>,
        roles: Arc<dyn RoleRepository>,
        user_roles: Arc<dyn UserRoleRepository>,
        policy: PrecedencePolicy,
    ) -> Self {
        Self {
            access_records,
            roles,
            user_roles,
            policy,
        }
    }

    /// Returns the configured allow/deny precedence.
    #[must_use]
    pub fn policy(&self) -> PrecedencePolicy {
        self.policy
    }
}

mod evaluation;
mod principals;
