use std::collections::{BTreeSet, HashSet};

use vams_core::AppResult;
use vams_domain::Principal;

use super::{AuthorizationService, Requester, ResolvedAccess};

impl AuthorizationService {
    /// Resolves the requester's principals.
    ///
    /// Without MFA only roles stored with `mfa_required == false` count; an
    /// assignment naming a role that is not stored is ignored in that case.
    pub async fn resolve_principals(&self, requester: &Requester) -> AppResult<BTreeSet<Principal>> {
        let assignments = self
            .user_roles
            .list_roles_for_user(requester.user_id.as_str())
            .await?;

        let usable_roles: Option<HashSet<String>> = if requester.mfa_enabled {
            None
        } else {
            Some(
                self.roles
                    .list_roles()
                    .await?
                    .into_iter()
                    .filter(|role| !role.mfa_required())
                    .map(|role| role.role_name().to_owned())
                    .collect(),
            )
        };

        let mut principals = BTreeSet::from([Principal::User(requester.user_id.clone())]);
        principals.extend(
            assignments
                .into_iter()
                .map(|assignment| assignment.role_name().to_owned())
                .filter(|role_name| {
                    usable_roles
                        .as_ref()
                        .is_none_or(|usable| usable.contains(role_name))
                })
                .map(Principal::Group),
        );

        Ok(principals)
    }

    /// Fetches the records indexed under each of the requester's principals.
    pub async fn resolve_access_records(&self, requester: &Requester) -> AppResult<ResolvedAccess> {
        let principals = self.resolve_principals(requester).await?;

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for principal in &principals {
            for record in self
                .access_records
                .list_access_records_for_principal(principal)
                .await?
            {
                if seen.insert(record.record_id().to_owned()) {
                    records.push(record);
                }
            }
        }

        Ok(ResolvedAccess {
            principals,
            records,
        })
    }
}
