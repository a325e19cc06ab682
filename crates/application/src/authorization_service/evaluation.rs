use tracing::debug;
use vams_core::{AppError, AppResult};
use vams_domain::{AccessDecision, PermissionVerb, ResourceAttributes, decide};

use super::{AuthorizationService, Requester};

impl AuthorizationService {
    /// Decides whether the requester may apply `verb` to the resource.
    pub async fn evaluate(
        &self,
        requester: &Requester,
        resource: &ResourceAttributes,
        verb: PermissionVerb,
    ) -> AppResult<AccessDecision> {
        let resolved = self.resolve_access_records(requester).await?;
        let decision = decide(
            &resolved.records,
            &resolved.principals,
            resource,
            verb,
            self.policy,
        );

        debug!(
            user_id = %requester.user_id,
            object_type = %resource.object_type(),
            verb = %verb,
            records = resolved.records.len(),
            decision = ?decision,
            "evaluated access"
        );

        Ok(decision)
    }

    /// Ensures the requester may apply `verb` to the resource.
    pub async fn require(
        &self,
        requester: &Requester,
        resource: &ResourceAttributes,
        verb: PermissionVerb,
    ) -> AppResult<()> {
        match self.evaluate(requester, resource, verb).await? {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny | AccessDecision::NotApplicable => {
                Err(AppError::Forbidden(format!(
                    "user '{}' may not {verb} {} resource",
                    requester.user_id,
                    resource.object_type()
                )))
            }
        }
    }
}
