//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access_record;
mod constraint;
mod criteria;
mod decision;
mod permission;
mod resource;
mod role;
mod user;

pub use access_record::{
    AccessRecord, Denormalized, RECORD_ID_SEPARATOR, denormalize, record_id,
};
pub use constraint::{Constraint, ConstraintAudit, ObjectType};
pub use criteria::{Criteria, CriteriaExpression, CriteriaOperator};
pub use decision::{AccessDecision, PrecedencePolicy, decide};
pub use permission::{PermissionEntry, PermissionType, PermissionVerb, Principal};
pub use resource::{OBJECT_TYPE_FIELD, ROUTE_PATH_FIELD, ResourceAttributes, ResourceValue};
pub use role::{Role, RoleSource, UserRoleAssignment};
pub use user::{EmailAddress, UserRecord};
