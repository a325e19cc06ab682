mod repositories;
mod tables;

pub use repositories::{
    AccessRecordRepository, LegacyConstraintRepository, RoleRepository, UserRepository,
    UserRoleRepository,
};
pub use tables::AccessTables;
