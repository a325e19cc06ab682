//! Per-principal storage projection of constraints.
//!
//! A constraint is fanned out into one [`AccessRecord`] per distinct group or
//! user it references so the authorization path can fetch records by principal
//! through an index instead of scanning every constraint.

use std::collections::BTreeSet;

use serde::Serialize;
use vams_core::{AppError, AppResult};

use crate::{Constraint, PermissionEntry, Principal};

/// Separator between the parts of a record identifier.
pub const RECORD_ID_SEPARATOR: char = '#';

/// Rejects identifier parts that would make a record identifier ambiguous.
pub(crate) fn ensure_record_id_part(label: &str, value: &str) -> AppResult<()> {
    if value.contains(RECORD_ID_SEPARATOR) {
        return Err(AppError::Validation(format!(
            "{label} '{value}' must not contain '{RECORD_ID_SEPARATOR}'"
        )));
    }

    Ok(())
}

/// One denormalized row of a constraint, keyed by constraint and principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    record_id: String,
    principal: Option<Principal>,
    constraint: Constraint,
}

impl AccessRecord {
    /// Creates the record of `constraint` indexed under `principal`.
    #[must_use]
    pub fn for_principal(constraint: Constraint, principal: Principal) -> Self {
        Self {
            record_id: record_id(constraint.constraint_id(), Some(&principal)),
            principal: Some(principal),
            constraint,
        }
    }

    /// Creates the principal-less record keyed by the bare constraint id.
    #[must_use]
    pub fn fallback(constraint: Constraint) -> Self {
        Self {
            record_id: record_id(constraint.constraint_id(), None),
            principal: None,
            constraint,
        }
    }

    /// Returns the storage identifier, e.g. `web-all#group#admin`.
    #[must_use]
    pub fn record_id(&self) -> &str {
        self.record_id.as_str()
    }

    /// Returns the identifier of the logical constraint.
    #[must_use]
    pub fn base_constraint_id(&self) -> &str {
        self.constraint.constraint_id()
    }

    /// Returns the indexed principal, absent on the fallback record.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns the full constraint copy carried by the record.
    #[must_use]
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// Returns the entries of the constraint that reference this record's principal.
    #[must_use]
    pub fn principal_permissions(&self) -> Vec<&PermissionEntry> {
        let Some(principal) = self.principal.as_ref() else {
            return Vec::new();
        };

        self.constraint
            .entries()
            .filter(|(entry_principal, _)| entry_principal == principal)
            .map(|(_, entry)| entry)
            .collect()
    }
}

/// Builds the storage identifier of a record.
///
/// Constraint and principal identifiers never contain [`RECORD_ID_SEPARATOR`],
/// so distinct pairs always yield distinct identifiers.
#[must_use]
pub fn record_id(constraint_id: &str, principal: Option<&Principal>) -> String {
    match principal {
        Some(principal) => format!(
            "{constraint_id}{RECORD_ID_SEPARATOR}{}{RECORD_ID_SEPARATOR}{}",
            principal.kind(),
            principal.id()
        ),
        None => constraint_id.to_owned(),
    }
}

/// Output of [`denormalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denormalized {
    /// Records to persist.
    pub records: Vec<AccessRecord>,
    /// Set when the constraint had no permission entries and a single
    /// principal-less record was produced instead.
    pub used_fallback: bool,
}

/// Fans a constraint out into one record per distinct principal.
///
/// Group principals come first, then users, each in first-seen order. Entries
/// sharing a principal collapse into that principal's single record.
#[must_use]
pub fn denormalize(constraint: &Constraint) -> Denormalized {
    let mut seen = BTreeSet::new();
    let records: Vec<AccessRecord> = constraint
        .entries()
        .filter_map(|(principal, _)| {
            seen.insert(principal.clone())
                .then(|| AccessRecord::for_principal(constraint.clone(), principal))
        })
        .collect();

    if records.is_empty() {
        return Denormalized {
            records: vec![AccessRecord::fallback(constraint.clone())],
            used_fallback: true,
        };
    }

    Denormalized {
        records,
        used_fallback: false,
    }
}
