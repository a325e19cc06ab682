use vams_core::{AppError, AppResult, PhysicalKey};

/// One item written by a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedWrite {
    /// Logical table name.
    pub table: String,
    /// Physical key the item was written under.
    pub key: PhysicalKey,
}

/// One item a provisioning run failed to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedFailure {
    /// Logical table name.
    pub table: String,
    /// Physical key of the item.
    pub key: PhysicalKey,
    /// Storage error message.
    pub error: String,
}

/// Outcome of a provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningReport {
    /// Items written successfully.
    pub written: Vec<SeedWrite>,
    /// Items that failed.
    pub failures: Vec<SeedFailure>,
}

impl ProvisioningReport {
    pub(super) fn record(&mut self, table: &str, key: PhysicalKey, outcome: AppResult<()>) {
        match outcome {
            Ok(()) => self.written.push(SeedWrite {
                table: table.to_owned(),
                key,
            }),
            Err(error) => self.failures.push(SeedFailure {
                table: table.to_owned(),
                key,
                error: error.to_string(),
            }),
        }
    }

    /// Returns the number of items written to `table`.
    #[must_use]
    pub fn written_to(&self, table: &str) -> usize {
        self.written.iter().filter(|write| write.table == table).count()
    }

    /// Returns whether every write succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Converts collected failures into an error listing the failing keys.
    pub fn into_result(self) -> AppResult<Self> {
        if self.failures.is_empty() {
            return Ok(self);
        }

        let failing = self
            .failures
            .iter()
            .map(|failure| format!("{}/{}: {}", failure.table, failure.key, failure.error))
            .collect::<Vec<_>>()
            .join("; ");

        Err(AppError::Internal(format!(
            "provisioning failed for {} item(s): {failing}",
            self.failures.len()
        )))
    }
}
