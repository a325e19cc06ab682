//! User records seeded for deployment bootstrap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vams_core::{AppError, AppResult, NonEmptyString};

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: exactly one `@`, non-empty local
    /// part, and a domain containing at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::Validation(format!(
                "email address '{value}' must contain '@'"
            )));
        };

        if local.is_empty() || domain.contains('@') {
            return Err(AppError::Validation(format!(
                "email address '{value}' is malformed"
            )));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Stored user record, e.g. the admin bootstrap user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    user_id: NonEmptyString,
    email: EmailAddress,
    created_on: DateTime<Utc>,
}

impl UserRecord {
    /// Creates a validated user record.
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        created_on: DateTime<Utc>,
    ) -> AppResult<Self> {
        let user_id = NonEmptyString::new(user_id)
            .map_err(|_| AppError::Validation("userId must not be empty".to_owned()))?;

        Ok(Self {
            user_id,
            email: EmailAddress::new(email)?,
            created_on,
        })
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the creation time.
    #[must_use]
    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }
}
