//! Structured write results.

use crate::error::DriverError;
use serde::{Deserialize, Serialize};

/// User-facing message for rejected deletes of referenced rows.
pub const FK_REMOVE_MESSAGE: &str =
    "Cannot delete or update a parent row: a foreign key constraint fails";

/// User-facing message for uniqueness violations.
pub const DUPLICATE_MESSAGE: &str = "Duplicate values are not allowed";

/// Classification of a recovered constraint failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// A uniqueness constraint rejected the write.
    DuplicateKey,
    /// The row is referenced by a foreign key.
    ForeignKeyInUse,
    /// Any other database rejection.
    Other,
}

/// What a save or remove call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveOutcome {
    /// The entity was clean; no statement was issued.
    Unchanged,
    /// A new row was inserted and an identity assigned.
    Inserted,
    /// The existing row was updated.
    Updated,
    /// The row was deleted.
    Removed,
    /// The transaction rolled back on a classified failure.
    Failed(ConstraintKind),
}

/// The result of a save or remove call.
///
/// Data-level conflicts are reported here rather than as errors so
/// callers can branch on success without exception handling; metadata and
/// argument defects still surface as hard
/// [`CoreError`](crate::error::CoreError)s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveReport {
    /// What happened.
    pub outcome: SaveOutcome,
    /// Failure message, present when `outcome` is `Failed`.
    pub message: Option<String>,
}

impl SaveReport {
    /// A no-op on a clean entity.
    #[must_use]
    pub fn unchanged() -> Self {
        Self {
            outcome: SaveOutcome::Unchanged,
            message: None,
        }
    }

    /// A successful insert.
    #[must_use]
    pub fn inserted() -> Self {
        Self {
            outcome: SaveOutcome::Inserted,
            message: None,
        }
    }

    /// A successful update.
    #[must_use]
    pub fn updated() -> Self {
        Self {
            outcome: SaveOutcome::Updated,
            message: None,
        }
    }

    /// A successful delete.
    #[must_use]
    pub fn removed() -> Self {
        Self {
            outcome: SaveOutcome::Removed,
            message: None,
        }
    }

    /// A rolled-back, classified failure.
    #[must_use]
    pub fn failed(kind: ConstraintKind, message: impl Into<String>) -> Self {
        Self {
            outcome: SaveOutcome::Failed(kind),
            message: Some(message.into()),
        }
    }

    /// True unless the write failed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !matches!(self.outcome, SaveOutcome::Failed(_))
    }
}

/// Translates a driver rejection into the user-facing classification.
pub(crate) fn classify(error: &DriverError) -> SaveReport {
    match error {
        DriverError::DuplicateKey { .. } => {
            SaveReport::failed(ConstraintKind::DuplicateKey, DUPLICATE_MESSAGE)
        }
        DriverError::ForeignKey { .. } => {
            SaveReport::failed(ConstraintKind::ForeignKeyInUse, FK_REMOVE_MESSAGE)
        }
        DriverError::Database { message } => {
            SaveReport::failed(ConstraintKind::Other, message.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let report = classify(&DriverError::duplicate_key("books.title"));
        assert_eq!(report.outcome, SaveOutcome::Failed(ConstraintKind::DuplicateKey));
        assert_eq!(report.message.as_deref(), Some(DUPLICATE_MESSAGE));

        let report = classify(&DriverError::foreign_key("books.author_id"));
        assert_eq!(
            report.outcome,
            SaveOutcome::Failed(ConstraintKind::ForeignKeyInUse)
        );
        assert!(!report.is_ok());
    }
}
