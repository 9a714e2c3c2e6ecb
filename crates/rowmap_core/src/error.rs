//! Error types for RowMap core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors that can occur in RowMap core operations.
///
/// Metadata and argument errors indicate programming or configuration
/// defects and are surfaced immediately. Data-level conflicts (constraint
/// violations) are recovered at the repository boundary into a
/// [`SaveReport`](crate::repository::SaveReport) instead of propagating
/// through this type. A find with no matching row is `Ok(None)`, never an
/// error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No entity type registered under the given name.
    #[error("unknown entity type: {name}")]
    UnknownEntity {
        /// The name that failed to resolve.
        name: String,
    },

    /// A field was addressed that the entity type does not declare.
    #[error("unknown field `{field}` on entity type `{entity}`")]
    UnknownField {
        /// The entity type.
        entity: String,
        /// The undeclared field name.
        field: String,
    },

    /// The entity type declares no table name.
    #[error("table name not defined for entity type `{entity}`")]
    MissingTable {
        /// The entity type.
        entity: String,
    },

    /// The entity type declares no identity field.
    #[error("primary key could not be found for entity type `{entity}`")]
    MissingPrimaryKey {
        /// The entity type.
        entity: String,
    },

    /// The entity type declares more than one identity field.
    #[error("entity type `{entity}` declares more than one primary key")]
    AmbiguousPrimaryKey {
        /// The entity type.
        entity: String,
    },

    /// A relationship field names no resolvable target entity type.
    #[error("field `{field}` on `{entity}` declared as a relationship but target entity `{target}` is not registered")]
    MissingTarget {
        /// The entity type carrying the relationship.
        entity: String,
        /// The relationship field.
        field: String,
        /// The unresolvable target name.
        target: String,
    },

    /// A bidirectional relationship has no owning side on the target type.
    #[error("no relationship on `{target}` holds a join column referencing `{entity}`")]
    MissingInverse {
        /// The entity type whose cascade or eager load needed the inverse.
        entity: String,
        /// The target type that was searched.
        target: String,
    },

    /// A many-to-many field declares no join table.
    #[error("field `{field}` on `{entity}` declared as many-to-many but no join table found")]
    MissingJoinTable {
        /// The entity type carrying the relationship.
        entity: String,
        /// The relationship field.
        field: String,
    },

    /// Caller passed a value of the wrong kind.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the mismatch.
        message: String,
    },

    /// The database driver failed outside the recoverable write path.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

impl CoreError {
    /// Creates an unknown entity error.
    pub fn unknown_entity(name: impl Into<String>) -> Self {
        Self::UnknownEntity { name: name.into() }
    }

    /// Creates an unknown field error.
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Creates a missing table error.
    pub fn missing_table(entity: impl Into<String>) -> Self {
        Self::MissingTable {
            entity: entity.into(),
        }
    }

    /// Creates a missing primary key error.
    pub fn missing_primary_key(entity: impl Into<String>) -> Self {
        Self::MissingPrimaryKey {
            entity: entity.into(),
        }
    }

    /// Creates a missing relationship target error.
    pub fn missing_target(
        entity: impl Into<String>,
        field: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::MissingTarget {
            entity: entity.into(),
            field: field.into(),
            target: target.into(),
        }
    }

    /// Creates a missing inverse-side error.
    pub fn missing_inverse(entity: impl Into<String>, target: impl Into<String>) -> Self {
        Self::MissingInverse {
            entity: entity.into(),
            target: target.into(),
        }
    }

    /// Creates a missing join table error.
    pub fn missing_join_table(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingJoinTable {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Errors raised by a [`Driver`](crate::driver::Driver) implementation.
///
/// Constraint violations are classified so the repository can translate
/// them into user-facing failure reports; everything else is `Database`.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate key: {message}")]
    DuplicateKey {
        /// The driver's description of the violation.
        message: String,
    },

    /// A foreign-key constraint rejected the write or delete.
    #[error("foreign key constraint fails: {message}")]
    ForeignKey {
        /// The driver's description of the violation.
        message: String,
    },

    /// Any other driver failure.
    #[error("database error: {message}")]
    Database {
        /// The driver's description of the failure.
        message: String,
    },
}

impl DriverError {
    /// Creates a duplicate key error.
    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::DuplicateKey {
            message: message.into(),
        }
    }

    /// Creates a foreign key error.
    pub fn foreign_key(message: impl Into<String>) -> Self {
        Self::ForeignKey {
            message: message.into(),
        }
    }

    /// Creates a generic database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Returns true if this is a constraint violation (duplicate key or
    /// foreign key) rather than a generic failure.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. } | Self::ForeignKey { .. })
    }
}
