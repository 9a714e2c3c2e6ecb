//! Static field descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four relationship shapes an entity field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    /// Exactly one target row on either side.
    OneToOne,
    /// Many local rows reference one target row (local side holds the key).
    ManyToOne,
    /// One local row is referenced by many target rows.
    OneToMany,
    /// Rows linked through a join table.
    ManyToMany,
}

impl RelationKind {
    /// Returns true for the singular kinds (one-to-one, many-to-one).
    #[must_use]
    pub fn is_singular(self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// Returns true for the collection kinds (one-to-many, many-to-many).
    #[must_use]
    pub fn is_collection(self) -> bool {
        !self.is_singular()
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OneToOne => "one-to-one",
            Self::ManyToOne => "many-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
        };
        write!(f, "{name}")
    }
}

/// Join table coordinates for a many-to-many relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTable {
    /// The join table name.
    pub table: String,
    /// Column referencing the local entity's primary key.
    pub local_column: String,
    /// Column referencing the target entity's primary key.
    pub target_column: String,
}

impl JoinTable {
    /// Creates a join table descriptor.
    pub fn new(
        table: impl Into<String>,
        local_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            local_column: local_column.into(),
            target_column: target_column.into(),
        }
    }
}

/// How one field maps to the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// A direct table column.
    Column {
        /// The column name.
        column: String,
        /// True for the identity column. Exactly one per entity type.
        primary: bool,
        /// True for timestamp-typed columns (bound as integer seconds).
        timestamp: bool,
    },
    /// A relationship to another entity type.
    Relation {
        /// Relationship shape.
        kind: RelationKind,
        /// Logical name of the target entity type.
        target: String,
        /// Local foreign-key column, present on the owning side of a
        /// singular relationship.
        join_column: Option<String>,
        /// Join table, required for many-to-many.
        join_table: Option<JoinTable>,
        /// True when this field is the inverse side of a bidirectional
        /// relationship (the target holds the join column).
        inverse: bool,
    },
}

/// One declared field of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    /// The field name as used on the entity.
    pub name: String,
    /// How the field maps to the database.
    pub kind: FieldKind,
}

impl FieldMeta {
    /// Returns the relation target if this field is a relationship.
    #[must_use]
    pub fn relation_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Relation { target, .. } => Some(target),
            FieldKind::Column { .. } => None,
        }
    }

    /// Returns true if this field is the identity column.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        matches!(&self.kind, FieldKind::Column { primary: true, .. })
    }

    /// Returns true if this field holds a collection of entities.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(&self.kind, FieldKind::Relation { kind, .. } if kind.is_collection())
    }
}

/// Full relationship detail handed to the repository's save and eager-load
/// cascades. Derived from a [`FieldKind::Relation`] descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    /// The field name on the local entity.
    pub field: String,
    /// Relationship shape.
    pub kind: RelationKind,
    /// Target entity type name.
    pub target: String,
    /// Local foreign-key column (owning side of a singular relationship).
    pub join_column: Option<String>,
    /// Join table (many-to-many only).
    pub join_table: Option<JoinTable>,
    /// True for the inverse side of a bidirectional relationship.
    pub inverse: bool,
}

impl RelationshipDescriptor {
    /// Returns true when the local entity owns the foreign key.
    #[must_use]
    pub fn is_owning(&self) -> bool {
        self.join_column.is_some()
    }

    /// Name of the scalar pseudo-field holding the target's id on the
    /// owning side, e.g. `author` carries its key in `authorId`.
    #[must_use]
    pub fn id_field(&self) -> String {
        format!("{}Id", self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_and_collection_kinds() {
        assert!(RelationKind::OneToOne.is_singular());
        assert!(RelationKind::ManyToOne.is_singular());
        assert!(RelationKind::OneToMany.is_collection());
        assert!(RelationKind::ManyToMany.is_collection());
    }

    #[test]
    fn id_field_naming() {
        let descriptor = RelationshipDescriptor {
            field: "author".into(),
            kind: RelationKind::ManyToOne,
            target: "Author".into(),
            join_column: Some("author_id".into()),
            join_table: None,
            inverse: false,
        };
        assert_eq!(descriptor.id_field(), "authorId");
        assert!(descriptor.is_owning());
    }
}
