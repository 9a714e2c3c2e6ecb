//! Entity type declarations and the process-wide registry.

use crate::error::{CoreError, CoreResult};
use crate::meta::descriptor::{FieldKind, FieldMeta, JoinTable, RelationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The static declaration of one entity type: a table name plus an ordered
/// set of field descriptors.
///
/// Built with the fluent methods below and registered in a
/// [`MetadataRegistry`] before any repository touches the type:
///
/// ```
/// use rowmap_core::meta::EntityMeta;
///
/// let author = EntityMeta::new("Author")
///     .table("authors")
///     .id("id", "id")
///     .column("name", "name");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    /// Logical entity type name.
    pub name: String,
    /// Table name. Validated by the resolver; absence is a metadata error.
    pub table: Option<String>,
    /// Ordered field descriptors.
    pub fields: Vec<FieldMeta>,
}

impl EntityMeta {
    /// Starts a declaration for the named entity type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// Sets the table name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Declares the identity field and its column.
    #[must_use]
    pub fn id(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.push(FieldMeta {
            name: field.into(),
            kind: FieldKind::Column {
                column: column.into(),
                primary: true,
                timestamp: false,
            },
        });
        self
    }

    /// Declares a plain scalar column.
    #[must_use]
    pub fn column(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.push(FieldMeta {
            name: field.into(),
            kind: FieldKind::Column {
                column: column.into(),
                primary: false,
                timestamp: false,
            },
        });
        self
    }

    /// Declares a timestamp column (bound as integer seconds).
    #[must_use]
    pub fn timestamp(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.push(FieldMeta {
            name: field.into(),
            kind: FieldKind::Column {
                column: column.into(),
                primary: false,
                timestamp: true,
            },
        });
        self
    }

    /// Declares the owning side of a one-to-one relationship.
    #[must_use]
    pub fn one_to_one(
        mut self,
        field: impl Into<String>,
        target: impl Into<String>,
        join_column: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldMeta {
            name: field.into(),
            kind: FieldKind::Relation {
                kind: RelationKind::OneToOne,
                target: target.into(),
                join_column: Some(join_column.into()),
                join_table: None,
                inverse: false,
            },
        });
        self
    }

    /// Declares a unidirectional one-to-one relationship with no local join
    /// column; the target holds the back-reference and is cascade-saved.
    #[must_use]
    pub fn one_to_one_unowned(
        mut self,
        field: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldMeta {
            name: field.into(),
            kind: FieldKind::Relation {
                kind: RelationKind::OneToOne,
                target: target.into(),
                join_column: None,
                join_table: None,
                inverse: false,
            },
        });
        self
    }

    /// Declares the inverse side of a bidirectional one-to-one relationship.
    #[must_use]
    pub fn one_to_one_inverse(
        mut self,
        field: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldMeta {
            name: field.into(),
            kind: FieldKind::Relation {
                kind: RelationKind::OneToOne,
                target: target.into(),
                join_column: None,
                join_table: None,
                inverse: true,
            },
        });
        self
    }

    /// Declares a many-to-one relationship (this side holds the key).
    #[must_use]
    pub fn many_to_one(
        mut self,
        field: impl Into<String>,
        target: impl Into<String>,
        join_column: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldMeta {
            name: field.into(),
            kind: FieldKind::Relation {
                kind: RelationKind::ManyToOne,
                target: target.into(),
                join_column: Some(join_column.into()),
                join_table: None,
                inverse: false,
            },
        });
        self
    }

    /// Declares a one-to-many collection; the target type holds the
    /// foreign key back to this type.
    #[must_use]
    pub fn one_to_many(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        self.fields.push(FieldMeta {
            name: field.into(),
            kind: FieldKind::Relation {
                kind: RelationKind::OneToMany,
                target: target.into(),
                join_column: None,
                join_table: None,
                inverse: false,
            },
        });
        self
    }

    /// Declares a many-to-many collection through a join table.
    #[must_use]
    pub fn many_to_many(
        mut self,
        field: impl Into<String>,
        target: impl Into<String>,
        join_table: JoinTable,
    ) -> Self {
        self.fields.push(FieldMeta {
            name: field.into(),
            kind: FieldKind::Relation {
                kind: RelationKind::ManyToMany,
                target: target.into(),
                join_column: None,
                join_table: Some(join_table),
                inverse: false,
            },
        });
        self
    }

    /// Returns the descriptor for a field, if declared.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Name-keyed registry of entity type declarations.
///
/// The registry is the pre-parsed metadata input to the engine: how the
/// declarations are authored (schema files, code, generation) is the
/// application's concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataRegistry {
    entities: BTreeMap<String, EntityMeta>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type declaration, replacing any previous one
    /// under the same name.
    pub fn register(&mut self, meta: EntityMeta) -> &mut Self {
        self.entities.insert(meta.name.clone(), meta);
        self
    }

    /// Looks up a declaration by entity type name.
    pub fn get(&self, name: &str) -> CoreResult<&EntityMeta> {
        self.entities
            .get(name)
            .ok_or_else(|| CoreError::unknown_entity(name))
    }

    /// Returns true if the name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Iterates over all registered declarations.
    pub fn iter(&self) -> impl Iterator<Item = &EntityMeta> {
        self.entities.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn register_and_lookup() {
        let mut registry = MetadataRegistry::new();
        registry.register(EntityMeta::new("Author").table("authors").id("id", "id"));

        assert!(registry.contains("Author"));
        assert_eq!(registry.get("Author").unwrap().table.as_deref(), Some("authors"));
        assert!(matches!(
            registry.get("Ghost"),
            Err(CoreError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn declarations_round_trip_through_serde() {
        let meta = EntityMeta::new("Book")
            .table("books")
            .id("id", "id")
            .column("title", "title")
            .many_to_one("author", "Author", "author_id");

        let json = serde_json::to_string(&meta).unwrap();
        let back: EntityMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
    }

    #[test]
    fn builder_declares_fields_in_order() {
        let meta = EntityMeta::new("Book")
            .table("books")
            .id("id", "id")
            .column("title", "title")
            .many_to_one("author", "Author", "author_id");

        let names: Vec<_> = meta.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "title", "author"]);
        assert!(meta.field("author").unwrap().relation_target() == Some("Author"));
    }
}
