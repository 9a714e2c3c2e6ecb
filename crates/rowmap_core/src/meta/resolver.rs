//! The metadata resolver: descriptors in, binding table out.

use crate::error::{CoreError, CoreResult};
use crate::meta::descriptor::{FieldKind, RelationshipDescriptor};
use crate::meta::registry::{EntityMeta, MetadataRegistry};
use std::collections::BTreeMap;

/// Resolved mapping for one entity type.
///
/// Construction walks the type's field descriptors once, validates them,
/// and precomputes everything the repository asks for: the table name, the
/// identity field, the column-binding map, and the relationship
/// descriptors. Resolvers are cached per type by the entity manager, so
/// the walk happens once for the process lifetime.
#[derive(Debug, Clone)]
pub struct Resolver {
    meta: EntityMeta,
    table: String,
    primary_field: String,
    primary_column: String,
    bindings: BTreeMap<String, String>,
    relationships: Vec<RelationshipDescriptor>,
}

impl Resolver {
    /// Resolves the named entity type against the registry.
    ///
    /// # Errors
    ///
    /// Fails with a metadata error if the type is unregistered, declares
    /// no table or no (or more than one) identity column, names an
    /// unregistered relationship target, or declares a many-to-many field
    /// without a join table.
    pub fn build(registry: &MetadataRegistry, entity_name: &str) -> CoreResult<Self> {
        let meta = registry.get(entity_name)?.clone();

        let table = meta
            .table
            .clone()
            .ok_or_else(|| CoreError::missing_table(&meta.name))?;

        let (primary_field, primary_column) = Self::resolve_primary(&meta)?;
        let bindings = Self::resolve_bindings(&meta, registry)?;
        let relationships = Self::resolve_relationships(&meta, registry)?;

        Ok(Self {
            meta,
            table,
            primary_field,
            primary_column,
            bindings,
            relationships,
        })
    }

    fn resolve_primary(meta: &EntityMeta) -> CoreResult<(String, String)> {
        let mut found = None;
        for field in &meta.fields {
            if let FieldKind::Column {
                column,
                primary: true,
                ..
            } = &field.kind
            {
                if found.is_some() {
                    return Err(CoreError::AmbiguousPrimaryKey {
                        entity: meta.name.clone(),
                    });
                }
                found = Some((field.name.clone(), column.clone()));
            }
        }
        found.ok_or_else(|| CoreError::missing_primary_key(&meta.name))
    }

    fn resolve_bindings(
        meta: &EntityMeta,
        registry: &MetadataRegistry,
    ) -> CoreResult<BTreeMap<String, String>> {
        let mut bindings = BTreeMap::new();
        for field in &meta.fields {
            match &field.kind {
                FieldKind::Column { column, .. } => {
                    bindings.insert(field.name.clone(), column.clone());
                }
                FieldKind::Relation {
                    kind,
                    target,
                    join_column,
                    ..
                } => {
                    if !registry.contains(target) {
                        return Err(CoreError::missing_target(&meta.name, &field.name, target));
                    }
                    // Collections are not direct columns. Owning singular
                    // relations surface their key as `{field}Id`.
                    if kind.is_singular() {
                        if let Some(join_column) = join_column {
                            bindings.insert(format!("{}Id", field.name), join_column.clone());
                        }
                    }
                }
            }
        }
        Ok(bindings)
    }

    fn resolve_relationships(
        meta: &EntityMeta,
        registry: &MetadataRegistry,
    ) -> CoreResult<Vec<RelationshipDescriptor>> {
        let mut descriptors = Vec::new();
        for field in &meta.fields {
            if let FieldKind::Relation {
                kind,
                target,
                join_column,
                join_table,
                inverse,
            } = &field.kind
            {
                if !registry.contains(target) {
                    return Err(CoreError::missing_target(&meta.name, &field.name, target));
                }
                if *kind == crate::meta::RelationKind::ManyToMany && join_table.is_none() {
                    return Err(CoreError::missing_join_table(&meta.name, &field.name));
                }
                descriptors.push(RelationshipDescriptor {
                    field: field.name.clone(),
                    kind: *kind,
                    target: target.clone(),
                    join_column: join_column.clone(),
                    join_table: join_table.clone(),
                    inverse: *inverse,
                });
            }
        }
        Ok(descriptors)
    }

    /// The entity type name this resolver maps.
    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.meta.name
    }

    /// The underlying declaration.
    #[must_use]
    pub fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    /// The table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The identity field name.
    #[must_use]
    pub fn primary_field(&self) -> &str {
        &self.primary_field
    }

    /// The identity column name.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_column
    }

    /// The column-binding map: field name to column name for plain columns,
    /// `{field}Id` to join column for owning singular relationships.
    /// Collection fields do not appear.
    #[must_use]
    pub fn column_bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }

    /// All relationship descriptors, in declaration order.
    #[must_use]
    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }

    /// First relationship whose target is the given entity type. Used to
    /// locate the side of a bidirectional relationship declared on the
    /// other type.
    #[must_use]
    pub fn relation_referencing(&self, target: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.target == target)
    }

    /// First owning singular relationship (join column present) whose
    /// target is the given entity type. This is the child-side foreign key
    /// a one-to-many cascade writes through.
    #[must_use]
    pub fn owning_relation_referencing(&self, target: &str) -> Option<&RelationshipDescriptor> {
        self.relationships
            .iter()
            .find(|r| r.target == target && r.kind.is_singular() && r.join_column.is_some())
    }

    /// Rewrites field-name tokens in a WHERE/ORDER fragment to column
    /// names using the binding map. Tokens are matched on word boundaries
    /// so `name` does not rewrite inside `surname`.
    #[must_use]
    pub fn rewrite_fragment(&self, fragment: &str) -> String {
        let mut out = String::with_capacity(fragment.len());
        let mut token = String::new();
        for ch in fragment.chars() {
            if ch.is_alphanumeric() || ch == '_' {
                token.push(ch);
            } else {
                self.flush_token(&mut out, &mut token);
                out.push(ch);
            }
        }
        self.flush_token(&mut out, &mut token);
        out
    }

    fn flush_token(&self, out: &mut String, token: &mut String) {
        if token.is_empty() {
            return;
        }
        match self.bindings.get(token.as_str()) {
            Some(column) => out.push_str(column),
            None => out.push_str(token),
        }
        token.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{EntityMeta, JoinTable, MetadataRegistry, RelationKind};

    fn registry() -> MetadataRegistry {
        let mut registry = MetadataRegistry::new();
        registry.register(
            EntityMeta::new("Author")
                .table("authors")
                .id("id", "id")
                .column("name", "full_name")
                .one_to_many("books", "Book"),
        );
        registry.register(
            EntityMeta::new("Book")
                .table("books")
                .id("id", "id")
                .column("title", "title")
                .many_to_one("author", "Author", "author_id"),
        );
        registry
    }

    #[test]
    fn bindings_cover_columns_and_owning_relations() {
        let resolver = Resolver::build(&registry(), "Book").unwrap();
        let bindings = resolver.column_bindings();
        assert_eq!(bindings.get("title").map(String::as_str), Some("title"));
        assert_eq!(bindings.get("authorId").map(String::as_str), Some("author_id"));
        assert!(!bindings.contains_key("author"));
    }

    #[test]
    fn collections_excluded_from_bindings() {
        let resolver = Resolver::build(&registry(), "Author").unwrap();
        assert!(!resolver.column_bindings().contains_key("books"));
        let descriptor = resolver.relation_referencing("Book").unwrap();
        assert_eq!(descriptor.kind, RelationKind::OneToMany);
    }

    #[test]
    fn missing_table_is_fatal() {
        let mut registry = MetadataRegistry::new();
        registry.register(EntityMeta::new("Tag").id("id", "id"));
        assert!(matches!(
            Resolver::build(&registry, "Tag"),
            Err(crate::error::CoreError::MissingTable { .. })
        ));
    }

    #[test]
    fn primary_key_must_be_unique() {
        let mut registry = MetadataRegistry::new();
        registry.register(EntityMeta::new("Tag").table("tags").column("label", "label"));
        assert!(matches!(
            Resolver::build(&registry, "Tag"),
            Err(crate::error::CoreError::MissingPrimaryKey { .. })
        ));

        registry.register(
            EntityMeta::new("Tag")
                .table("tags")
                .id("id", "id")
                .id("uuid", "uuid"),
        );
        assert!(matches!(
            Resolver::build(&registry, "Tag"),
            Err(crate::error::CoreError::AmbiguousPrimaryKey { .. })
        ));
    }

    #[test]
    fn unregistered_target_is_fatal() {
        let mut registry = MetadataRegistry::new();
        registry.register(
            EntityMeta::new("Book")
                .table("books")
                .id("id", "id")
                .many_to_one("author", "Author", "author_id"),
        );
        assert!(matches!(
            Resolver::build(&registry, "Book"),
            Err(crate::error::CoreError::MissingTarget { .. })
        ));
    }

    #[test]
    fn many_to_many_requires_join_table() {
        let mut registry = MetadataRegistry::new();
        registry.register(EntityMeta::new("Course").table("courses").id("id", "id"));
        let mut broken = EntityMeta::new("Student").table("students").id("id", "id");
        broken.fields.push(crate::meta::FieldMeta {
            name: "courses".into(),
            kind: crate::meta::FieldKind::Relation {
                kind: RelationKind::ManyToMany,
                target: "Course".into(),
                join_column: None,
                join_table: None,
                inverse: false,
            },
        });
        registry.register(broken);
        assert!(matches!(
            Resolver::build(&registry, "Student"),
            Err(crate::error::CoreError::MissingJoinTable { .. })
        ));

        registry.register(
            EntityMeta::new("Student")
                .table("students")
                .id("id", "id")
                .many_to_many(
                    "courses",
                    "Course",
                    JoinTable::new("enrollments", "student_id", "course_id"),
                ),
        );
        assert!(Resolver::build(&registry, "Student").is_ok());
    }

    proptest::proptest! {
        // Bindings in the fixture are all lowercase, so uppercase tokens
        // can never match and must come through untouched.
        #[test]
        fn unknown_tokens_pass_through(fragment in "[A-Z_]{1,8}( (=|!=|<|>) \\?)?") {
            let resolver = Resolver::build(&registry(), "Book").unwrap();
            proptest::prop_assert_eq!(resolver.rewrite_fragment(&fragment), fragment);
        }
    }

    #[test]
    fn fragment_rewrites_whole_tokens_only() {
        let mut reg = registry();
        reg.register(
            EntityMeta::new("Author")
                .table("authors")
                .id("id", "id")
                .column("name", "full_name")
                .column("surname", "surname"),
        );
        let resolver = Resolver::build(&reg, "Author").unwrap();
        assert_eq!(resolver.rewrite_fragment("name = ?"), "full_name = ?");
        assert_eq!(resolver.rewrite_fragment("surname = ?"), "surname = ?");
        assert_eq!(
            resolver.rewrite_fragment("name = ? AND surname != ?"),
            "full_name = ? AND surname != ?"
        );
    }
}
