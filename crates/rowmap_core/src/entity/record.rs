//! The `Entity` record type.

use crate::entity::FieldValue;
use crate::error::{CoreError, CoreResult};
use crate::meta::{FieldKind, Resolver, ResolverCache};
use crate::value::{Row, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One row of a table plus its relationships, held in memory.
///
/// An entity is a plain data holder: named field values, an integer
/// identity (absent until the first insert), and a snapshot of the values
/// it was constructed or loaded with. The snapshot drives dirty-checking:
/// a save against an unchanged entity performs no writes.
///
/// Fields can only be populated through the declared descriptor table:
/// row keys without a matching descriptor are ignored during construction,
/// and addressing one explicitly is an [`UnknownField`](CoreError::UnknownField)
/// error.
#[derive(Debug, Clone)]
pub struct Entity {
    resolver: Arc<Resolver>,
    fields: BTreeMap<String, FieldValue>,
    snapshot: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an empty entity of the resolver's type.
    #[must_use]
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self {
            resolver,
            fields: BTreeMap::new(),
            snapshot: BTreeMap::new(),
        }
    }

    /// Constructs an entity from a row-shaped mapping.
    ///
    /// A field is populated only if it is declared and the raw value is
    /// non-null and non-empty. Map-valued input under a singular
    /// relationship field constructs the nested target entity; array-valued
    /// input under a collection field constructs one target per element.
    /// Hydrated join columns arrive as `{field}Id` scalars and are kept as
    /// such. Everything else in the row is ignored.
    ///
    /// # Errors
    ///
    /// Propagates metadata errors for the entity type or any nested target
    /// type.
    pub fn from_row(cache: &ResolverCache, entity_name: &str, row: &Row) -> CoreResult<Self> {
        let resolver = cache.resolver(entity_name)?;
        let mut entity = Self::new(Arc::clone(&resolver));

        for (key, raw) in row {
            if raw.is_empty() {
                continue;
            }
            if let Some(field) = resolver.meta().field(key) {
                match &field.kind {
                    FieldKind::Column { timestamp, .. } => {
                        let value = match raw {
                            Value::Integer(n) if *timestamp => Value::Timestamp(*n),
                            other => other.clone(),
                        };
                        entity.fields.insert(key.clone(), FieldValue::Scalar(value));
                    }
                    FieldKind::Relation { kind, target, .. } if kind.is_singular() => {
                        if let Value::Map(nested) = raw {
                            let child = Self::from_row(cache, target, nested)?;
                            entity
                                .fields
                                .insert(key.clone(), FieldValue::Related(Box::new(child)));
                        }
                    }
                    FieldKind::Relation { target, .. } => {
                        if let Value::Array(items) = raw {
                            let mut children = Vec::with_capacity(items.len());
                            for item in items {
                                if let Value::Map(nested) = item {
                                    children.push(Self::from_row(cache, target, nested)?);
                                }
                            }
                            if !children.is_empty() {
                                entity
                                    .fields
                                    .insert(key.clone(), FieldValue::Collection(children));
                            }
                        }
                    }
                }
            } else if resolver.column_bindings().contains_key(key.as_str()) {
                // A `{field}Id` pseudo-field carrying an owning join column.
                entity.fields.insert(key.clone(), FieldValue::Scalar(raw.clone()));
            }
        }

        entity.snapshot = entity.scalar_projection();
        Ok(entity)
    }

    /// The entity type name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.resolver.entity_name()
    }

    /// The resolver backing this entity's type.
    #[must_use]
    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// The identity value, if assigned.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.fields
            .get(self.resolver.primary_field())
            .and_then(FieldValue::as_scalar)
            .and_then(Value::as_i64)
    }

    /// Returns true once an identity has been assigned.
    #[must_use]
    pub fn has_id(&self) -> bool {
        self.id().is_some()
    }

    /// Assigns the identity. Non-positive values are ignored so a missed
    /// driver id cannot zero out an existing key.
    pub fn set_id(&mut self, id: i64) -> &mut Self {
        if id > 0 {
            self.fields.insert(
                self.resolver.primary_field().to_owned(),
                FieldValue::Scalar(Value::Integer(id)),
            );
        }
        self
    }

    /// Clears the identity, e.g. to persist a copy as a new row.
    pub fn clear_id(&mut self) -> &mut Self {
        self.fields.remove(self.resolver.primary_field());
        self
    }

    /// Sets a declared scalar field or a `{relation}Id` pseudo-field.
    ///
    /// # Errors
    ///
    /// `UnknownField` if the name is not in the column-binding map.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> CoreResult<&mut Self> {
        if !self.resolver.column_bindings().contains_key(field) {
            return Err(CoreError::unknown_field(self.name(), field));
        }
        self.fields
            .insert(field.to_owned(), FieldValue::Scalar(value.into()));
        Ok(self)
    }

    /// Attaches a related entity to a declared singular relationship field.
    ///
    /// # Errors
    ///
    /// `UnknownField` if the field is not a singular relationship.
    pub fn set_related(&mut self, field: &str, related: Entity) -> CoreResult<&mut Self> {
        match self.resolver.meta().field(field).map(|f| &f.kind) {
            Some(FieldKind::Relation { kind, .. }) if kind.is_singular() => {
                self.fields
                    .insert(field.to_owned(), FieldValue::Related(Box::new(related)));
                Ok(self)
            }
            _ => Err(CoreError::unknown_field(self.name(), field)),
        }
    }

    /// Appends an entity to a declared collection relationship field.
    ///
    /// # Errors
    ///
    /// `UnknownField` if the field is not a collection relationship.
    pub fn add_related(&mut self, field: &str, related: Entity) -> CoreResult<&mut Self> {
        match self.resolver.meta().field(field).map(|f| &f.kind) {
            Some(FieldKind::Relation { kind, .. }) if kind.is_collection() => {
                match self.fields.entry(field.to_owned()).or_insert_with(|| {
                    FieldValue::Collection(Vec::new())
                }) {
                    FieldValue::Collection(items) => items.push(related),
                    other => *other = FieldValue::Collection(vec![related]),
                }
                Ok(self)
            }
            _ => Err(CoreError::unknown_field(self.name(), field)),
        }
    }

    /// Replaces a declared collection relationship field wholesale.
    ///
    /// # Errors
    ///
    /// `UnknownField` if the field is not a collection relationship.
    pub fn set_collection(&mut self, field: &str, related: Vec<Entity>) -> CoreResult<&mut Self> {
        match self.resolver.meta().field(field).map(|f| &f.kind) {
            Some(FieldKind::Relation { kind, .. }) if kind.is_collection() => {
                self.fields
                    .insert(field.to_owned(), FieldValue::Collection(related));
                Ok(self)
            }
            _ => Err(CoreError::unknown_field(self.name(), field)),
        }
    }

    /// The raw field value, if set.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// The scalar value of a field, if set.
    #[must_use]
    pub fn scalar(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).and_then(FieldValue::as_scalar)
    }

    /// The related entity attached to a singular relationship field.
    #[must_use]
    pub fn related(&self, field: &str) -> Option<&Entity> {
        self.fields.get(field).and_then(FieldValue::as_related)
    }

    /// Mutable access to a singular relationship field.
    pub fn related_mut(&mut self, field: &str) -> Option<&mut Entity> {
        match self.fields.get_mut(field) {
            Some(FieldValue::Related(entity)) => Some(entity),
            _ => None,
        }
    }

    /// The collection attached to a collection relationship field.
    #[must_use]
    pub fn collection(&self, field: &str) -> Option<&[Entity]> {
        self.fields.get(field).and_then(FieldValue::as_collection)
    }

    /// Mutable access to a collection relationship field.
    pub fn collection_mut(&mut self, field: &str) -> Option<&mut Vec<Entity>> {
        match self.fields.get_mut(field) {
            Some(FieldValue::Collection(items)) => Some(items),
            _ => None,
        }
    }

    /// Flattens the entity to scalars: column fields verbatim, related
    /// entities as `{field}Id` → id, collections as arrays of ids. This is
    /// the shape compared for dirty-checking.
    ///
    /// An eager load leaves both the hydrated `{field}Id` scalar and the
    /// attached entity in place; the attachment wins here, matching the
    /// precedence the write bind gives it.
    #[must_use]
    pub fn scalar_projection(&self) -> BTreeMap<String, Value> {
        let mut projection = BTreeMap::new();
        for (name, value) in &self.fields {
            if let FieldValue::Scalar(scalar) = value {
                projection.insert(name.clone(), scalar.clone());
            }
        }
        for (name, value) in &self.fields {
            match value {
                FieldValue::Scalar(_) => {}
                FieldValue::Related(entity) => {
                    projection.insert(format!("{name}Id"), Value::from(entity.id()));
                }
                FieldValue::Collection(entities) => {
                    let ids = entities.iter().map(|e| Value::from(e.id())).collect();
                    projection.insert(name.clone(), Value::Array(ids));
                }
            }
        }
        projection
    }

    /// Compares current field values against the construction/load
    /// snapshot.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.scalar_projection() != self.snapshot
    }

    /// Re-baselines the snapshot to the current values. Called after a
    /// successful save or an eager relationship load so the entity reads
    /// as clean.
    pub(crate) fn refresh_snapshot(&mut self) {
        self.snapshot = self.scalar_projection();
    }
}
