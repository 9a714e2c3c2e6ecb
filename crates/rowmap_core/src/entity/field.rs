//! In-memory field storage.

use crate::entity::Entity;
use crate::value::Value;

/// What one entity field holds in memory.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// A scalar column value.
    Scalar(Value),
    /// A singular related entity (one-to-one, many-to-one).
    Related(Box<Entity>),
    /// A collection of related entities (one-to-many, many-to-many).
    Collection(Vec<Entity>),
}

impl FieldValue {
    /// Returns the scalar content, if this is a scalar field.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the related entity, if this is a singular relationship.
    #[must_use]
    pub fn as_related(&self) -> Option<&Entity> {
        match self {
            FieldValue::Related(entity) => Some(entity),
            _ => None,
        }
    }

    /// Returns the related collection, if this is a collection field.
    #[must_use]
    pub fn as_collection(&self) -> Option<&[Entity]> {
        match self {
            FieldValue::Collection(entities) => Some(entities),
            _ => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Scalar(value)
    }
}
