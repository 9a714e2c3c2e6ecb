//! The entity record: a row's worth of field values plus its relationships.

mod field;
mod record;

pub use field::FieldValue;
pub use record::Entity;
