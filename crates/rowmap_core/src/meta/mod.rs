//! Entity metadata: field descriptors, the type registry, and the resolver.
//!
//! Metadata is declared statically per entity type (a table name plus an
//! ordered set of field descriptors) and registered up front. The
//! [`Resolver`] translates one type's descriptors into the column-binding
//! map and relationship descriptors the repository works with; resolution
//! happens once per type and the result is cached by the entity manager
//! for the process lifetime.

mod cache;
mod descriptor;
mod registry;
mod resolver;

pub use cache::ResolverCache;
pub use descriptor::{FieldKind, FieldMeta, JoinTable, RelationKind, RelationshipDescriptor};
pub use registry::{EntityMeta, MetadataRegistry};
pub use resolver::Resolver;
