//! # RowMap Core
//!
//! A metadata-driven object-relational mapping engine.
//!
//! RowMap maps dynamically-described entities to relational table rows
//! through a static field-descriptor registry and performs CRUD plus
//! relationship-graph persistence transactionally. This crate provides:
//! - A metadata registry and per-type resolver (column bindings, primary
//!   key, relationship descriptors)
//! - The `Entity` record with identity and dirty-checking
//! - The `Driver` contract for the underlying database connection
//! - Per-type `Repository` gateways with relationship cascades
//! - The `EntityManager` façade owning the transaction boundary
//!
//! ```rust,ignore
//! use rowmap_core::{EntityManager, EntityMeta, MetadataRegistry};
//!
//! let mut registry = MetadataRegistry::new();
//! registry.register(
//!     EntityMeta::new("Author")
//!         .table("authors")
//!         .id("id", "id")
//!         .column("name", "name"),
//! );
//! let em = EntityManager::new(driver, registry);
//!
//! let mut author = em.new_entity("Author")?;
//! author.set("name", "Orwell")?;
//! em.persist(&mut author)?;
//! ```

pub mod driver;
pub mod entity;
pub mod error;
pub mod manager;
pub mod meta;
pub mod repository;
pub mod value;

pub use driver::{Condition, Driver, SelectColumn, SelectQuery};
pub use entity::{Entity, FieldValue};
pub use error::{CoreError, CoreResult, DriverError, DriverResult};
pub use manager::{EntityManager, RepositoryConfig};
pub use meta::{
    EntityMeta, FieldKind, FieldMeta, JoinTable, MetadataRegistry, RelationKind,
    RelationshipDescriptor, Resolver, ResolverCache,
};
pub use repository::{
    ConstraintKind, Criteria, FindOptions, Repository, SaveOutcome, SaveReport, DEFAULT_PAGE_SIZE,
};
pub use value::{Row, Value};
