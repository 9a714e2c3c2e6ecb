//! # RowMap Testkit
//!
//! Test utilities for RowMap.
//!
//! This crate provides:
//! - An in-memory [`Driver`](rowmap_core::Driver) implementation with
//!   constraint simulation and statement counters
//! - Ready-made sample schemas and a wired [`TestStore`]
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rowmap_testkit::with_store;
//!
//! #[test]
//! fn test_with_store() {
//!     with_store(|store| {
//!         let mut author = store.new_entity("Author").unwrap();
//!         author.set("name", "Orwell").unwrap();
//!         assert!(store.persist(&mut author).unwrap());
//!     });
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod memory;

pub use fixtures::{sample_driver, sample_registry, with_store, TestStore};
pub use memory::{MemoryDriver, Statements, TableSpec};
