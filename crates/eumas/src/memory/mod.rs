//! Memory types and operations
//!
//! Defines the memory graph records, the archetype vocabulary, the class
//! declarations and the operations that store and query them.

pub mod archetype;
pub mod operations;
pub mod schema;
pub mod types;

pub use archetype::{Archetype, MetricSpec};
pub use operations::MemoryOperations;
pub use schema::{ClassSchema, MEMORY_CLASS, RELATION_CLASS, memory_class_schema, relation_class_schema, schema};
pub use types::{ArchetypeMemoryRelation, Memory, MemoryLink, memory_beacon};
