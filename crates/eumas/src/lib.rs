//! EUMAS - memory graph data-access layer
//!
//! Models interaction "memories" and archetype evaluations between them on top
//! of a Weaviate instance, and wraps the OpenAI embeddings endpoint used to
//! produce memory vectors.

pub mod config;
pub mod embedding;
pub mod error;
pub mod logging;
pub mod memory;
pub mod storage;
pub mod testing;

pub use config::Config;
pub use embedding::{EmbeddingClient, EmbeddingInput, EmbeddingOutput, EmbeddingRecord};
pub use error::{ErrorContext, ErrorKind, EumasError, Result};
pub use memory::{Archetype, ArchetypeMemoryRelation, Memory, MemoryOperations};
pub use storage::{BatchConfig, Connection, VectorStore, WeaviateClient};
