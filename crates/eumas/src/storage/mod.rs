//! Vector store access
//!
//! [`VectorStore`] is the narrow interface the rest of the crate uses to reach
//! the database. [`WeaviateClient`] implements it over HTTP;
//! [`crate::testing::InMemoryStore`] implements it for tests.

pub mod batch;
pub mod connection;
pub mod filter;
pub mod query;
pub mod weaviate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::memory::schema::ClassSchema;

pub use batch::{Batch, BatchConfig};
pub use connection::Connection;
pub use filter::{FilterValue, Operator, WhereFilter};
pub use query::GetQuery;
pub use weaviate::WeaviateClient;

/// An object as written to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreObject {
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// Per-object result of a batch write: the object id, or the store's
/// error message for that object.
pub type ObjectOutcome = std::result::Result<Uuid, String>;

/// Operations consumed from the vector store
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Readiness probe
    async fn is_ready(&self) -> Result<bool>;

    /// Whether a class is declared
    async fn class_exists(&self, class: &str) -> Result<bool>;

    /// Live declaration of a class, `None` when absent
    async fn get_class(&self, class: &str) -> Result<Option<ClassSchema>>;

    async fn create_class(&self, schema: &ClassSchema) -> Result<()>;

    async fn delete_class(&self, class: &str) -> Result<()>;

    /// Create one object and return the id assigned by the store
    async fn create_object(&self, object: &StoreObject) -> Result<Uuid>;

    /// Create many objects in one request. Outcomes are in input order.
    async fn create_objects(&self, objects: &[StoreObject]) -> Result<Vec<ObjectOutcome>>;

    /// Run a `Get` query and return the raw result entries
    async fn query(&self, query: &GetQuery) -> Result<Vec<Value>>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
