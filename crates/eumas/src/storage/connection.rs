//! Connection and schema management
//!
//! [`Connection`] owns the store handle and manages the two EUMAS classes.
//! Health and schema checks are probes: they report failures as `false`
//! instead of returning errors.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::memory::schema::{
    ClassSchema, MEMORY_CLASS, RELATION_CLASS, memory_class_schema, relation_class_schema,
};
use crate::storage::batch::{Batch, BatchConfig};
use crate::storage::query::GetQuery;
use crate::storage::weaviate::WeaviateClient;
use crate::storage::VectorStore;

/// Handle to the vector store plus schema management
#[derive(Clone)]
pub struct Connection {
    store: Arc<dyn VectorStore>,
    batch_config: BatchConfig,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("store", &self.store.name())
            .field("batch_config", &self.batch_config)
            .finish()
    }
}

impl Connection {
    /// Connect to the Weaviate instance named in `config`.
    pub fn connect(config: &Config) -> Result<Self> {
        let client = WeaviateClient::new(&config.store)?;
        Ok(Self::with_store(
            Arc::new(client),
            BatchConfig::from(&config.batch),
        ))
    }

    /// Wrap an existing store implementation.
    pub fn with_store(store: Arc<dyn VectorStore>, batch_config: BatchConfig) -> Self {
        Self {
            store,
            batch_config,
        }
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    pub fn batch_config(&self) -> BatchConfig {
        self.batch_config
    }

    /// Readiness probe. Never fails; store faults read as unhealthy.
    pub async fn is_healthy(&self) -> bool {
        match self.store.is_ready().await {
            Ok(ready) => ready,
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        }
    }

    /// Create the Memory class, then the relation class, skipping any that
    /// already exist.
    pub async fn create_schema(&self) -> Result<()> {
        for schema in [memory_class_schema(), relation_class_schema()] {
            if self.store.class_exists(&schema.class).await? {
                debug!("Class {} already exists", schema.class);
                continue;
            }
            info!("Creating class {}", schema.class);
            self.store.create_class(&schema).await?;
        }
        Ok(())
    }

    /// Delete the relation class, then the Memory class, skipping any that
    /// are absent. Relations reference memories, so they go first.
    pub async fn delete_schema(&self) -> Result<()> {
        for class in [RELATION_CLASS, MEMORY_CLASS] {
            if self.store.class_exists(class).await? {
                info!("Deleting class {}", class);
                self.store.delete_class(class).await?;
            }
        }
        Ok(())
    }

    /// Delete then recreate both classes. Not atomic: a failure between the
    /// two steps leaves the store without a schema.
    pub async fn reset_schema(&self) -> Result<()> {
        self.delete_schema().await?;
        self.create_schema().await
    }

    /// Check that both classes exist with exactly the declared property names.
    pub async fn validate_schema(&self) -> bool {
        for expected in [memory_class_schema(), relation_class_schema()] {
            if !self.validate_class(&expected).await {
                return false;
            }
        }
        true
    }

    async fn validate_class(&self, expected: &ClassSchema) -> bool {
        let live = match self.store.get_class(&expected.class).await {
            Ok(Some(live)) => live,
            Ok(None) => {
                warn!("Class {} does not exist", expected.class);
                return false;
            }
            Err(e) => {
                warn!("Schema validation failed for {}: {}", expected.class, e);
                return false;
            }
        };

        let expected_names = expected.property_names();
        let live_names = live.property_names();
        if expected_names == live_names {
            return true;
        }

        let missing: BTreeSet<_> = expected_names.difference(&live_names).collect();
        let extra: BTreeSet<_> = live_names.difference(&expected_names).collect();
        warn!(
            "Class {} properties differ: missing {:?}, unexpected {:?}",
            expected.class, missing, extra
        );
        false
    }

    /// Existence flag for each class. Store faults read as absent.
    pub async fn get_schema_status(&self) -> BTreeMap<String, bool> {
        let mut status = BTreeMap::new();
        for class in [MEMORY_CLASS, RELATION_CLASS] {
            let exists = match self.store.class_exists(class).await {
                Ok(exists) => exists,
                Err(e) => {
                    warn!("Could not check class {}: {}", class, e);
                    false
                }
            };
            status.insert(class.to_string(), exists);
        }
        status
    }

    /// Open a batch using the configured batch size.
    pub fn batch(&self) -> Batch<'_> {
        Batch::new(self.store.as_ref(), self.batch_config)
    }

    /// Open a batch with a specific size.
    pub fn batch_with_size(&self, batch_size: usize) -> Batch<'_> {
        let config = BatchConfig {
            batch_size: batch_size.max(1),
            ..self.batch_config
        };
        Batch::new(self.store.as_ref(), config)
    }

    /// Start a raw `Get` query against `class`.
    pub fn query(&self, class: &str) -> GetQuery {
        GetQuery::new(class)
    }

    /// Run a query built with [`Connection::query`].
    pub async fn execute(&self, query: &GetQuery) -> Result<Vec<Value>> {
        self.store.query(query).await
    }
}
