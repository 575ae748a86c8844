//! Scoped batch writes
//!
//! A [`Batch`] accumulates objects and sends them to the store whenever
//! `batch_size` objects are pending. Ids are assigned client-side when an
//! object is added, so [`Batch::flush`] returns them in insertion order.

use std::mem;

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::BatchSettings;
use crate::error::{ErrorContext, EumasError, Result};
use crate::storage::weaviate::TRANSPORT_ERROR_CODE;
use crate::storage::{StoreObject, VectorStore};

/// Batch sizing and retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Objects accumulated before an automatic flush
    pub batch_size: usize,
    /// Extra attempts for a flush that failed before reaching the store
    pub timeout_retries: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            timeout_retries: 3,
        }
    }
}

impl From<&BatchSettings> for BatchConfig {
    fn from(settings: &BatchSettings) -> Self {
        Self {
            batch_size: settings.batch_size.max(1),
            timeout_retries: settings.timeout_retries,
        }
    }
}

/// An open batch. Must be finished with [`Batch::flush`].
pub struct Batch<'a> {
    store: &'a dyn VectorStore,
    config: BatchConfig,
    pending: Vec<StoreObject>,
    ids: Vec<Uuid>,
    failures: Vec<(Uuid, String)>,
}

impl<'a> Batch<'a> {
    pub fn new(store: &'a dyn VectorStore, config: BatchConfig) -> Self {
        Self {
            store,
            config,
            pending: Vec::with_capacity(config.batch_size),
            ids: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn config(&self) -> BatchConfig {
        self.config
    }

    /// Number of objects added so far
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Queue an object, assigning an id if it has none. Sends the pending
    /// objects once `batch_size` is reached.
    ///
    /// If that send fails, its objects are recorded as rejected and the
    /// final [`Batch::flush`] reports them.
    pub async fn add(&mut self, mut object: StoreObject) -> Result<Uuid> {
        let id = *object.id.get_or_insert_with(Uuid::new_v4);
        self.ids.push(id);
        self.pending.push(object);

        if self.pending.len() >= self.config.batch_size {
            self.send_pending().await?;
        }
        Ok(id)
    }

    /// Send whatever is still pending and close the batch.
    ///
    /// Returns every added id in insertion order, or a database error listing
    /// the objects the store rejected.
    pub async fn flush(mut self) -> Result<Vec<Uuid>> {
        self.send_pending().await?;

        if !self.failures.is_empty() {
            let details: Vec<Value> = self
                .failures
                .iter()
                .map(|(id, message)| serde_json::json!({ "id": id, "error": message }))
                .collect();
            return Err(EumasError::database(
                ErrorContext::new(format!(
                    "{} of {} batch objects were rejected",
                    self.failures.len(),
                    self.ids.len()
                ))
                .with_code("BATCH_PARTIAL_FAILURE")
                .with_detail("failures", Value::Array(details)),
            ));
        }

        debug!("Batch finished with {} objects", self.ids.len());
        Ok(self.ids)
    }

    async fn send_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let objects = mem::take(&mut self.pending);
        let mut attempt = 0;
        let outcomes = loop {
            match self.store.create_objects(&objects).await {
                Ok(outcomes) => break outcomes,
                Err(e) if e.code() == Some(TRANSPORT_ERROR_CODE)
                    && attempt < self.config.timeout_retries =>
                {
                    attempt += 1;
                    warn!(
                        "Batch flush failed on attempt {}/{}, retrying",
                        attempt,
                        self.config.timeout_retries + 1
                    );
                }
                Err(e) => {
                    for object in &objects {
                        self.failures
                            .push((object.id.unwrap_or_default(), e.message().to_string()));
                    }
                    return Err(e);
                }
            }
        };

        for (object, outcome) in objects.iter().zip(outcomes) {
            if let Err(message) = outcome {
                let id = object.id.unwrap_or_default();
                warn!("Batch object {} rejected: {}", id, message);
                self.failures.push((id, message));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryStore, StoreCall};
    use serde_json::json;

    fn object(prompt: &str) -> StoreObject {
        StoreObject {
            class: "Memory".to_string(),
            id: None,
            properties: json!({ "userPrompt": prompt }).as_object().cloned().unwrap(),
            vector: None,
        }
    }

    #[tokio::test]
    async fn test_add_assigns_ids_in_order() {
        let store = InMemoryStore::new();
        let mut batch = Batch::new(&store, BatchConfig::default());

        let first = batch.add(object("a")).await.unwrap();
        let second = batch.add(object("b")).await.unwrap();
        assert_eq!(batch.len(), 2);

        let ids = batch.flush().await.unwrap();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(store.objects().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_automatic_send_is_reported_by_flush() {
        let store = InMemoryStore::new();
        store.fail_next_batches(1);
        let config = BatchConfig {
            batch_size: 1,
            timeout_retries: 0,
        };
        let mut batch = Batch::new(&store, config);

        let err = batch.add(object("lost")).await.unwrap_err();
        assert_eq!(err.code(), Some(TRANSPORT_ERROR_CODE));

        let err = batch.flush().await.unwrap_err();
        assert_eq!(err.code(), Some("BATCH_PARTIAL_FAILURE"));
        let failures = err.details()["failures"].as_array().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0]["error"], "connection reset by peer");
        assert!(store.objects().is_empty());
    }

    #[tokio::test]
    async fn test_later_chunks_still_send_after_a_failed_one() {
        let store = InMemoryStore::new();
        store.fail_next_batches(1);
        let config = BatchConfig {
            batch_size: 2,
            timeout_retries: 0,
        };
        let mut batch = Batch::new(&store, config);

        batch.add(object("a")).await.unwrap();
        assert!(batch.add(object("b")).await.is_err());
        batch.add(object("c")).await.unwrap();

        let err = batch.flush().await.unwrap_err();
        assert!(err.message().contains("2 of 3"));
        assert_eq!(store.objects().len(), 1);
        assert_eq!(
            store.calls(),
            vec![StoreCall::CreateObjects(2), StoreCall::CreateObjects(1)]
        );
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        let store = InMemoryStore::new();
        store.fail_next_batches(2);
        let config = BatchConfig {
            batch_size: 10,
            timeout_retries: 2,
        };
        let mut batch = Batch::new(&store, config);

        batch.add(object("a")).await.unwrap();
        assert_eq!(batch.flush().await.unwrap().len(), 1);
        assert_eq!(store.objects().len(), 1);
    }
}
