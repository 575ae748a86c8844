//! Test utilities for eumas - in-memory store and log capture
//!
//! [`InMemoryStore`] implements [`VectorStore`] without a network so that
//! connection, batch and operation logic can be tested directly. It records
//! every call, evaluates where-filters on flat properties and can be told to
//! fail.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::error::{ErrorContext, EumasError, Result};
use crate::memory::schema::ClassSchema;
use crate::storage::weaviate::TRANSPORT_ERROR_CODE;
use crate::storage::{GetQuery, ObjectOutcome, StoreObject, VectorStore};

/// A call received by [`InMemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    IsReady,
    ClassExists(String),
    GetClass(String),
    CreateClass(String),
    DeleteClass(String),
    CreateObject(String),
    /// Number of objects in the request
    CreateObjects(usize),
    /// Rendered GraphQL document
    Query(String),
}

#[derive(Debug, Default)]
struct StoreState {
    calls: Vec<StoreCall>,
    classes: BTreeMap<String, ClassSchema>,
    objects: Vec<StoreObject>,
    failure: Option<String>,
    transport_failures: u32,
    rejected: Vec<String>,
}

/// In-memory [`VectorStore`] for tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        // A panicking test may poison the lock; the state is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every subsequent call fail with a database error, or stop failing.
    pub fn set_failure(&self, message: Option<&str>) {
        self.state().failure = message.map(str::to_string);
    }

    /// Fail the next `count` batch requests as if the connection dropped.
    pub fn fail_next_batches(&self, count: u32) {
        self.state().transport_failures = count;
    }

    /// Reject batch objects whose `userPrompt` equals `prompt`.
    pub fn reject_prompt(&self, prompt: &str) {
        self.state().rejected.push(prompt.to_string());
    }

    /// Declare a class directly, bypassing call recording.
    pub fn insert_class(&self, schema: ClassSchema) {
        self.state().classes.insert(schema.class.clone(), schema);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn class_names(&self) -> Vec<String> {
        self.state().classes.keys().cloned().collect()
    }

    /// Classes created, in call order
    pub fn created_classes(&self) -> Vec<String> {
        self.filter_calls(|call| match call {
            StoreCall::CreateClass(class) => Some(class.clone()),
            _ => None,
        })
    }

    /// Classes deleted, in call order
    pub fn deleted_classes(&self) -> Vec<String> {
        self.filter_calls(|call| match call {
            StoreCall::DeleteClass(class) => Some(class.clone()),
            _ => None,
        })
    }

    /// Last rendered GraphQL document, if any query ran
    pub fn last_query(&self) -> Option<String> {
        self.filter_calls(|call| match call {
            StoreCall::Query(document) => Some(document.clone()),
            _ => None,
        })
        .pop()
    }

    pub fn objects(&self) -> Vec<StoreObject> {
        self.state().objects.clone()
    }

    pub fn objects_of(&self, class: &str) -> Vec<StoreObject> {
        self.state()
            .objects
            .iter()
            .filter(|o| o.class == class)
            .cloned()
            .collect()
    }

    fn filter_calls<T>(&self, f: impl Fn(&StoreCall) -> Option<T>) -> Vec<T> {
        self.state().calls.iter().filter_map(f).collect()
    }

    /// Record the call and return the injected failure, if any.
    fn enter(&self, call: StoreCall) -> Result<MutexGuard<'_, StoreState>> {
        let mut state = self.state();
        state.calls.push(call);
        if let Some(message) = state.failure.clone() {
            drop(state);
            return Err(EumasError::database(
                ErrorContext::new(message).with_code("IN_MEMORY_FAILURE"),
            ));
        }
        Ok(state)
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn is_ready(&self) -> Result<bool> {
        self.enter(StoreCall::IsReady)?;
        Ok(true)
    }

    async fn class_exists(&self, class: &str) -> Result<bool> {
        let state = self.enter(StoreCall::ClassExists(class.to_string()))?;
        Ok(state.classes.contains_key(class))
    }

    async fn get_class(&self, class: &str) -> Result<Option<ClassSchema>> {
        let state = self.enter(StoreCall::GetClass(class.to_string()))?;
        Ok(state.classes.get(class).cloned())
    }

    async fn create_class(&self, schema: &ClassSchema) -> Result<()> {
        let mut state = self.enter(StoreCall::CreateClass(schema.class.clone()))?;
        if state.classes.contains_key(&schema.class) {
            drop(state);
            return Err(EumasError::database(
                ErrorContext::new(format!("class name {} already exists", schema.class))
                    .with_code("HTTP_422"),
            ));
        }
        state.classes.insert(schema.class.clone(), schema.clone());
        Ok(())
    }

    async fn delete_class(&self, class: &str) -> Result<()> {
        let mut state = self.enter(StoreCall::DeleteClass(class.to_string()))?;
        state.classes.remove(class);
        state.objects.retain(|o| o.class != class);
        Ok(())
    }

    async fn create_object(&self, object: &StoreObject) -> Result<Uuid> {
        let mut state = self.enter(StoreCall::CreateObject(object.class.clone()))?;
        let mut object = object.clone();
        let id = *object.id.get_or_insert_with(Uuid::new_v4);
        state.objects.push(object);
        Ok(id)
    }

    async fn create_objects(&self, objects: &[StoreObject]) -> Result<Vec<ObjectOutcome>> {
        let mut state = self.enter(StoreCall::CreateObjects(objects.len()))?;
        if state.transport_failures > 0 {
            state.transport_failures -= 1;
            drop(state);
            return Err(EumasError::database(
                ErrorContext::new("connection reset by peer").with_code(TRANSPORT_ERROR_CODE),
            ));
        }

        let mut outcomes = Vec::with_capacity(objects.len());
        for object in objects {
            let prompt = object.properties.get("userPrompt").and_then(Value::as_str);
            if prompt.is_some_and(|p| state.rejected.iter().any(|r| r == p)) {
                outcomes.push(Err("object rejected by store".to_string()));
                continue;
            }
            let mut object = object.clone();
            let id = *object.id.get_or_insert_with(Uuid::new_v4);
            state.objects.push(object);
            outcomes.push(Ok(id));
        }
        Ok(outcomes)
    }

    async fn query(&self, query: &GetQuery) -> Result<Vec<Value>> {
        let state = self.enter(StoreCall::Query(query.to_graphql()))?;

        let limit = query.limit.unwrap_or(usize::MAX);
        let results = state
            .objects
            .iter()
            .filter(|o| o.class == query.class)
            .filter(|o| {
                let mut properties = o.properties.clone();
                if let Some(id) = o.id {
                    properties.insert("id".to_string(), json!(id.to_string()));
                }
                query.filter.as_ref().is_none_or(|f| f.matches(&properties))
            })
            .take(limit)
            .map(|o| {
                let mut entry: Map<String, Value> = o.properties.clone();
                entry.insert("_additional".to_string(), json!({ "id": o.id }));
                Value::Object(entry)
            })
            .collect();
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return everything it logged.
pub fn capture_logs(f: impl FnOnce()) -> String {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();

    tracing::subscriber::with_default(subscriber, f);

    let bytes = buffer.0.lock().unwrap_or_else(|e| e.into_inner()).clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::WhereFilter;

    fn object(class: &str, prompt: &str, priority: f64) -> StoreObject {
        StoreObject {
            class: class.to_string(),
            id: None,
            properties: json!({ "userPrompt": prompt, "memoryPriority": priority })
                .as_object()
                .cloned()
                .unwrap(),
            vector: None,
        }
    }

    #[tokio::test]
    async fn test_query_filters_and_limits() {
        let store = InMemoryStore::new();
        store.create_object(&object("Memory", "a", 0.2)).await.unwrap();
        store.create_object(&object("Memory", "b", 0.7)).await.unwrap();
        store.create_object(&object("Memory", "c", 0.9)).await.unwrap();

        let query = GetQuery::new("Memory")
            .with_fields(["userPrompt"])
            .with_where(WhereFilter::greater_than_equal(&["memoryPriority"], 0.5).unwrap())
            .with_limit(1);
        let results = store.query(&query).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["userPrompt"], "b");
        assert!(results[0]["_additional"]["id"].is_string());
    }

    #[tokio::test]
    async fn test_failure_injection_records_call() {
        let store = InMemoryStore::new();
        store.set_failure(Some("down"));

        let err = store.is_ready().await.unwrap_err();
        assert_eq!(err.message(), "down");
        assert_eq!(store.calls(), vec![StoreCall::IsReady]);
    }

    #[tokio::test]
    async fn test_transport_failures_are_consumed() {
        let store = InMemoryStore::new();
        store.fail_next_batches(1);
        let objects = vec![object("Memory", "a", 0.5)];

        let err = store.create_objects(&objects).await.unwrap_err();
        assert_eq!(err.code(), Some(TRANSPORT_ERROR_CODE));
        assert!(store.create_objects(&objects).await.is_ok());
    }

    #[test]
    fn test_capture_logs_collects_events() {
        let logs = capture_logs(|| tracing::info!("hello from test"));
        assert!(logs.contains("hello from test"));
    }
}
