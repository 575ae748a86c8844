//! Weaviate HTTP client
//!
//! Implements [`VectorStore`] on top of the Weaviate REST and GraphQL
//! endpoints. Every method makes exactly one request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{ErrorContext, EumasError, Result};
use crate::memory::schema::ClassSchema;
use crate::storage::query::{GetQuery, extract_results};
use crate::storage::{ObjectOutcome, StoreObject, VectorStore};

/// Code attached to errors raised before any HTTP response was received
pub const TRANSPORT_ERROR_CODE: &str = "TRANSPORT";

/// Weaviate client configured from [`StoreConfig`]
#[derive(Debug, Clone)]
pub struct WeaviateClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct BatchObjectResponse {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    result: Option<BatchObjectResult>,
}

#[derive(Debug, Deserialize)]
struct BatchObjectResult {
    #[serde(default)]
    errors: Option<BatchErrors>,
}

#[derive(Debug, Deserialize)]
struct BatchErrors {
    #[serde(default)]
    error: Vec<BatchErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct BatchErrorMessage {
    message: String,
}

impl WeaviateClient {
    /// Create a client for the configured instance. Fails on a missing or
    /// malformed URL and on headers that are not valid HTTP.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(EumasError::config("WEAVIATE_URL is not set"));
        }

        let url = Url::parse(&config.url).map_err(|e| {
            EumasError::config(format!("Invalid Weaviate URL '{}': {e}", config.url))
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| EumasError::config(format!("Invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| EumasError::config(format!("Invalid value for header '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EumasError::config(format!("Failed to build HTTP client: {e}")))?;

        let base_url = url.as_str().trim_end_matches('/').to_string();
        info!("WeaviateClient initialized for {}", base_url);

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder, action: &str) -> Result<Response> {
        request.send().await.map_err(|e| {
            EumasError::database(
                ErrorContext::new(format!("Failed to {action}: {e}"))
                    .with_code(TRANSPORT_ERROR_CODE),
            )
        })
    }

    async fn ensure_success(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(EumasError::database(
            ErrorContext::new(format!("Failed to {action}: Weaviate returned {status}: {body}"))
                .with_code(format!("HTTP_{}", status.as_u16()))
                .with_detail("status", status.as_u16())
                .with_detail("body", body),
        ))
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response, action: &str) -> Result<T> {
        response.json().await.map_err(|e| {
            EumasError::database(format!("Failed to {action}: malformed response: {e}"))
        })
    }

    async fn fetch_class(&self, class: &str) -> Result<Option<Response>> {
        let action = format!("read class {class}");
        let response = self
            .send(self.client.get(self.endpoint(&format!("schema/{class}"))), &action)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::ensure_success(response, &action).await.map(Some)
    }
}

#[async_trait]
impl VectorStore for WeaviateClient {
    async fn is_ready(&self) -> Result<bool> {
        let response = self
            .send(
                self.client.get(self.endpoint(".well-known/ready")),
                "check readiness",
            )
            .await?;
        Ok(response.status().is_success())
    }

    async fn class_exists(&self, class: &str) -> Result<bool> {
        Ok(self.fetch_class(class).await?.is_some())
    }

    async fn get_class(&self, class: &str) -> Result<Option<ClassSchema>> {
        match self.fetch_class(class).await? {
            Some(response) => {
                let schema = Self::decode(response, &format!("read class {class}")).await?;
                Ok(Some(schema))
            }
            None => Ok(None),
        }
    }

    async fn create_class(&self, schema: &ClassSchema) -> Result<()> {
        let action = format!("create class {}", schema.class);
        debug!("Creating class {}", schema.class);
        let response = self
            .send(self.client.post(self.endpoint("schema")).json(schema), &action)
            .await?;
        Self::ensure_success(response, &action).await?;
        Ok(())
    }

    async fn delete_class(&self, class: &str) -> Result<()> {
        let action = format!("delete class {class}");
        debug!("Deleting class {}", class);
        let response = self
            .send(
                self.client.delete(self.endpoint(&format!("schema/{class}"))),
                &action,
            )
            .await?;
        Self::ensure_success(response, &action).await?;
        Ok(())
    }

    async fn create_object(&self, object: &StoreObject) -> Result<Uuid> {
        let action = format!("create {} object", object.class);
        let response = self
            .send(self.client.post(self.endpoint("objects")).json(object), &action)
            .await?;
        let response = Self::ensure_success(response, &action).await?;
        let created: CreatedObject = Self::decode(response, &action).await?;
        debug!("Created {} object {}", object.class, created.id);
        Ok(created.id)
    }

    async fn create_objects(&self, objects: &[StoreObject]) -> Result<Vec<ObjectOutcome>> {
        let action = format!("import batch of {} objects", objects.len());
        let response = self
            .send(
                self.client
                    .post(self.endpoint("batch/objects"))
                    .json(&json!({ "objects": objects })),
                &action,
            )
            .await?;
        let response = Self::ensure_success(response, &action).await?;
        let results: Vec<BatchObjectResponse> = Self::decode(response, &action).await?;

        if results.len() != objects.len() {
            return Err(EumasError::database(format!(
                "Failed to {action}: Weaviate acknowledged {} objects",
                results.len()
            )));
        }

        Ok(results
            .into_iter()
            .zip(objects)
            .map(|(result, object)| {
                let errors = result
                    .result
                    .and_then(|r| r.errors)
                    .map(|e| e.error)
                    .unwrap_or_default();
                if !errors.is_empty() {
                    let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
                    return Err(messages.join("; "));
                }
                result
                    .id
                    .or(object.id)
                    .ok_or_else(|| "Weaviate returned no id".to_string())
            })
            .collect())
    }

    async fn query(&self, query: &GetQuery) -> Result<Vec<Value>> {
        let document = query.to_graphql();
        debug!("GraphQL query: {}", document);

        let action = format!("query {}", query.class);
        let response = self
            .send(
                self.client
                    .post(self.endpoint("graphql"))
                    .json(&json!({ "query": document })),
                &action,
            )
            .await?;
        let response = Self::ensure_success(response, &action).await?;
        let body: Value = Self::decode(response, &action).await?;
        extract_results(&body, &query.class)
    }

    fn name(&self) -> &'static str {
        "weaviate"
    }
}
