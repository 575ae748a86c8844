//! OpenAI embedding client
//!
//! Wraps the `/embeddings` endpoint of an OpenAI-compatible API. The shape of
//! the input decides the shape of the output: one text gives one vector, a
//! list of texts gives a list of vectors in the same order.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::EmbeddingConfig;
use crate::error::{ErrorContext, EumasError, Result};

/// Text to embed
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    fn texts(&self) -> Vec<&str> {
        match self {
            EmbeddingInput::Single(text) => vec![text.as_str()],
            EmbeddingInput::Batch(texts) => texts.iter().map(String::as_str).collect(),
        }
    }
}

impl From<String> for EmbeddingInput {
    fn from(text: String) -> Self {
        EmbeddingInput::Single(text)
    }
}

impl From<&str> for EmbeddingInput {
    fn from(text: &str) -> Self {
        EmbeddingInput::Single(text.to_string())
    }
}

impl From<Vec<String>> for EmbeddingInput {
    fn from(texts: Vec<String>) -> Self {
        EmbeddingInput::Batch(texts)
    }
}

impl From<&[&str]> for EmbeddingInput {
    fn from(texts: &[&str]) -> Self {
        EmbeddingInput::Batch(texts.iter().map(|t| t.to_string()).collect())
    }
}

/// Vectors returned for an [`EmbeddingInput`] of the same variant
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutput {
    Single(Vec<f32>),
    Batch(Vec<Vec<f32>>),
}

impl EmbeddingOutput {
    /// The vector of a single-text request. A batch yields its first vector.
    pub fn into_single(self) -> Option<Vec<f32>> {
        match self {
            EmbeddingOutput::Single(vector) => Some(vector),
            EmbeddingOutput::Batch(vectors) => vectors.into_iter().next(),
        }
    }

    pub fn into_batch(self) -> Vec<Vec<f32>> {
        match self {
            EmbeddingOutput::Single(vector) => vec![vector],
            EmbeddingOutput::Batch(vectors) => vectors,
        }
    }
}

/// An embedding together with its source text and caller metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingRecord {
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: Map<String, Value>,
    pub model: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: Vec<&'a str>,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for the embeddings endpoint
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl EmbeddingClient {
    /// Build a client from `config`. Fails when no API key is configured.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(EumasError::config(
                ErrorContext::new("OPENAI_API_KEY is not set").with_code("MISSING_API_KEY"),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EumasError::config(format!("Failed to build HTTP client: {e}")))?;

        info!(
            "EmbeddingClient initialized with model: {}, api_url: {}",
            config.model, config.api_url
        );

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed one text or a list of texts in a single request.
    pub async fn generate(&self, input: impl Into<EmbeddingInput>) -> Result<EmbeddingOutput> {
        let input = input.into();
        let vectors = self
            .request(&input.texts())
            .await
            .map_err(EumasError::embedding)?;

        Ok(match input {
            EmbeddingInput::Single(_) => {
                EmbeddingOutput::Single(vectors.into_iter().next().unwrap_or_default())
            }
            EmbeddingInput::Batch(_) => EmbeddingOutput::Batch(vectors),
        })
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let output = self.generate(text).await?;
        Ok(output.into_single().unwrap_or_default())
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let output = self.generate(texts.to_vec()).await?;
        Ok(output.into_batch())
    }

    /// Embed `text` and package it with `metadata` and the model name.
    pub async fn generate_with_metadata(
        &self,
        text: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<EmbeddingRecord> {
        let embedding = self.embed(text).await?;
        Ok(EmbeddingRecord {
            embedding,
            text: text.to_string(),
            metadata: metadata.unwrap_or_default(),
            model: self.model.clone(),
        })
    }

    /// One POST to `/embeddings`. Errors are plain descriptions; the caller
    /// wraps them into a single embedding error.
    async fn request(&self, texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, String> {
        let url = format!("{}/embeddings", self.api_url);
        debug!("Requesting {} embeddings from {}", texts.len(), url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                input: texts.to_vec(),
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(format!("API returned {status}: {message}"));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| e.to_string())?;
        if parsed.data.len() != texts.len() {
            return Err(format!(
                "expected {} embeddings, received {}",
                texts.len(),
                parsed.data.len()
            ));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}
