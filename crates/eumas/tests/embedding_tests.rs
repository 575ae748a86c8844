//! Integration tests for the embedding client against a mock OpenAI API

use eumas::config::EmbeddingConfig;
use eumas::embedding::{EmbeddingClient, EmbeddingOutput};
use eumas::error::ErrorKind;
use serde_json::{Map, json};
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

fn create_client(server: &MockServer) -> EmbeddingClient {
    EmbeddingClient::new(&EmbeddingConfig {
        api_key: "sk-test".to_string(),
        api_url: server.uri(),
        ..EmbeddingConfig::default()
    })
    .unwrap()
}

async fn mount_embeddings(server: &MockServer, body: serde_json::Value) {
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/embeddings"))
        .and(matchers::header("Authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_text_gives_single_vector() {
    let server = MockServer::start().await;
    mount_embeddings(
        &server,
        json!({ "data": [{ "index": 0, "embedding": vec![0.25; 1536] }] }),
    )
    .await;

    let client = create_client(&server);
    let output = client.generate("Hello world").await.unwrap();

    match output {
        EmbeddingOutput::Single(vector) => assert_eq!(vector.len(), 1536),
        other => panic!("expected a single vector, got {other:?}"),
    }
}

#[tokio::test]
async fn test_batch_preserves_input_order() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/embeddings"))
        .and(matchers::body_json(json!({
            "input": ["first", "second"],
            "model": "text-embedding-ada-002"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "index": 1, "embedding": [2.0, 2.0] },
                { "index": 0, "embedding": [1.0, 1.0] }
            ]
        })))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let vectors = client
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(vectors, vec![vec![1.0, 1.0], vec![2.0, 2.0]]);
}

#[tokio::test]
async fn test_provider_error_is_wrapped() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/embeddings"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "Invalid input: empty string", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let err = client.embed("").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Embedding);
    assert!(err.message().starts_with("Failed to generate embeddings:"));
    assert!(err.message().contains("Invalid input: empty string"));
}

#[tokio::test]
async fn test_count_mismatch_is_embedding_error() {
    let server = MockServer::start().await;
    mount_embeddings(&server, json!({ "data": [] })).await;

    let client = create_client(&server);
    let err = client.embed("text").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Embedding);
    assert!(err.message().contains("expected 1 embeddings, received 0"));
}

#[tokio::test]
async fn test_generate_with_metadata() {
    let server = MockServer::start().await;
    mount_embeddings(
        &server,
        json!({ "data": [{ "index": 0, "embedding": [0.5, 0.5, 0.5] }] }),
    )
    .await;

    let client = create_client(&server);
    let mut metadata = Map::new();
    metadata.insert("source".to_string(), json!("chat"));

    let record = client
        .generate_with_metadata("remember this", Some(metadata))
        .await
        .unwrap();

    assert_eq!(record.embedding, vec![0.5, 0.5, 0.5]);
    assert_eq!(record.text, "remember this");
    assert_eq!(record.metadata["source"], "chat");
    assert_eq!(record.model, "text-embedding-ada-002");
}

#[tokio::test]
async fn test_metadata_defaults_to_empty() {
    let server = MockServer::start().await;
    mount_embeddings(&server, json!({ "data": [{ "index": 0, "embedding": [1.0] }] })).await;

    let client = create_client(&server);
    let record = client.generate_with_metadata("text", None).await.unwrap();

    assert!(record.metadata.is_empty());
}
