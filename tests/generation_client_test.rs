use cardwise::domain::model::{CreationSource, GenerationRequest, ReviewStatus};
use cardwise::domain::ports::CardGenerator;
use cardwise::{CardError, CommunicationFailure, GenerationClient, GenerationConfig, WireFormat};
use httpmock::prelude::*;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn direct_client(server: &MockServer) -> GenerationClient {
    let mut config = GenerationConfig::new(server.url("/v1/generate"), "flashcard-model");
    config.api_key = Some("test-key".to_string());
    config.wire_format = WireFormat::Direct;
    GenerationClient::new(config).unwrap()
}

fn request(count: u32) -> GenerationRequest {
    GenerationRequest::new("The borrow checker enforces aliasing rules.", count)
}

#[tokio::test]
async fn test_five_valid_two_malformed() {
    let server = MockServer::start();
    let body = json!([
        {"front": "What does the borrow checker enforce?", "back": "Aliasing XOR mutability", "tags": ["rust"]},
        {"front": "What is a lifetime?", "back": "The scope a reference is valid for"},
        {"front": "What is a move?", "back": "Transfer of ownership", "categories": ["ownership"]},
        {"front": "What is Copy?", "back": "A marker trait for bitwise-copyable types"},
        {"front": "What is Drop?", "back": "Destructor trait"},
        {"front": "Missing back"},
        {"front": "", "back": "Empty front"}
    ]);

    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/generate")
            .header("authorization", "Bearer test-key")
            .json_body_partial(r#"{"model": "flashcard-model", "maxItems": 7}"#);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(body);
    });

    let batch = direct_client(&server)
        .generate(&request(7), &CancellationToken::new())
        .await
        .unwrap();

    api_mock.assert();
    assert_eq!(batch.candidates.len(), 5);
    assert_eq!(batch.dropped_count, 2);
    assert!(batch
        .candidates
        .iter()
        .all(|c| c.creation_source == CreationSource::Ai && c.review_status == ReviewStatus::New));
    assert!(batch.candidates[0].tags.contains("rust"));
}

#[tokio::test]
async fn test_zero_valid_items_is_validation_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/generate");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!([{"front": 1, "back": 2}, {"question": "q", "answer": "a"}]));
    });

    let result = direct_client(&server)
        .generate(&request(5), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(CardError::ValidationError { .. })));
}

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/generate");
        then.status(401)
            .header("Content-Type", "application/json")
            .json_body(json!({"error": "invalid api key"}));
    });

    let result = direct_client(&server)
        .generate(&request(5), &CancellationToken::new())
        .await;

    api_mock.assert();
    match result {
        Err(CardError::AuthenticationError { message }) => assert!(message.contains("401")),
        other => panic!("expected authentication error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_carries_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/generate");
        then.status(503).body("overloaded");
    });

    let result = direct_client(&server)
        .generate(&request(5), &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(CardError::CommunicationError {
            failure: CommunicationFailure::Status(503)
        })
    ));
}

#[tokio::test]
async fn test_non_json_content_type_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/generate");
        then.status(200)
            .header("Content-Type", "text/html")
            .body(r#"[{"front": "Q", "back": "A"}]"#);
    });

    let result = direct_client(&server)
        .generate(&request(5), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(CardError::ValidationError { .. })));
}

#[tokio::test]
async fn test_unparsable_body_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/generate");
        then.status(200)
            .header("Content-Type", "application/json")
            .body("[{\"front\": \"Q\", ");
    });

    let result = direct_client(&server)
        .generate(&request(5), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(CardError::ValidationError { .. })));
}

#[tokio::test]
async fn test_deadline_elapses_as_timeout() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/generate");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!([{"front": "Q", "back": "A"}]))
            .delay(Duration::from_secs(3));
    });

    let client = direct_client(&server);
    let started = Instant::now();
    let result = CardGenerator::generate(
        &client,
        &request(1),
        Instant::now() + Duration::from_millis(200),
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(
        result,
        Err(CardError::CommunicationError {
            failure: CommunicationFailure::Timeout
        })
    ));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/generate");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!([{"front": "Q", "back": "A"}]))
            .delay(Duration::from_secs(5));
    });

    let client = direct_client(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = client.generate(&request(1), &cancel).await;

    assert!(matches!(result, Err(CardError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_connection_refused_is_network_failure() {
    // nothing listens on the discard port
    let mut config = GenerationConfig::new("http://127.0.0.1:9/v1/generate", "flashcard-model");
    config.api_key = Some("test-key".to_string());
    config.wire_format = WireFormat::Direct;
    let client = GenerationClient::new(config).unwrap();

    let result = client
        .generate(&request(1), &CancellationToken::new())
        .await;

    match result {
        Err(error @ CardError::CommunicationError { .. }) => assert!(error.is_transient()),
        other => panic!("expected communication error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_completions_format() {
    let server = MockServer::start();
    let content = json!({
        "flashcards": [
            {"front": "What is Send?", "back": "Safe to move across threads", "tags": ["concurrency"]},
            {"front": "What is Sync?", "back": "Safe to share references across threads"}
        ]
    })
    .to_string();

    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer test-key")
            .body_contains("\"role\":\"system\"")
            .body_contains("Source text:");
        then.status(200)
            .header("Content-Type", "application/json; charset=utf-8")
            .json_body(json!({
                "id": "gen-1",
                "choices": [{
                    "index": 0,
                    "finish_reason": "stop",
                    "message": {"role": "assistant", "content": content}
                }]
            }));
    });

    let mut config = GenerationConfig::new(server.url("/v1/chat/completions"), "openai/gpt-4o-mini");
    config.api_key = Some("test-key".to_string());
    let client = GenerationClient::new(config).unwrap();

    let batch = client
        .generate(&request(2), &CancellationToken::new())
        .await
        .unwrap();

    api_mock.assert();
    assert_eq!(batch.candidates.len(), 2);
    assert_eq!(batch.dropped_count, 0);
    assert_eq!(batch.candidates[0].front, "What is Send?");
}
