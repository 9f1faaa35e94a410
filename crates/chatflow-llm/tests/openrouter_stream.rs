//! HTTP-level tests for the OpenRouter client against a mock server.

use chatflow_llm::{
    ChatMessage, ChatRequest, LlmClient, LlmError, ModelCatalog, OpenRouterClient, collect_text,
};
use futures::StreamExt;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(events: &[&str]) -> String {
    let mut body = String::new();
    for event in events {
        body.push_str("data: ");
        body.push_str(event);
        body.push_str("\n\n");
    }
    body
}

fn delta_event(content: &str) -> String {
    serde_json::json!({
        "choices": [{"delta": {"content": content}, "finish_reason": null}]
    })
    .to_string()
}

fn client_for(server: &MockServer) -> OpenRouterClient {
    OpenRouterClient::new("test-key").with_base_url(server.uri())
}

#[tokio::test]
async fn test_streaming_deltas_are_collected_in_order() {
    let server = MockServer::start().await;

    let finish = serde_json::json!({
        "choices": [{"delta": {}, "finish_reason": "stop"}]
    })
    .to_string();
    let body = sse_body(&[
        &delta_event("Hel"),
        &delta_event("lo "),
        &delta_event("world"),
        &finish,
        "[DONE]",
    ]);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "stream": true,
            "max_tokens": 2048,
            "top_p": 1.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = ChatRequest::new("vendor/model:free", vec![ChatMessage::user("hi")]);
    let text = collect_text(client.chat_stream(request)).await.unwrap();

    assert_eq!(text, "Hello world");
}

#[tokio::test]
async fn test_provider_error_surfaces_before_any_delta() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = ChatRequest::new("vendor/model:free", vec![ChatMessage::user("hi")]);
    let mut stream = client.chat_stream(request);

    let first = stream.next().await.unwrap();
    match first {
        Err(error @ LlmError::Provider { status: 503, .. }) => {
            assert!(error.is_provider_unavailable());
        }
        other => panic!("expected provider error, got {:?}", other.map(|c| c.text)),
    }
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_trailing_event_without_terminator_is_salvaged() {
    let server = MockServer::start().await;

    // Last event lacks the closing blank line, as after an abrupt disconnect.
    let mut body = sse_body(&[&delta_event("partial ")]);
    body.push_str("data: ");
    body.push_str(&delta_event("tail"));

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = ChatRequest::new("vendor/model:free", vec![ChatMessage::user("hi")]);
    let text = collect_text(client.chat_stream(request)).await.unwrap();

    assert_eq!(text, "partial tail");
}

#[tokio::test]
async fn test_malformed_events_are_skipped() {
    let server = MockServer::start().await;

    let body = sse_body(&[&delta_event("good "), "{not json", &delta_event("still good")]);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = ChatRequest::new("vendor/model:free", vec![ChatMessage::user("hi")]);
    let text = collect_text(client.chat_stream(request)).await.unwrap();

    assert_eq!(text, "good still good");
}

#[tokio::test]
async fn test_model_listing_feeds_catalog() {
    let server = MockServer::start().await;

    let listing = serde_json::json!({
        "data": [
            {"id": "b/model:free", "name": "Beta", "context_length": 8192,
             "top_provider": {"max_completion_tokens": 2048}},
            {"id": "paid/model", "name": "Paid"},
            null,
            {"name": "missing id"},
            {"id": "a/model:free", "name": "Alpha", "context_length": 4096}
        ]
    });

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing))
        .mount(&server)
        .await;

    let client = Arc::new(client_for(&server));
    let catalog = ModelCatalog::new(client);

    let models = catalog.free_models().await.unwrap();
    let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);

    assert_eq!(catalog.resolve(Some("b/model:free")).await, "b/model:free");
    assert_eq!(
        catalog.resolve(Some("paid/model")).await,
        chatflow_llm::DEFAULT_MODEL
    );
}
