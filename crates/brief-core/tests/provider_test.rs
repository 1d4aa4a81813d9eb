//! LLM proxy client against mocked provider endpoints.

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use brief_core::assistant::Message;
use brief_core::provider::{LlmClient, ProviderConfig, ProviderError, ProviderSet};

fn anthropic_only(server: &MockServer) -> ProviderSet {
    ProviderSet {
        anthropic: ProviderConfig::anthropic(Some("test-anthropic".into()))
            .with_base_url(server.uri()),
        openai: ProviderConfig::openai(None),
    }
}

fn openai_only(server: &MockServer) -> ProviderSet {
    ProviderSet {
        anthropic: ProviderConfig::anthropic(None),
        openai: ProviderConfig::openai(Some("test-openai".into())).with_base_url(server.uri()),
    }
}

fn anthropic_body(text: &str) -> serde_json::Value {
    json!({
        "id": "msg_1",
        "type": "message",
        "content": [{ "type": "text", "text": text }],
    })
}

fn openai_body(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": text } }],
    })
}

#[tokio::test]
async fn anthropic_structured_chat_reply() {
    let server = MockServer::start().await;
    let answer = r#"{"reply": "Add a call to action.", "state": {"campaign_name": "X"}, "quality_score": 6.5}"#;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-anthropic"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_body(answer)))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(anthropic_only(&server));
    let completion = client
        .chat(&[Message::user("review please")], &json!({}))
        .await
        .unwrap();

    assert_eq!(completion.reply, "Add a call to action.");
    assert_eq!(completion.state, json!({"campaign_name": "X"}));
    assert_eq!(completion.quality_score, Some(6.5));
}

#[tokio::test]
async fn openai_plain_text_reply_echoes_plan() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_body("  Sounds good.  ")))
        .mount(&server)
        .await;

    let plan = json!({"campaign_name": "Oat Milk"});
    let client = LlmClient::new(openai_only(&server));
    let completion = client.chat(&[Message::user("hi")], &plan).await.unwrap();

    assert_eq!(completion.reply, "Sounds good.");
    assert_eq!(completion.state, plan);
    assert_eq!(completion.quality_score, None);
}

#[tokio::test]
async fn score_is_clamped_and_gaps_truncated() {
    let server = MockServer::start().await;
    let answer = "```json\n{\"quality_score\": 14, \"gaps\": [\"a\", \"b\", \"c\", \"d\"], \"rationale\": \"thin\"}\n```";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_body(answer)))
        .mount(&server)
        .await;

    let client = LlmClient::new(openai_only(&server));
    let score = client.score(&json!({"campaign_name": ""})).await.unwrap();

    assert_eq!(score.quality_score, 10.0);
    assert_eq!(score.gaps, vec!["a", "b", "c"]);
    assert_eq!(score.rationale, "thin");
}

#[tokio::test]
async fn unparseable_score_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_body("I'd give it a 7.")))
        .mount(&server)
        .await;

    let client = LlmClient::new(anthropic_only(&server));
    let err = client.score(&json!({})).await.unwrap_err();
    assert!(matches!(err, ProviderError::Parse(_)), "{err:?}");
}

#[tokio::test]
async fn upstream_status_and_body_pass_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_string("{\"error\":\"rate_limited\"}"))
        .mount(&server)
        .await;

    let client = LlmClient::new(anthropic_only(&server));
    let err = client.chat(&[Message::user("hi")], &json!({})).await.unwrap_err();
    match err {
        ProviderError::Upstream { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "{\"error\":\"rate_limited\"}");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_key_fails_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = LlmClient::new(ProviderSet::default());
    let err = client.chat(&[Message::user("hi")], &json!({})).await.unwrap_err();
    assert!(matches!(err, ProviderError::MissingApiKey));
}

#[tokio::test]
async fn anthropic_conversation_opens_with_user_turn() {
    use brief_core::assistant::LlmAssistant;
    use brief_core::channel::{Mode, Session};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_body("Welcome aboard.")))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(anthropic_only(&server));
    let mut session = Session::new(Mode::Live, Box::new(LlmAssistant::new(client)));
    assert_eq!(session.transcript()[0].role, brief_core::assistant::Role::Assistant);

    let reply = session.send("hello").await.map(|m| m.content.clone());
    assert_eq!(reply.as_deref(), Some("Welcome aboard."));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "hello");
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn openai_keeps_greeting_after_system_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_body("ok")))
        .mount(&server)
        .await;

    let client = LlmClient::new(openai_only(&server));
    let history = [
        Message {
            role: brief_core::assistant::Role::Assistant,
            content: "Hi there".into(),
        },
        Message::user("hello"),
    ];
    client.complete("sys", &history).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let roles: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["role"].as_str())
        .collect();
    assert_eq!(roles, ["system", "assistant", "user"]);
}
