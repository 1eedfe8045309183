//! Tests for AgentClient::exchange() against a mock agent
//!
//! Verifies streaming output, stream termination, tool rounds and the error
//! surface without a real agent running.

use nerdalert_chat::{
    AgentClient, ChatConfig, Endpoint, Error, Message, MessageRole, Tool, ToolCall, ToolRegistry,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn text_event(text: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"choices": [{"delta": {"content": text}}]})
    )
}

fn tool_event(call: &ToolCall) -> String {
    format!(
        "data: {}\n\n",
        json!({"choices": [{"delta": {"tool_calls": [call]}}]})
    )
}

fn stream(events: &[String]) -> ResponseTemplate {
    let mut body = events.concat();
    body.push_str("data: [DONE]\n\n");
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

fn client_for(server: &MockServer, max_tool_rounds: u32) -> AgentClient {
    let config = ChatConfig::builder()
        .base_url(server.uri())
        .request_timeout(5)
        .max_tool_rounds(max_tool_rounds)
        .build()
        .expect("Valid config");
    AgentClient::new(config).expect("Valid client")
}

fn echo_tool() -> Tool {
    Tool::new("echo", "Echo the 'text' argument", |args: Value| async move {
        Ok(args["text"].as_str().unwrap_or_default().to_string())
    })
}

#[tokio::test]
async fn test_text_only_stream_prints_concatenation() {
    // GIVEN: An agent that streams three text fragments
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(stream(&[
            text_event("Hello"),
            text_event(", "),
            text_event("world"),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let mut history = vec![Message::user("hi")];
    let mut out = Vec::new();

    // WHEN: One exchange runs
    client
        .exchange(Endpoint::Prompt, &mut history, &ToolRegistry::new(), &mut out)
        .await
        .expect("Exchange succeeds");

    // THEN: The fragments are printed in order and no tool round happened
    assert_eq!(String::from_utf8(out).unwrap(), "Hello, world");
    assert_eq!(history, vec![Message::user("hi")]);
}

#[tokio::test]
async fn test_request_body_carries_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(stream(&[text_event("ok")]))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let mut history = vec![Message::user("first"), Message::user("second")];
    client
        .exchange(Endpoint::Prompt, &mut history, &ToolRegistry::new(), &mut Vec::new())
        .await
        .expect("Exchange succeeds");

    let requests = server.received_requests().await.expect("Recording enabled");
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body,
        json!({"messages": [
            {"role": "user", "content": "first"},
            {"role": "user", "content": "second"}
        ]})
    );
}

#[tokio::test]
async fn test_start_endpoint_with_empty_history() {
    // GIVEN: An agent greeting on /start
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/start"))
        .respond_with(stream(&[text_event("I am NerdAlert.")]))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let mut history = Vec::new();
    let mut out = Vec::new();

    // WHEN: The greeting exchange runs with nothing in the history
    client
        .exchange(Endpoint::Start, &mut history, &ToolRegistry::new(), &mut out)
        .await
        .expect("Exchange succeeds");

    // THEN: The request body is an empty message list
    let requests = server.received_requests().await.expect("Recording enabled");
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body, json!({"messages": []}));
    assert_eq!(String::from_utf8(out).unwrap(), "I am NerdAlert.");
}

#[tokio::test]
async fn test_done_sentinel_stops_reading() {
    // GIVEN: A body that keeps going after [DONE]
    let server = MockServer::start().await;
    let body = format!(
        "{}data: [DONE]\n\n{}",
        text_event("kept"),
        text_event("dropped")
    );
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let mut out = Vec::new();
    client
        .exchange(Endpoint::Prompt, &mut vec![], &ToolRegistry::new(), &mut out)
        .await
        .expect("Exchange succeeds");

    // THEN: Nothing after the sentinel is printed
    assert_eq!(String::from_utf8(out).unwrap(), "kept");
}

#[tokio::test]
async fn test_malformed_and_foreign_lines_are_skipped() {
    let server = MockServer::start().await;
    let body = format!(
        ": keep-alive\nevent: message\ndata: {{not json\n{}id: 3\n{}",
        text_event("a"),
        text_event("b")
    );
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let mut out = Vec::new();
    client
        .exchange(Endpoint::Prompt, &mut vec![], &ToolRegistry::new(), &mut out)
        .await
        .expect("Stream without [DONE] still completes at end of body");

    assert_eq!(String::from_utf8(out).unwrap(), "ab");
}

#[tokio::test]
async fn test_tool_round_then_answer() {
    // GIVEN: An agent that first asks for the echo tool, then answers
    let server = MockServer::start().await;
    let call = ToolCall::new("call_1", "echo", r#"{"text":"pong"}"#);

    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(stream(&[text_event("Let me check. "), tool_event(&call)]))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(stream(&[text_event("Got pong.")]))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let tools = ToolRegistry::new().with(echo_tool());
    let mut history = vec![Message::user("ping?")];
    let mut out = Vec::new();

    // WHEN: The exchange runs
    client
        .exchange(Endpoint::Prompt, &mut history, &tools, &mut out)
        .await
        .expect("Exchange succeeds");

    // THEN: Both rounds were printed
    assert_eq!(String::from_utf8(out).unwrap(), "Let me check. Got pong.");

    // AND: The history holds the assistant tool request and the tool result
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].role, MessageRole::Assistant);
    assert_eq!(history[1].content, "Let me check. ");
    assert_eq!(history[1].tool_calls.as_deref(), Some(&[call][..]));
    assert_eq!(history[2], Message::tool("call_1", "echo", "pong"));

    // AND: The second request carried that history
    let requests = server.received_requests().await.expect("Recording enabled");
    assert_eq!(requests.len(), 2);
    let body: Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    assert_eq!(body["messages"][2]["tool_call_id"], "call_1");
    assert_eq!(body["messages"][2]["role"], "tool");
}

#[tokio::test]
async fn test_round_limit_fails_closed() {
    // GIVEN: An agent that never stops asking for tools
    let server = MockServer::start().await;
    let call = ToolCall::new("call_x", "echo", r#"{"text":"again"}"#);
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(stream(&[tool_event(&call)]))
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let tools = ToolRegistry::new().with(echo_tool());
    let mut history = vec![Message::user("loop")];

    // WHEN: The exchange runs with a limit of two rounds
    let result = client
        .exchange(Endpoint::Prompt, &mut history, &tools, &mut Vec::new())
        .await;

    // THEN: It fails after the initial request plus two tool rounds
    assert!(matches!(result, Err(Error::ToolRoundsExceeded(2))));
    let requests = server.received_requests().await.expect("Recording enabled");
    assert_eq!(requests.len(), 3);

    // AND: Every recorded tool request has its tool result
    assert_eq!(history.len(), 5);
    assert_eq!(history[3].role, MessageRole::Assistant);
    assert_eq!(history[4].role, MessageRole::Tool);
}

#[tokio::test]
async fn test_unknown_tool_is_reported_to_agent() {
    let server = MockServer::start().await;
    let call = ToolCall::new("call_9", "foo", "{}");
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(stream(&[tool_event(&call)]))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(stream(&[text_event("Sorry.")]))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let mut history = vec![Message::user("use foo")];
    client
        .exchange(Endpoint::Prompt, &mut history, &ToolRegistry::new(), &mut Vec::new())
        .await
        .expect("Exchange succeeds");

    assert_eq!(history[2].content, "Error: Unknown tool 'foo'.");
    assert_eq!(history[2].tool_call_id.as_deref(), Some("call_9"));
}

#[tokio::test]
async fn test_non_success_status_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let mut history = vec![Message::user("hi")];
    let result = client
        .exchange(Endpoint::Prompt, &mut history, &ToolRegistry::new(), &mut Vec::new())
        .await;

    match result {
        Err(Error::Api(message)) => {
            assert!(message.contains("503"));
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_slow_agent_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(stream(&[text_event("late")]).set_delay(std::time::Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = ChatConfig::builder()
        .base_url(server.uri())
        .request_timeout(1)
        .build()
        .expect("Valid config");
    let client = AgentClient::new(config).expect("Valid client");

    let result = client
        .exchange(Endpoint::Prompt, &mut vec![], &ToolRegistry::new(), &mut Vec::new())
        .await;

    assert!(matches!(result, Err(Error::Timeout)));
}

#[tokio::test]
async fn test_unreachable_agent_is_http_error() {
    let config = ChatConfig::builder()
        .base_url("http://127.0.0.1:9")
        .build()
        .expect("Valid config");
    let client = AgentClient::new(config).expect("Valid client");

    let result = client
        .exchange(Endpoint::Prompt, &mut vec![], &ToolRegistry::new(), &mut Vec::new())
        .await;

    assert!(matches!(result, Err(Error::Http(_))));
}
