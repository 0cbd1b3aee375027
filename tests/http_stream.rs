//! End-to-end coverage of the HTTP transport against a real SSE server.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::stream::{self, Stream, StreamExt};

use vitala_chat::{
    ChatConfig, ChatEngine, HttpTransport, Role, SendInput, StaticToken, TokenProvider,
    STOP_MARKER, STREAM_ERROR_TEXT,
};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fixture");
    });
    format!("http://{addr}/api/chat")
}

fn engine_for(endpoint: &str, tokens: Arc<dyn TokenProvider>) -> ChatEngine {
    let config = ChatConfig::new(endpoint).expect("valid endpoint");
    let transport = Arc::new(HttpTransport::new(&config));
    ChatEngine::new(config, transport, tokens)
}

fn text_input(message: &str) -> SendInput {
    SendInput {
        message: message.into(),
        ..Default::default()
    }
}

fn sse_events(events: Vec<Event>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(stream::iter(events.into_iter().map(Ok)))
}

async fn wait_idle(engine: &ChatEngine) {
    for _ in 0..2000 {
        if !engine.is_loading() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("engine never became idle");
}

#[tokio::test]
async fn test_full_turn_over_http() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            sse_events(vec![
                Event::default()
                    .event("intermediate_steps")
                    .data("reading labs"),
                Event::default().event("final_answer").data("Hello there"),
                Event::default().event("done").data(""),
            ])
        }),
    );
    let endpoint = serve(app).await;
    let engine = engine_for(&endpoint, Arc::new(StaticToken::anonymous()));

    engine.send(text_input("hi"), "sess-http").unwrap();
    wait_idle(&engine).await;

    let history = engine.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::Human);
    let assistant = &history[1];
    assert_eq!(assistant.role, Role::Assistant);
    assert_eq!(assistant.content, "Hello there");
    assert_eq!(assistant.intermediate_steps, "reading labs");
    assert!(assistant.thinking_complete);
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Option<(Option<String>, serde_json::Value)>>>);

async fn capture_handler(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    *captured.0.lock().unwrap() = Some((auth, body));
    sse_events(vec![
        Event::default()
            .event("final_answer")
            .data(r#"{"content":"Hello"}"#),
        Event::default().event("done").data(""),
    ])
}

#[tokio::test]
async fn test_bearer_and_body_reach_server() {
    let captured = Captured::default();
    let app = Router::new()
        .route("/api/chat", post(capture_handler))
        .with_state(captured.clone());
    let endpoint = serve(app).await;
    let engine = engine_for(&endpoint, Arc::new(StaticToken::new("tok-123")));

    engine.send(text_input("hi"), "sess-auth").unwrap();
    wait_idle(&engine).await;

    let (auth, body) = captured.0.lock().unwrap().take().expect("request captured");
    assert_eq!(auth.as_deref(), Some("Bearer tok-123"));
    assert_eq!(body["session_id"], "sess-auth");
    assert_eq!(body["query"], "hi");
    assert_eq!(body["enable_knowledge_base_retrieval"], true);

    // JSON payloads with a `content` wrapper are unwrapped on the way in.
    assert_eq!(engine.history()[1].content, "Hello");
}

#[tokio::test]
async fn test_server_error_event() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            sse_events(vec![
                Event::default().event("final_answer").data("partial"),
                Event::default().event("error").data("backend failure"),
            ])
        }),
    );
    let endpoint = serve(app).await;
    let engine = engine_for(&endpoint, Arc::new(StaticToken::anonymous()));

    engine.send(text_input("hi"), "sess-err").unwrap();
    wait_idle(&engine).await;

    let history = engine.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, STREAM_ERROR_TEXT);
    assert!(history[1].thinking_complete);
}

#[tokio::test]
async fn test_http_error_status() {
    let app = Router::new().route("/api/chat", post(|| async { StatusCode::BAD_GATEWAY }));
    let endpoint = serve(app).await;
    let engine = engine_for(&endpoint, Arc::new(StaticToken::anonymous()));

    engine.send(text_input("hi"), "sess-500").unwrap();
    wait_idle(&engine).await;

    let history = engine.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, STREAM_ERROR_TEXT);
}

#[tokio::test]
async fn test_stop_tears_down_open_connection() {
    // One narration frame, then the stream stays open indefinitely.
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            let head = stream::iter(vec![Ok::<_, Infallible>(
                Event::default()
                    .event("intermediate_steps")
                    .data("thinking hard"),
            )]);
            Sse::new(head.chain(stream::pending()))
        }),
    );
    let endpoint = serve(app).await;
    let engine = engine_for(&endpoint, Arc::new(StaticToken::anonymous()));

    engine.send(text_input("hi"), "sess-stop").unwrap();
    for _ in 0..2000 {
        let streaming = engine
            .streaming_message()
            .map(|m| !m.intermediate_steps.is_empty())
            .unwrap_or(false);
        if streaming {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    engine.stop();

    assert!(!engine.is_loading());
    let history = engine.history();
    assert_eq!(history.len(), 2);
    assert!(history[1].content.ends_with(STOP_MARKER));
    assert_eq!(history[1].intermediate_steps, "thinking hard");

    // Nothing further may arrive after stop.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(engine.history().len(), 2);
    assert!(engine.streaming_message().is_none());
}
