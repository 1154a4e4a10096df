// Integration tests for the relay endpoint
//
// A mock speech service is bound to an ephemeral port and the relay router
// is served on another; requests go through a real HTTP client. Every test
// touches the credential environment variable, so they serialize on a lock.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde_json::Value;

use vaani::http::API_KEY_ENV;
use vaani::{create_router, AppState, GroqClient};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

#[derive(Clone)]
struct MockUpstream {
    hits: Arc<AtomicUsize>,
    status: StatusCode,
    body: &'static str,
}

async fn upstream_handler(State(mock): State<MockUpstream>) -> impl IntoResponse {
    mock.hits.fetch_add(1, Ordering::SeqCst);
    (
        mock.status,
        [(header::CONTENT_TYPE, "application/json")],
        mock.body,
    )
}

async fn spawn_upstream(status: StatusCode, body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let mock = MockUpstream {
        hits: Arc::clone(&hits),
        status,
        body,
    };

    let app = Router::new()
        .route("/v1/audio/translations", post(upstream_handler))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, hits)
}

async fn spawn_relay(upstream_addr: SocketAddr) -> SocketAddr {
    let groq = GroqClient::new(
        format!("http://{}/v1/audio/translations", upstream_addr),
        "whisper-large-v3",
    );
    let app = create_router(AppState::new(groq));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

fn audio_form(field_name: &'static str) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(vec![0u8; 64])
        .file_name("recording.wav")
        .mime_str("audio/wav")
        .unwrap();

    reqwest::multipart::Form::new().part(field_name, part)
}

async fn post_translate(
    relay_addr: SocketAddr,
    form: reqwest::multipart::Form,
) -> (StatusCode, String) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/translate", relay_addr))
        .multipart(form)
        .send()
        .await
        .unwrap();

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    let body = response.text().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn missing_credential_is_rejected_without_an_upstream_call() {
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
    std::env::remove_var(API_KEY_ENV);

    let (upstream_addr, hits) = spawn_upstream(StatusCode::OK, r#"{"text":"hola"}"#).await;
    let relay_addr = spawn_relay(upstream_addr).await;

    let (status, body) = post_translate(relay_addr, audio_form("audio")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["error"], "API key not configured");
    assert_eq!(hits.load(Ordering::SeqCst), 0, "no outbound call expected");
}

#[tokio::test]
async fn successful_upstream_body_is_relayed_verbatim() {
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
    std::env::set_var(API_KEY_ENV, "test-key");

    let (upstream_addr, hits) =
        spawn_upstream(StatusCode::OK, r#"{"text":"hola","x_groq":{"id":"req_1"}}"#).await;
    let relay_addr = spawn_relay(upstream_addr).await;

    let (status, body) = post_translate(relay_addr, audio_form("audio")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"text":"hola","x_groq":{"id":"req_1"}}"#);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upstream_error_message_is_extracted() {
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
    std::env::set_var(API_KEY_ENV, "test-key");

    let (upstream_addr, _hits) = spawn_upstream(
        StatusCode::BAD_REQUEST,
        r#"{"error":{"message":"bad file"}}"#,
    )
    .await;
    let relay_addr = spawn_relay(upstream_addr).await;

    let (status, body) = post_translate(relay_addr, audio_form("audio")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["error"], "bad file");
}

#[tokio::test]
async fn upstream_error_without_detail_falls_back_to_generic_message() {
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
    std::env::set_var(API_KEY_ENV, "test-key");

    let (upstream_addr, _hits) =
        spawn_upstream(StatusCode::INTERNAL_SERVER_ERROR, "upstream blew up").await;
    let relay_addr = spawn_relay(upstream_addr).await;

    let (status, body) = post_translate(relay_addr, audio_form("audio")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["error"], "Translation failed");
}

#[tokio::test]
async fn missing_audio_field_is_rejected_without_an_upstream_call() {
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
    std::env::set_var(API_KEY_ENV, "test-key");

    let (upstream_addr, hits) = spawn_upstream(StatusCode::OK, r#"{"text":"hola"}"#).await;
    let relay_addr = spawn_relay(upstream_addr).await;

    let (status, body) = post_translate(relay_addr, audio_form("file")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let parsed: Value = serde_json::from_str(&body).unwrap();
    let message = parsed["error"].as_str().unwrap();
    assert!(message.contains("audio"), "got: {}", message);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn health_check_responds_ok() {
    let (upstream_addr, _hits) = spawn_upstream(StatusCode::OK, "{}").await;
    let relay_addr = spawn_relay(upstream_addr).await;

    let response = reqwest::get(format!("http://{}/health", relay_addr))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}
