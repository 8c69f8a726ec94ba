//! Cloudinary, Gemini and Supabase clients against local mock servers.
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use snapkit::error::{AppError, GenerationError};
use snapkit::model::{ConfigPatch, GenerationConfig, Identity, SocialKitResult, Tone, UploadedAsset};
use snapkit::services::cloudinary::CloudinaryUploader;
use snapkit::services::gemini::GeminiClient;
use snapkit::services::supabase::SupabaseClient;
use snapkit::services::{AssetUploader, ContentGenerator, CredentialStore, PersistenceLayer};
use snapkit::PendingImage;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: String,
    headers: HeaderMap,
    body: Bytes,
}

impl Recorded {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).and_then(|v| v.to_str().ok()).map(String::from)
    }
}

type Responder = Arc<dyn Fn(&Recorded) -> (StatusCode, String) + Send + Sync>;

#[derive(Clone)]
struct MockServer {
    calls: Arc<Mutex<Vec<Recorded>>>,
    respond: Responder,
}

async fn record(
    State(mock): State<MockServer>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(&'static str, &'static str); 1], String) {
    let call = Recorded {
        method,
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        headers,
        body,
    };
    let (status, reply) = (mock.respond)(&call);
    mock.calls.lock().unwrap().push(call);
    (status, [("content-type", "application/json")], reply)
}

/// Serve `respond` on an ephemeral port; returns the base URL and the call log.
fn spawn_mock(
    respond: impl Fn(&Recorded) -> (StatusCode, String) + Send + Sync + 'static,
) -> (String, Arc<Mutex<Vec<Recorded>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = MockServer { calls: calls.clone(), respond: Arc::new(respond) };
    let app = Router::new().fallback(record).with_state(state);
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service())
            .await
            .unwrap();
    });
    (format!("http://{}", addr), calls)
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn photo() -> PendingImage {
    PendingImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2], None, Some("beach.jpg".into())).unwrap()
}

fn funny_config() -> GenerationConfig {
    let mut cfg = GenerationConfig::default();
    cfg.apply(ConfigPatch {
        tone: Some(Tone::Funny),
        platforms: Some(vec!["Instagram".into()]),
        include_emoji: Some(true),
        language: Some("English".into()),
    })
    .unwrap();
    cfg
}

fn candidate(text: &str) -> String {
    json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] }).to_string()
}

#[tokio::test]
async fn gemini_sends_image_and_prompt_and_parses_kit() {
    let (base, calls) = spawn_mock(|_| (StatusCode::OK, candidate(r#"{"captions":["x"]}"#)));
    let client = GeminiClient::new(base, "test-model".into(), TIMEOUT).unwrap();
    let image = photo().encode();

    let result = client.generate("key-123", &image, &funny_config()).await.unwrap();

    assert_eq!(result, SocialKitResult(json!({ "captions": ["x"] })));
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.method, Method::POST);
    assert_eq!(call.path, "/v1beta/models/test-model:generateContent");
    assert_eq!(call.header("x-goog-api-key").as_deref(), Some("key-123"));
    let body = call.json();
    let parts = &body["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[0]["inlineData"]["data"], image.data.as_str());
    assert!(parts[1]["text"].as_str().unwrap().contains("Tone of voice: funny."));
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
}

#[tokio::test]
async fn gemini_distinguishes_bad_key_from_quota_and_network() {
    let (base, _) = spawn_mock(|_| {
        (
            StatusCode::BAD_REQUEST,
            json!({ "error": { "code": 400, "message": "API key not valid.", "details": [{ "reason": "API_KEY_INVALID" }] } })
                .to_string(),
        )
    });
    let client = GeminiClient::new(base, "m".into(), TIMEOUT).unwrap();
    let err = client.generate("bad", &photo().encode(), &funny_config()).await.unwrap_err();
    assert!(matches!(err, AppError::Generation(GenerationError::InvalidCredential(_))));

    let (base, _) = spawn_mock(|_| (StatusCode::TOO_MANY_REQUESTS, r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#.into()));
    let client = GeminiClient::new(base, "m".into(), TIMEOUT).unwrap();
    let err = client.generate("k", &photo().encode(), &funny_config()).await.unwrap_err();
    assert!(matches!(err, AppError::Generation(GenerationError::QuotaExceeded(_))));

    let client = GeminiClient::new(closed_port_url(), "m".into(), TIMEOUT).unwrap();
    let err = client.generate("k", &photo().encode(), &funny_config()).await.unwrap_err();
    assert!(matches!(err, AppError::Generation(GenerationError::Transport(_))));
}

#[tokio::test]
async fn gemini_rejects_prose_reply() {
    let (base, _) = spawn_mock(|_| (StatusCode::OK, candidate("I cannot help with that.")));
    let client = GeminiClient::new(base, "m".into(), TIMEOUT).unwrap();
    let err = client.generate("k", &photo().encode(), &funny_config()).await.unwrap_err();
    assert!(matches!(err, AppError::Generation(GenerationError::MalformedResponse(_))));
}

#[tokio::test]
async fn cloudinary_uploads_multipart_with_preset() {
    let (base, calls) = spawn_mock(|_| {
        (
            StatusCode::OK,
            json!({ "secure_url": "https://res.cloudinary.com/demo/beach.jpg", "url": "http://x", "public_id": "beach" })
                .to_string(),
        )
    });
    let uploader = CloudinaryUploader::new(base, "demo".into(), "preset-x".into(), TIMEOUT).unwrap();

    let asset = uploader.upload(&photo()).await.unwrap();

    assert_eq!(
        asset,
        UploadedAsset { url: "https://res.cloudinary.com/demo/beach.jpg".into(), public_id: "beach".into() }
    );
    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].path, "/v1_1/demo/image/upload");
    assert!(calls[0].header("content-type").unwrap().starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&calls[0].body);
    assert!(body.contains("name=\"upload_preset\""));
    assert!(body.contains("preset-x"));
    assert!(body.contains("filename=\"beach.jpg\""));
}

#[tokio::test]
async fn cloudinary_failure_carries_service_message() {
    let (base, _) = spawn_mock(|_| {
        (StatusCode::BAD_REQUEST, json!({ "error": { "message": "Upload preset not found" } }).to_string())
    });
    let uploader = CloudinaryUploader::new(base, "demo".into(), "nope".into(), TIMEOUT).unwrap();
    match uploader.upload(&photo()).await {
        Err(AppError::Upload(msg)) => assert!(msg.contains("Upload preset not found")),
        other => panic!("unexpected: {:?}", other.map(|a| a.url)),
    }
}

#[tokio::test]
async fn supabase_reads_and_writes_the_profile_key() {
    let (base, calls) = spawn_mock(|call| match call.method {
        Method::GET => (StatusCode::OK, json!([{ "gemini_api_key": "stored-key" }]).to_string()),
        _ => (StatusCode::NO_CONTENT, String::new()),
    });
    let client = SupabaseClient::new(base, "anon".into(), TIMEOUT).unwrap();
    let me = Identity::new("user-1").with_access_token("tok");

    assert_eq!(client.get(&me).await.unwrap().as_deref(), Some("stored-key"));
    client.set(&me, "new-key").await.unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].path, "/rest/v1/profiles");
    assert!(calls[0].query.contains("id=eq.user-1"));
    assert_eq!(calls[0].header("apikey").as_deref(), Some("anon"));
    assert_eq!(calls[0].header("authorization").as_deref(), Some("Bearer tok"));
    assert_eq!(calls[1].method, Method::PATCH);
    assert_eq!(calls[1].json()["gemini_api_key"], "new-key");
    assert!(calls[1].json()["updated_at"].is_string());
}

#[tokio::test]
async fn supabase_treats_blank_key_as_missing() {
    let (base, _) = spawn_mock(|_| (StatusCode::OK, json!([{ "gemini_api_key": "" }]).to_string()));
    let client = SupabaseClient::new(base, "anon".into(), TIMEOUT).unwrap();
    assert_eq!(client.get(&Identity::new("user-1")).await.unwrap(), None);
}

#[tokio::test]
async fn supabase_records_image_then_generation() {
    let (base, calls) = spawn_mock(|call| match call.path.as_str() {
        "/rest/v1/images" => (StatusCode::CREATED, json!([{ "id": "img-1" }]).to_string()),
        _ => (StatusCode::CREATED, String::new()),
    });
    let client = SupabaseClient::new(base, "anon".into(), TIMEOUT).unwrap();
    let asset = UploadedAsset { url: "u".into(), public_id: "p".into() };
    let result = SocialKitResult(json!({ "captions": ["x"] }));

    client
        .record_generation(&Identity::new("user-1"), &asset, &funny_config(), &result)
        .await
        .unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].header("prefer").as_deref(), Some("return=representation"));
    assert_eq!(
        calls[0].json(),
        json!({ "user_id": "user-1", "cloudinary_url": "u", "cloudinary_public_id": "p" })
    );
    let generation = calls[1].json();
    assert_eq!(calls[1].path, "/rest/v1/generations");
    assert_eq!(generation["image_id"], "img-1");
    assert_eq!(generation["inputs"]["tone"], "funny");
    assert_eq!(generation["inputs"]["includeEmoji"], true);
    assert_eq!(generation["results"], json!({ "captions": ["x"] }));
}

#[tokio::test]
async fn supabase_generation_insert_failure_is_a_persistence_error() {
    let (base, calls) = spawn_mock(|call| match call.path.as_str() {
        "/rest/v1/images" => (StatusCode::CREATED, json!([{ "id": 7 }]).to_string()),
        _ => (StatusCode::FORBIDDEN, json!({ "message": "row-level security" }).to_string()),
    });
    let client = SupabaseClient::new(base, "anon".into(), TIMEOUT).unwrap();
    let err = client
        .record_generation(
            &Identity::new("user-1"),
            &UploadedAsset { url: "u".into(), public_id: "p".into() },
            &funny_config(),
            &SocialKitResult(json!({})),
        )
        .await
        .unwrap_err();
    match err {
        AppError::Persistence(msg) => assert!(msg.contains("row-level security")),
        other => panic!("unexpected: {:?}", other),
    }
    let calls = calls.lock().unwrap();
    assert_eq!(calls[1].json()["image_id"], 7);
}

#[tokio::test]
async fn supabase_lists_history_newest_first() {
    let (base, calls) = spawn_mock(|_| {
        (
            StatusCode::OK,
            json!([
                {
                    "id": "g2", "created_at": "2026-03-02T10:00:00.123456+00:00",
                    "inputs": { "tone": "funny" }, "results": { "captions": ["new"] },
                    "image": { "id": "i2", "cloudinary_url": "https://cdn/2.png", "cloudinary_public_id": "p2" }
                },
                {
                    "id": "g1", "created_at": "2026-03-01T10:00:00+00:00",
                    "inputs": {}, "results": { "captions": ["old"] }, "image": null
                }
            ])
            .to_string(),
        )
    });
    let client = SupabaseClient::new(base, "anon".into(), TIMEOUT).unwrap();

    let records = client.list_history(&Identity::new("user-1")).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "g2");
    assert_eq!(records[0].image_url, "https://cdn/2.png");
    assert_eq!(records[0].result, SocialKitResult(json!({ "captions": ["new"] })));
    assert_eq!(records[1].image_url, "");
    assert!(records[0].created_at > records[1].created_at);
    let query = calls.lock().unwrap()[0].query.clone();
    assert!(query.contains("order=created_at.desc"));
    assert!(query.contains("user_id=eq.user-1"));
}

#[tokio::test]
async fn supabase_deletes_by_id() {
    let (base, calls) = spawn_mock(|_| (StatusCode::NO_CONTENT, String::new()));
    let client = SupabaseClient::new(base, "anon".into(), TIMEOUT).unwrap();
    client.delete_record(&Identity::new("user-1"), "g1").await.unwrap();
    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].method, Method::DELETE);
    assert_eq!(calls[0].path, "/rest/v1/generations");
    assert_eq!(calls[0].query, "id=eq.g1");
}
