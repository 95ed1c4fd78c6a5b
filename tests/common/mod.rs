// Shared fixtures: mock image host, mock Gemini API and a running app.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use jsonwebtoken::{EncodingKey, Header, encode};
use profile_picture_rmcp::{
    AppContext,
    auth::{IdTokenClaims, IdTokenVerifier},
    gemini::{GEMINI_MODEL, GeminiClient},
    routes,
    storage::{DocumentStore, LocalDocumentStore, LocalObjectStore, ObjectStore, UrlSigner},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const AUTH_SECRET: &str = "test-auth-secret";
pub const SIGNING_KEY: &str = "test-signing-key";
pub const API_KEY: &str = "test-gemini-key";
pub const SOURCE_PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];
pub const GENERATED_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 9, 8, 7, 6];

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn mint_token(uid: &str) -> String {
    let claims = IdTokenClaims {
        sub: uid.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
        iat: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(AUTH_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Serves fixed images and counts every request.
pub struct MockImageHost {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl MockImageHost {
    pub async fn start() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/{name}", get(serve_image))
            .with_state(hits.clone());
        Self {
            base_url: spawn(router).await,
            hits,
        }
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}/{name}", self.base_url)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn serve_image(State(hits): State<Arc<AtomicUsize>>, Path(name): Path<String>) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    let with_type = |content_type: &'static str| {
        ([(CONTENT_TYPE, content_type)], SOURCE_PNG.to_vec()).into_response()
    };
    match name.as_str() {
        "photo.png" => with_type("image/png"),
        "photo.jpg" => with_type("image/jpg"),
        "photo-upper.webp" => with_type("IMAGE/WEBP"),
        "anim.gif" => with_type("image/gif"),
        "untyped" => Response::new(Body::from(SOURCE_PNG.to_vec())),
        "mangled-type" => {
            let mut response = Response::new(Body::from(SOURCE_PNG.to_vec()));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_bytes(b"image/p\xffng").unwrap());
            response
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Clone, Copy, Debug)]
pub enum GeminiMode {
    Image,
    NoCandidates,
    NoImageParts,
    ServerError,
}

#[derive(Clone)]
struct GeminiState {
    mode: Arc<Mutex<GeminiMode>>,
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

/// Stand-in for `generateContent` that records each call.
pub struct MockGemini {
    pub base_url: String,
    state: GeminiState,
}

impl MockGemini {
    pub async fn start(mode: GeminiMode) -> Self {
        let state = GeminiState {
            mode: Arc::new(Mutex::new(mode)),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let router = Router::new()
            .route("/v1beta/models/{call}", post(generate_content))
            .with_state(state.clone());
        Self {
            base_url: spawn(router).await,
            state,
        }
    }

    pub fn set_mode(&self, mode: GeminiMode) {
        *self.state.mode.lock().unwrap() = mode;
    }

    pub fn hits(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    /// `(x-goog-api-key, body)` of each call.
    pub fn requests(&self) -> Vec<(Option<String>, Value)> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn generate_content(
    State(state): State<GeminiState>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if call != format!("{GEMINI_MODEL}:generateContent") {
        return StatusCode::NOT_FOUND.into_response();
    }
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push((api_key, body));

    let mode = *state.mode.lock().unwrap();
    match mode {
        GeminiMode::Image => Json(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here is your portrait"},
                    {"inlineData": {
                        "mimeType": "image/png",
                        "data": base64::engine::general_purpose::STANDARD.encode(GENERATED_JPEG),
                    }},
                ]},
                "finishReason": "STOP",
            }]
        }))
        .into_response(),
        GeminiMode::NoCandidates => Json(json!({"candidates": []})).into_response(),
        GeminiMode::NoImageParts => Json(json!({
            "candidates": [{"content": {"parts": [{"text": "I can't do that"}]}}]
        }))
        .into_response(),
        GeminiMode::ServerError => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
        }
    }
}

/// The app under test, served on its own port with stores in a temp dir.
pub struct TestApp {
    pub base_url: String,
    pub ctx: Arc<AppContext>,
    pub images: MockImageHost,
    pub gemini: MockGemini,
    pub data_dir: tempfile::TempDir,
}

pub struct TestAppOptions {
    pub gemini_mode: GeminiMode,
    pub api_key: Option<String>,
    pub documents: Option<Arc<dyn DocumentStore>>,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            gemini_mode: GeminiMode::Image,
            api_key: Some(API_KEY.to_string()),
            documents: None,
        }
    }
}

impl TestApp {
    pub async fn start() -> Self {
        Self::start_with(TestAppOptions::default()).await
    }

    pub async fn start_with(options: TestAppOptions) -> Self {
        let images = MockImageHost::start().await;
        let gemini = MockGemini::start(options.gemini_mode).await;
        let data_dir = tempfile::tempdir().unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let http = reqwest::Client::new();
        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(
            data_dir.path().to_path_buf(),
            base_url.clone(),
            UrlSigner::new(SIGNING_KEY).unwrap(),
        ));
        let documents = options
            .documents
            .unwrap_or_else(|| Arc::new(LocalDocumentStore::new(data_dir.path().to_path_buf())));
        let ctx = Arc::new(AppContext {
            gemini: GeminiClient::new(http.clone(), gemini.base_url.clone()),
            http,
            gemini_api_key: options.api_key,
            verifier: IdTokenVerifier::new(AUTH_SECRET),
            objects,
            documents,
        });

        let router = routes::router(ctx.clone(), "/mcp");
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url,
            ctx,
            images,
            gemini,
            data_dir,
        }
    }

    /// Invokes the callable endpoint and returns `(status, body)`.
    pub async fn call(&self, token: Option<&str>, data: Value) -> (StatusCode, Value) {
        let mut request = reqwest::Client::new()
            .post(format!("{}/generateProfilePicture", self.base_url))
            .json(&json!({ "data": data }));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }

    pub fn stored_file_count(&self) -> usize {
        fn count(dir: &std::path::Path) -> usize {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return 0;
            };
            entries
                .flatten()
                .map(|entry| {
                    let path = entry.path();
                    if path.is_dir() { count(&path) } else { 1 }
                })
                .sum()
        }
        count(self.data_dir.path())
    }
}
