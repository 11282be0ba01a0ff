//! Test utilities for runway-core
//!
//! A mock text-generation server speaking both the OpenAI chat completions
//! API and the Ollama generate API, for integration tests and local runs
//! without a model.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// How the mock server answers completion requests
#[derive(Debug, Clone)]
enum ReplyMode {
    /// Build a sentence from the region line of the prompt
    Derived,
    /// Always answer with this text
    Fixed(String),
    /// Answer every completion with HTTP 500
    Failing,
}

/// Mock text-generation server for testing and development
pub struct MockTextServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockTextServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        Self::spawn(ReplyMode::Derived).await
    }

    /// Start a server that always replies with `reply`
    pub async fn start_with_reply(reply: &str) -> Self {
        Self::spawn(ReplyMode::Fixed(reply.to_string())).await
    }

    /// Start a server whose completion endpoints fail with HTTP 500
    pub async fn start_failing() -> Self {
        Self::spawn(ReplyMode::Failing).await
    }

    async fn spawn(mode: ReplyMode) -> Self {
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .with_state(Arc::new(mode));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockTextServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reply_for(mode: &ReplyMode, prompt: &str) -> Option<String> {
    match mode {
        ReplyMode::Derived => Some(derived_reply(prompt)),
        ReplyMode::Fixed(text) => Some(text.clone()),
        ReplyMode::Failing => None,
    }
}

/// Mention the region the prompt names, if any
fn derived_reply(prompt: &str) -> String {
    let region = prompt
        .lines()
        .find_map(|l| l.trim().strip_prefix("Top region driver:"))
        .map(str::trim)
        .filter(|r| !r.is_empty());

    match region {
        Some(region) => format!(
            "Revenue moved month over month, led by {}. Operating expenses and margin \
             followed the revenue trend.",
            region
        ),
        None => "Results were broadly stable month over month.".to_string(),
    }
}

/// OpenAI models endpoint (health check)
async fn handle_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        object: "list".to_string(),
        data: vec![ModelEntry {
            id: "gpt-4.1-mini".to_string(),
            object: "model".to_string(),
        }],
    })
}

/// OpenAI chat completions endpoint
async fn handle_chat(
    State(mode): State<Arc<ReplyMode>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let prompt = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .unwrap_or_default();

    let content = reply_for(&mode, prompt).ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(ChatResponse {
        model: request.model,
        choices: vec![ChatChoice {
            index: 0,
            message: ChatMessage {
                role: "assistant".to_string(),
                content,
            },
        }],
    }))
}

/// Ollama tags endpoint (health check)
async fn handle_tags() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: vec![ModelInfo {
            name: "llama3.2:latest".to_string(),
            modified_at: "2024-01-01T00:00:00Z".to_string(),
            size: 4_000_000_000,
        }],
    })
}

/// Ollama generate endpoint
async fn handle_generate(
    State(mode): State<Arc<ReplyMode>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, StatusCode> {
    let response =
        reply_for(&mode, &request.prompt).ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(GenerateResponse {
        model: request.model,
        response,
        done: true,
    }))
}

// Request/Response types for the mock server

#[derive(Debug, Serialize)]
struct ModelsResponse {
    object: String,
    data: Vec<ModelEntry>,
}

#[derive(Debug, Serialize)]
struct ModelEntry {
    id: String,
    object: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Serialize)]
struct ChatChoice {
    index: u32,
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    name: String,
    modified_at: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}
