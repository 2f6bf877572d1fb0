//! `ModelClient` seam: the model-invocation capability this engine consumes
//! as a black box, plus the scripted mock used across the workspace's tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ColloquyError;
use crate::message::MessageRole;
use crate::tool::{ToolCall, ToolSpec};

/// Token usage for one or more model calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// One turn of assembled chat context sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A fully assembled completion request for one model call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model_id: String,
    pub system_prompt: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub tools: Vec<ToolSpec>,
}

/// A model completion response the execution unit works with.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    /// Text content from the assistant (if any).
    pub text: Option<String>,
    /// Tool calls requested by the assistant (if any).
    pub tool_calls: Vec<ToolCall>,
    /// Constrained-output payload, when the provider supports emitting one
    /// alongside (or instead of) free text.
    pub structured: Option<serde_json::Value>,
    pub usage: TokenUsage,
}

impl ModelResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Receives incremental text fragments from one streaming model call.
pub type TokenSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Fired once per streamed fragment as `(fragment, agent_id, agent_name)`.
/// Fragments from concurrently running agents may interleave arbitrarily;
/// consumers demultiplex by agent id.
pub type TokenCallback = Arc<dyn Fn(&str, &str, &str) + Send + Sync>;

/// Fired at the start of each consensus round with the round number.
pub type RoundCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Abstraction over model completion. Decouples the orchestration state
/// machines from any specific provider.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Perform a blocking completion call.
    async fn complete(&self, request: &CompletionRequest) -> Result<ModelResponse, ColloquyError>;

    /// Streaming completion. The default delegates to `complete` and emits
    /// the final text as a single fragment; providers with real token
    /// streams override this to emit per-fragment.
    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
        sink: TokenSink,
    ) -> Result<ModelResponse, ColloquyError> {
        let response = self.complete(request).await?;
        if let Some(text) = &response.text {
            (*sink)(text);
        }
        Ok(response)
    }
}

/// A scripted mock model client for tests: returns queued responses in
/// order and records every request it sees.
pub struct MockModelClient {
    responses: std::sync::Mutex<Vec<Result<ModelResponse, ColloquyError>>>,
    requests: std::sync::Mutex<Vec<CompletionRequest>>,
}

impl MockModelClient {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_results(results: Vec<Result<ModelResponse, ColloquyError>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(results),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Requests recorded so far, in call order.
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("request lock").clone()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<ModelResponse, ColloquyError> {
        self.requests
            .lock()
            .expect("request lock")
            .push(request.clone());

        let mut responses = self.responses.lock().expect("response lock");
        if responses.is_empty() {
            Ok(ModelResponse::text("No more scripted responses"))
        } else {
            responses.remove(0)
        }
    }
}
