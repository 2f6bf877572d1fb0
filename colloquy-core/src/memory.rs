use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ColloquyError;
use crate::message::ConversationId;

/// Context handed to both memory hooks for one turn.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub user_id: String,
    pub conversation_id: ConversationId,
    pub input: String,
    /// The lead agent's system prompt as configured for this call.
    pub system_prompt: String,
}

/// Result of the pre-turn hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryInjection {
    /// The effective system prompt for the lead agent this call. Equal to
    /// the input prompt when nothing was remembered.
    pub system_prompt: String,
    pub memories_found: bool,
}

/// Result of the post-turn hook.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaptureReport {
    pub captured: bool,
    #[serde(default)]
    pub facts: Vec<String>,
}

/// Optional pre/post turn hooks injecting remembered context and capturing
/// new facts. The driver treats every failure here as log-and-continue.
#[async_trait]
pub trait MemoryHooks: Send + Sync {
    /// Called before the turn with the lead agent's prompt.
    async fn before_turn(&self, ctx: &TurnContext) -> Result<MemoryInjection, ColloquyError>;

    /// Called after the turn with the final assistant output and the turn's
    /// summed token usage, if known.
    async fn after_turn(
        &self,
        ctx: &TurnContext,
        output: &str,
        tokens_used: Option<u32>,
    ) -> Result<CaptureReport, ColloquyError>;
}
