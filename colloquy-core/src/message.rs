use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::{AgentConfig, AgentId, UNKNOWN_AGENT_ID};
use crate::model::TokenUsage;

pub type ConversationId = uuid::Uuid;

/// Role of a message within a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Metadata attached to an agent-produced message.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub token_usage: Option<TokenUsage>,
    /// Ids of tools the agent invoked while producing this message.
    #[serde(default)]
    pub tools_used: Vec<String>,
    /// Constrained-output payload when the provider returned one alongside
    /// the text. Checked before free-text brace scanning for decisions.
    #[serde(default)]
    pub structured: Option<serde_json::Value>,
    /// Error marker. A message carrying this failed terminally; it is still
    /// surfaced so partial failures in multi-agent turns remain legible.
    #[serde(default)]
    pub error: Option<String>,
}

/// A message produced during one orchestration turn. Immutable once created;
/// identity for cross-turn dedup is `(agent_id, timestamp)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: MessageMetadata,
}

impl AgentMessage {
    pub fn assistant(agent: &AgentConfig, content: impl Into<String>) -> Self {
        Self {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: MessageMetadata {
                provider: Some(agent.provider.clone()),
                model: Some(agent.model_id.clone()),
                ..Default::default()
            },
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            agent_id: "user".into(),
            agent_name: "User".into(),
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: MessageMetadata::default(),
        }
    }

    /// Terminal error message attributed to a known agent.
    pub fn error(agent: &AgentConfig, error: impl std::fmt::Display) -> Self {
        let reason = error.to_string();
        Self {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            role: MessageRole::Assistant,
            content: format!("Agent '{}' failed: {reason}", agent.name),
            timestamp: Utc::now(),
            metadata: MessageMetadata {
                provider: Some(agent.provider.clone()),
                model: Some(agent.model_id.clone()),
                error: Some(reason),
                ..Default::default()
            },
        }
    }

    /// Terminal error message for a failure with no resolvable agent behind
    /// it, attributed to the `"unknown"` sentinel id.
    pub fn error_unattributed(name: impl Into<String>, error: impl std::fmt::Display) -> Self {
        let reason = error.to_string();
        Self {
            agent_id: UNKNOWN_AGENT_ID.into(),
            agent_name: name.into(),
            role: MessageRole::Assistant,
            content: reason.clone(),
            timestamp: Utc::now(),
            metadata: MessageMetadata {
                error: Some(reason),
                ..Default::default()
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.metadata.error.is_some()
    }

    /// Dedup identity: a message is "the same" across calls when both the
    /// author and the creation instant match.
    pub fn identity(&self) -> (&str, DateTime<Utc>) {
        (self.agent_id.as_str(), self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentRole;

    fn agent() -> AgentConfig {
        AgentConfig {
            id: "assistant".into(),
            name: "Assistant".into(),
            role: AgentRole::Assistant,
            provider: "anthropic".into(),
            model_id: "claude-sonnet-4".into(),
            system_prompt: "You are helpful.".into(),
            temperature: 0.7,
            max_tokens: None,
            tools: vec![],
            can_see_other_agents: true,
            priority: 0,
            is_active: true,
        }
    }

    #[test]
    fn assistant_message_carries_provider_metadata() {
        let msg = AgentMessage::assistant(&agent(), "4");
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.metadata.provider.as_deref(), Some("anthropic"));
        assert_eq!(msg.metadata.model.as_deref(), Some("claude-sonnet-4"));
        assert!(!msg.is_error());
    }

    #[test]
    fn error_message_is_marked_but_visible() {
        let msg = AgentMessage::error(&agent(), "model timed out");
        assert!(msg.is_error());
        assert_eq!(msg.agent_id, "assistant");
        assert!(msg.content.contains("model timed out"));
    }

    #[test]
    fn unattributed_error_uses_the_sentinel_id() {
        let msg = AgentMessage::error_unattributed("ghost", "no such agent");
        assert_eq!(msg.agent_id, UNKNOWN_AGENT_ID);
        assert!(msg.is_error());
    }
}
