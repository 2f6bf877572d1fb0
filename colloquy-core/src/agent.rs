use serde::{Deserialize, Serialize};

use crate::tool::ToolKind;

pub type AgentId = String;

/// Agent id used on error-marked messages when the failure cannot be
/// attributed to a resolvable active agent.
pub const UNKNOWN_AGENT_ID: &str = "unknown";

/// Role an agent plays in a turn. `Coordinator` is preferentially selected
/// to delegate, route, and synthesize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Assistant,
    Coder,
    Analyst,
    Writer,
    Researcher,
    Coordinator,
    Reviewer,
    Custom,
}

impl Default for AgentRole {
    fn default() -> Self {
        Self::Assistant
    }
}

/// Configuration for a single agent participating in a turn. Immutable for
/// the duration of a call; per-call prompt overrides go through cloned
/// configs or the executor's context override, never through mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: AgentId,
    pub name: String,
    #[serde(default)]
    pub role: AgentRole,
    pub provider: String,
    pub model_id: String,
    pub system_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub tools: Vec<ToolKind>,
    /// When false, this agent never sees other agents' assistant messages.
    #[serde(default = "default_true")]
    pub can_see_other_agents: bool,
    /// Higher runs first and wins coordinator/synthesizer tie-breaks.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

impl AgentConfig {
    /// Clone with a different effective system prompt for one call.
    pub fn with_system_prompt(&self, prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: prompt.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_entry_deserializes_with_defaults() {
        let toml = r#"
            id = "analyst"
            name = "Analyst"
            provider = "anthropic"
            model_id = "claude-sonnet-4"
            system_prompt = "You analyze data."
        "#;
        let config: AgentConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.role, AgentRole::Assistant);
        assert!(config.can_see_other_agents);
        assert!(config.is_active);
        assert_eq!(config.priority, 0);
        assert!(config.tools.is_empty());
    }

    #[test]
    fn prompt_override_does_not_touch_the_original() {
        let config: AgentConfig = toml::from_str(
            r#"
            id = "lead"
            name = "Lead"
            role = "coordinator"
            provider = "openai"
            model_id = "gpt-4o"
            system_prompt = "You coordinate."
        "#,
        )
        .unwrap();

        let overridden = config.with_system_prompt("Synthesize the answers.");
        assert_eq!(overridden.system_prompt, "Synthesize the answers.");
        assert_eq!(config.system_prompt, "You coordinate.");
        assert_eq!(overridden.id, config.id);
    }
}
