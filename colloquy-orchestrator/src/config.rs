//! Engine configuration: agent roster and limits, loaded from TOML.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use colloquy_core::agent::AgentConfig;
use colloquy_core::error::{ColloquyError, OrchestrationError};

use crate::driver::DEFAULT_MAX_ROUNDS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

fn default_max_tool_rounds() -> u32 {
    colloquy_agent::DEFAULT_MAX_TOOL_ROUNDS
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            max_tool_rounds: default_max_tool_rounds(),
            agents: Vec::new(),
        }
    }
}

/// Load and deserialize config from a TOML file.
pub fn load_config(path: &Path) -> Result<OrchestratorConfig, ColloquyError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        OrchestrationError::Config(format!("reading {}: {e}", path.display()))
    })?;
    from_toml_str(&content)
}

pub fn from_toml_str(content: &str) -> Result<OrchestratorConfig, ColloquyError> {
    let config: OrchestratorConfig = toml::from_str(content)
        .map_err(|e| OrchestrationError::Config(format!("parsing config: {e}")))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate config for internal consistency: non-empty ids, no duplicate
/// ids, sane limits.
pub fn validate_config(config: &OrchestratorConfig) -> Result<(), ColloquyError> {
    if config.max_rounds == 0 {
        return Err(OrchestrationError::Config("max_rounds must be at least 1".into()).into());
    }
    if config.max_tool_rounds == 0 {
        return Err(
            OrchestrationError::Config("max_tool_rounds must be at least 1".into()).into(),
        );
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for agent in &config.agents {
        if agent.id.trim().is_empty() {
            return Err(OrchestrationError::Config(format!(
                "agent '{}' has an empty id",
                agent.name
            ))
            .into());
        }
        if !seen.insert(agent.id.as_str()) {
            return Err(OrchestrationError::Config(format!(
                "duplicate agent id '{}'",
                agent.id
            ))
            .into());
        }
    }

    tracing::debug!(agents = config.agents.len(), "config validation passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        max_rounds = 2

        [[agents]]
        id = "lead"
        name = "Lead"
        role = "coordinator"
        provider = "anthropic"
        model_id = "claude-sonnet-4"
        system_prompt = "You coordinate the team."
        priority = 100

        [[agents]]
        id = "coder"
        name = "Coder"
        role = "coder"
        provider = "openai"
        model_id = "gpt-4o"
        system_prompt = "You write code."
        tools = ["web_search", "shell"]
        priority = 50
    "#;

    #[test]
    fn sample_config_parses_and_validates() {
        let config = from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.max_rounds, 2);
        assert_eq!(config.max_tool_rounds, colloquy_agent::DEFAULT_MAX_TOOL_ROUNDS);
        assert_eq!(config.agents.len(), 2);
        assert_eq!(config.agents[1].tools.len(), 2);
    }

    #[test]
    fn duplicate_agent_ids_are_rejected() {
        let doubled = format!(
            "{SAMPLE}\n[[agents]]\nid = \"coder\"\nname = \"Coder Again\"\nprovider = \"openai\"\nmodel_id = \"gpt-4o\"\nsystem_prompt = \"dup\"\n"
        );
        let err = from_toml_str(&doubled).unwrap_err();
        assert!(err.to_string().contains("duplicate agent id 'coder'"));
    }

    #[test]
    fn zero_round_budget_is_rejected() {
        let err = from_toml_str("max_rounds = 0").unwrap_err();
        assert!(err.to_string().contains("max_rounds"));
    }
}
