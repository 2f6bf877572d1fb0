use crate::agent::AgentId;

#[derive(Debug, thiserror::Error)]
pub enum ColloquyError {
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent {agent_id} execution failed: {reason}")]
    ExecutionFailed { agent_id: AgentId, reason: String },

    #[error("tool-call budget exhausted for agent {agent_id} after {rounds} rounds")]
    ToolBudgetExhausted { agent_id: AgentId, rounds: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("provider {provider} call failed: {reason}")]
    CallFailed { provider: String, reason: String },

    #[error("invalid model response: {reason}")]
    InvalidResponse { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("tool not found: {tool_id}")]
    NotFound { tool_id: String },

    #[error("tool {tool_id} execution failed: {message}")]
    ExecutionFailed { tool_id: String, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("no active agents configured")]
    NoActiveAgents,

    #[error("no coordinator resolvable for {mode} mode")]
    NoCoordinator { mode: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("memory hook failed: {reason}")]
    MemoryHook { reason: String },
}
