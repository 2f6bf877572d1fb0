//! Per-call orchestration state and the delta type topology controllers
//! return. State lives only for one call and is owned by that call's
//! controller loop; it is never persisted or shared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::{AgentConfig, AgentId};
use crate::message::{AgentMessage, ConversationId};
use crate::tool::ToolContext;

/// Topology governing how active agents are sequenced and combined.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    Single,
    Sequential,
    Parallel,
    Hierarchical,
    Consensus,
    Auto,
}

impl Default for TurnMode {
    fn default() -> Self {
        Self::Single
    }
}

impl TurnMode {
    /// Parse a wire-format mode string. Unrecognized modes fall back to
    /// `Single` so malformed callers still get a usable turn.
    pub fn parse(mode: &str) -> Self {
        match mode.trim().to_ascii_lowercase().as_str() {
            "sequential" => Self::Sequential,
            "parallel" => Self::Parallel,
            "hierarchical" => Self::Hierarchical,
            "consensus" => Self::Consensus,
            "auto" | "auto_router" | "router" => Self::Auto,
            _ => Self::Single,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Hierarchical => "hierarchical",
            Self::Consensus => "consensus",
            Self::Auto => "auto",
        }
    }
}

impl std::fmt::Display for TurnMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One task a coordinator delegated to a specialist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Delegation {
    pub agent_id: AgentId,
    pub task: String,
}

/// A router agent's decision: which agents run, and how.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutePlan {
    pub agent_ids: Vec<AgentId>,
    pub mode: TurnMode,
}

/// One entry in the per-turn debug journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub timestamp: DateTime<Utc>,
    pub stage: String,
    pub detail: String,
}

impl TraceEvent {
    pub fn new(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            stage: stage.into(),
            detail: detail.into(),
        }
    }
}

/// Transient state for one orchestration call.
#[derive(Clone)]
pub struct OrchestrationState {
    pub conversation_id: ConversationId,
    pub user_input: String,
    pub mode: TurnMode,
    /// Active agents in descending-priority order.
    pub active_agents: Vec<AgentConfig>,
    /// Accumulated messages: seeded with the caller's previous messages,
    /// append-only afterwards.
    pub messages: Vec<AgentMessage>,
    /// Sequential cursor over `active_agents`.
    pub current_agent_index: usize,
    pub round: u32,
    pub max_rounds: u32,
    pub delegations: Vec<Delegation>,
    /// Cursor over `delegations` during hierarchical execution.
    pub delegation_cursor: usize,
    pub route_plan: Option<RoutePlan>,
    pub is_complete: bool,
    pub error: Option<String>,
    pub trace: Vec<TraceEvent>,
    pub debug_enabled: bool,
    pub user_id: Option<String>,
    pub tool_context: ToolContext,
}

impl OrchestrationState {
    pub fn new(
        conversation_id: ConversationId,
        user_input: impl Into<String>,
        mode: TurnMode,
        active_agents: Vec<AgentConfig>,
        previous_messages: Vec<AgentMessage>,
        max_rounds: u32,
        tool_context: ToolContext,
    ) -> Self {
        Self {
            conversation_id,
            user_input: user_input.into(),
            mode,
            active_agents,
            messages: previous_messages,
            current_agent_index: 0,
            round: 0,
            max_rounds: max_rounds.max(1),
            delegations: Vec::new(),
            delegation_cursor: 0,
            route_plan: None,
            is_complete: false,
            error: None,
            trace: Vec::new(),
            debug_enabled: false,
            user_id: None,
            tool_context,
        }
    }

    /// Merge a controller step's delta: list fields concatenate, scalars
    /// replace when present.
    pub fn apply(&mut self, delta: StateDelta) {
        self.messages.extend(delta.messages);
        self.trace.extend(delta.trace);
        if let Some(index) = delta.current_agent_index {
            self.current_agent_index = index;
        }
        if let Some(round) = delta.round {
            self.round = round;
        }
        if let Some(delegations) = delta.delegations {
            self.delegations = delegations;
        }
        if let Some(cursor) = delta.delegation_cursor {
            self.delegation_cursor = cursor;
        }
        if let Some(plan) = delta.route_plan {
            self.route_plan = Some(plan);
        }
        if delta.error.is_some() {
            self.error = delta.error;
        }
        self.is_complete = delta.complete;
    }
}

/// Partial state produced by one controller step. Pure data; the driver
/// loop owns the merge.
#[derive(Debug, Default)]
pub struct StateDelta {
    pub messages: Vec<AgentMessage>,
    pub current_agent_index: Option<usize>,
    pub round: Option<u32>,
    pub delegations: Option<Vec<Delegation>>,
    pub delegation_cursor: Option<usize>,
    pub route_plan: Option<RoutePlan>,
    pub complete: bool,
    pub error: Option<String>,
    pub trace: Vec<TraceEvent>,
}

impl StateDelta {
    /// A terminal delta carrying a fatal error.
    pub fn fatal(error: impl std::fmt::Display) -> Self {
        Self {
            complete: true,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}
