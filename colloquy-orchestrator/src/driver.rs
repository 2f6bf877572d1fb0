//! Orchestration driver: selects the controller for the requested mode,
//! seeds per-call state, runs the step loop to completion, and returns the
//! genuinely new messages. The driver itself never returns an error — fatal
//! conditions surface in the outcome's `error` field.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use colloquy_agent::{AgentExecutor, BindingBuilder, DEFAULT_MAX_TOOL_ROUNDS};
use colloquy_core::agent::AgentConfig;
use colloquy_core::error::OrchestrationError;
use colloquy_core::memory::{MemoryHooks, TurnContext};
use colloquy_core::message::{AgentMessage, ConversationId, MessageRole};
use colloquy_core::model::{ModelClient, RoundCallback, TokenCallback};
use colloquy_core::state::{OrchestrationState, TraceEvent, TurnMode};
use colloquy_core::tool::{PluginCatalog, ToolContext, ToolExecutor};

use crate::controllers::{controller_for, ExecutionEnv};
use crate::selection::select_lead;

/// Safety backstop on controller steps; every controller completes in far
/// fewer for any sane input.
const MAX_STEPS: u32 = 256;

pub const DEFAULT_MAX_ROUNDS: u32 = 3;

/// Everything one orchestration call needs.
pub struct TurnRequest {
    pub conversation_id: ConversationId,
    pub user_input: String,
    pub agents: Vec<AgentConfig>,
    pub mode: TurnMode,
    pub previous_messages: Vec<AgentMessage>,
    /// Consensus round budget; clamped to at least 1.
    pub max_rounds: u32,
    pub debug: bool,
    pub user_id: Option<String>,
    pub tool_context: ToolContext,
    pub memory_hooks_enabled: bool,
    pub on_token: Option<TokenCallback>,
    pub on_round: Option<RoundCallback>,
}

impl TurnRequest {
    pub fn new(
        conversation_id: ConversationId,
        user_input: impl Into<String>,
        agents: Vec<AgentConfig>,
        mode: TurnMode,
    ) -> Self {
        Self {
            conversation_id,
            user_input: user_input.into(),
            agents,
            mode,
            previous_messages: Vec::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            debug: false,
            user_id: None,
            tool_context: ToolContext::default(),
            memory_hooks_enabled: false,
            on_token: None,
            on_round: None,
        }
    }
}

/// Result of one orchestration call.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Only messages produced by this call, in production order.
    pub messages: Vec<AgentMessage>,
    pub mode: TurnMode,
    pub debug: Option<Vec<TraceEvent>>,
    pub error: Option<String>,
}

/// The orchestration engine entry point. Holds the external capabilities
/// and dispatches each turn to the controller for its mode.
pub struct Orchestrator {
    model: Arc<dyn ModelClient>,
    bindings: BindingBuilder,
    memory: Option<Arc<dyn MemoryHooks>>,
    max_tool_rounds: u32,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model,
            bindings: BindingBuilder::new(),
            memory: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_tools(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.bindings = self.bindings.with_executor(executor);
        self
    }

    pub fn with_plugins(mut self, catalog: Arc<dyn PluginCatalog>) -> Self {
        self.bindings = self.bindings.with_plugins(catalog);
        self
    }

    pub fn with_memory_hooks(mut self, hooks: Arc<dyn MemoryHooks>) -> Self {
        self.memory = Some(hooks);
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    /// Apply engine limits from a loaded config.
    pub fn with_config(self, config: &crate::config::OrchestratorConfig) -> Self {
        self.with_max_tool_rounds(config.max_tool_rounds)
    }

    /// Run one turn. Never fails at the interface: fatal conditions come
    /// back as `error` with an empty message list.
    pub async fn run_turn(&self, request: TurnRequest) -> TurnOutcome {
        let TurnRequest {
            conversation_id,
            user_input,
            agents,
            mode,
            previous_messages,
            max_rounds,
            debug,
            user_id,
            tool_context,
            memory_hooks_enabled,
            on_token,
            on_round,
        } = request;

        // Priority order decided once: it governs sequential order and
        // coordinator/synthesizer tie-breaks.
        let mut agents: Vec<AgentConfig> = agents.into_iter().filter(|a| a.is_active).collect();
        agents.sort_by(|a, b| b.priority.cmp(&a.priority));

        if agents.is_empty() {
            tracing::warn!(conversation_id = %conversation_id, "turn requested with no active agents");
            return TurnOutcome {
                messages: Vec::new(),
                mode,
                debug: debug.then(Vec::new),
                error: Some(OrchestrationError::NoActiveAgents.to_string()),
            };
        }

        tracing::info!(
            conversation_id = %conversation_id,
            mode = %mode,
            agents = agents.len(),
            "turn starting"
        );

        let turn_context = self
            .apply_memory_pre_hook(
                memory_hooks_enabled,
                &user_id,
                conversation_id,
                &user_input,
                &mut agents,
            )
            .await;

        let mut state = OrchestrationState::new(
            conversation_id,
            user_input,
            mode,
            agents,
            previous_messages.clone(),
            max_rounds,
            tool_context,
        );
        state.debug_enabled = debug;
        state.user_id = user_id;

        let env = ExecutionEnv {
            executor: AgentExecutor::new(self.model.clone(), self.bindings.clone())
                .with_max_tool_rounds(self.max_tool_rounds),
            on_token,
            on_round,
        };
        let controller = controller_for(mode);

        let mut steps = 0u32;
        while !state.is_complete {
            steps += 1;
            if steps > MAX_STEPS {
                state.error = Some(format!("controller exceeded {MAX_STEPS} steps"));
                break;
            }
            let delta = controller.step(&state, &env).await;
            state.apply(delta);
        }

        let debug_trace = debug.then(|| state.trace.clone());

        if let Some(error) = state.error {
            tracing::error!(conversation_id = %conversation_id, error = %error, "turn failed");
            return TurnOutcome {
                messages: Vec::new(),
                mode,
                debug: debug_trace,
                error: Some(error),
            };
        }

        // Only genuinely new messages go back to the caller.
        let seen: HashSet<(String, DateTime<Utc>)> = previous_messages
            .iter()
            .map(|m| (m.agent_id.clone(), m.timestamp))
            .collect();
        let messages: Vec<AgentMessage> = state
            .messages
            .into_iter()
            .filter(|m| !seen.contains(&(m.agent_id.clone(), m.timestamp)))
            .collect();

        self.apply_memory_post_hook(&turn_context, &messages).await;

        tracing::info!(
            conversation_id = %conversation_id,
            produced = messages.len(),
            "turn complete"
        );

        TurnOutcome {
            messages,
            mode,
            debug: debug_trace,
            error: None,
        }
    }

    /// Pre-turn memory hook: when memories exist, the lead agent's effective
    /// prompt is replaced for this call only. Returns the turn context the
    /// post-hook will reuse.
    async fn apply_memory_pre_hook(
        &self,
        enabled: bool,
        user_id: &Option<String>,
        conversation_id: ConversationId,
        user_input: &str,
        agents: &mut [AgentConfig],
    ) -> Option<TurnContext> {
        if !enabled {
            return None;
        }
        let (hooks, user_id) = match (&self.memory, user_id) {
            (Some(hooks), Some(user_id)) => (hooks, user_id.clone()),
            _ => return None,
        };

        let lead_id = select_lead(agents, None)?.id.clone();
        let lead = agents.iter_mut().find(|a| a.id == lead_id)?;

        let context = TurnContext {
            user_id,
            conversation_id,
            input: user_input.to_string(),
            system_prompt: lead.system_prompt.clone(),
        };

        match hooks.before_turn(&context).await {
            Ok(injection) if injection.memories_found => {
                tracing::debug!(agent_id = %lead.id, "memory hook augmented the lead prompt");
                *lead = lead.with_system_prompt(injection.system_prompt);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "memory pre-hook failed; continuing without it");
            }
        }

        Some(context)
    }

    /// Post-turn memory hook: fact capture over the last assistant message.
    /// Failures are logged and swallowed.
    async fn apply_memory_post_hook(
        &self,
        turn_context: &Option<TurnContext>,
        messages: &[AgentMessage],
    ) {
        let (Some(hooks), Some(context)) = (&self.memory, turn_context) else {
            return;
        };
        let Some(last) = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant && !m.is_error())
        else {
            return;
        };

        let tokens_used: u32 = messages
            .iter()
            .filter_map(|m| m.metadata.token_usage.map(|u| u.total_tokens))
            .sum();

        if let Err(e) = hooks
            .after_turn(context, &last.content, Some(tokens_used))
            .await
        {
            tracing::warn!(error = %e, "memory post-hook failed; ignoring");
        }
    }
}
