use async_trait::async_trait;

use colloquy_core::error::OrchestrationError;
use colloquy_core::state::{OrchestrationState, StateDelta, TraceEvent};

use super::{ExecutionEnv, TopologyController};

/// One agent per step, in priority order, each executing against the
/// accumulated message list. Completes when the cursor reaches the end.
pub struct SequentialController;

#[async_trait]
impl TopologyController for SequentialController {
    async fn step(&self, state: &OrchestrationState, env: &ExecutionEnv) -> StateDelta {
        if state.active_agents.is_empty() {
            return StateDelta::fatal(OrchestrationError::NoActiveAgents);
        }

        let index = state.current_agent_index;
        if index >= state.active_agents.len() {
            return StateDelta {
                complete: true,
                ..Default::default()
            };
        }

        let agent = &state.active_agents[index];
        let message = env
            .run_agent(
                agent,
                &state.user_input,
                &state.messages,
                agent.can_see_other_agents,
                None,
                &state.tool_context,
            )
            .await;

        let next = index + 1;
        let mut delta = StateDelta {
            messages: vec![message],
            current_agent_index: Some(next),
            complete: next >= state.active_agents.len(),
            ..Default::default()
        };
        if state.debug_enabled {
            delta.trace.push(TraceEvent::new(
                "sequential",
                format!("executed {} ({next}/{})", agent.id, state.active_agents.len()),
            ));
        }
        delta
    }
}
