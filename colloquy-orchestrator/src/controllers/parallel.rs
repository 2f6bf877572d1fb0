use async_trait::async_trait;
use futures::future::join_all;

use colloquy_core::error::OrchestrationError;
use colloquy_core::state::{OrchestrationState, StateDelta, TraceEvent};

use super::{ExecutionEnv, TopologyController};

/// One step: every active agent executes concurrently against the same
/// initial history and the results append together. The relative order of
/// appended results is not guaranteed stable.
pub struct ParallelController;

#[async_trait]
impl TopologyController for ParallelController {
    async fn step(&self, state: &OrchestrationState, env: &ExecutionEnv) -> StateDelta {
        if state.active_agents.is_empty() {
            return StateDelta::fatal(OrchestrationError::NoActiveAgents);
        }

        let calls = state.active_agents.iter().map(|agent| {
            env.run_agent(
                agent,
                &state.user_input,
                &state.messages,
                agent.can_see_other_agents,
                None,
                &state.tool_context,
            )
        });
        let messages = join_all(calls).await;

        let mut delta = StateDelta {
            messages,
            complete: true,
            ..Default::default()
        };
        if state.debug_enabled {
            delta.trace.push(TraceEvent::new(
                "parallel",
                format!("fanned out to {} agents", state.active_agents.len()),
            ));
        }
        delta
    }
}
