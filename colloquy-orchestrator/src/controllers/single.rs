use async_trait::async_trait;

use colloquy_core::error::OrchestrationError;
use colloquy_core::state::{OrchestrationState, StateDelta, TraceEvent};

use super::{ExecutionEnv, TopologyController};

/// One step: the highest-priority active agent answers, then the turn is
/// done.
pub struct SingleController;

#[async_trait]
impl TopologyController for SingleController {
    async fn step(&self, state: &OrchestrationState, env: &ExecutionEnv) -> StateDelta {
        let Some(agent) = state.active_agents.first() else {
            return StateDelta::fatal(OrchestrationError::NoActiveAgents);
        };

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

        let mut delta = StateDelta {
            messages: vec![message],
            complete: true,
            ..Default::default()
        };
        if state.debug_enabled {
            delta
                .trace
                .push(TraceEvent::new("single", format!("executed {}", agent.id)));
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::{agent, run_to_completion, scripted_env, state};
    use colloquy_core::agent::AgentRole;
    use colloquy_core::message::MessageRole;
    use colloquy_core::model::ModelResponse;
    use colloquy_core::state::TurnMode;

    #[tokio::test]
    async fn one_agent_one_message() {
        let (_, env) = scripted_env(vec![ModelResponse::text("4")]);
        let mut state = state(
            TurnMode::Single,
            vec![agent("assistant", AgentRole::Assistant, 0)],
            "2+2?",
            1,
        );

        run_to_completion(&SingleController, &mut state, &env).await;

        // One user seed + one new assistant message.
        assert_eq!(state.messages.len(), 2);
        let answer = state.messages.last().unwrap();
        assert_eq!(answer.agent_id, "assistant");
        assert_eq!(answer.role, MessageRole::Assistant);
        assert_eq!(answer.content, "4");
    }

    #[tokio::test]
    async fn no_agents_is_a_terminal_error() {
        let (_, env) = scripted_env(vec![]);
        let mut state = state(TurnMode::Single, vec![], "2+2?", 1);

        let delta = SingleController.step(&state, &env).await;
        state.apply(delta);

        assert!(state.is_complete);
        assert!(state.error.as_deref().unwrap().contains("no active agents"));
        assert_eq!(state.messages.len(), 1); // only the user seed
    }
}
