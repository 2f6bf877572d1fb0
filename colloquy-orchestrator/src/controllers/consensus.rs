use async_trait::async_trait;

use colloquy_core::error::OrchestrationError;
use colloquy_core::message::AgentMessage;
use colloquy_core::state::{OrchestrationState, StateDelta, TraceEvent};

use super::{ExecutionEnv, TopologyController};
use crate::prompts;
use crate::selection::select_lead;

/// Bounded multi-round consensus. One round per step: round 0 answers the
/// original input in isolation, discussion rounds re-answer with every
/// agent's prior-round positions visible, and the final round additionally
/// invokes the designated synthesizer over the full discussion. The round
/// counter increments every step and reaches exactly `max_rounds`.
pub struct ConsensusController;

#[async_trait]
impl TopologyController for ConsensusController {
    async fn step(&self, state: &OrchestrationState, env: &ExecutionEnv) -> StateDelta {
        if state.active_agents.is_empty() {
            return StateDelta::fatal(OrchestrationError::NoActiveAgents);
        }

        let round = state.round;
        let agent_count = state.active_agents.len();
        let is_final = round + 1 >= state.max_rounds;

        if let Some(on_round) = &env.on_round {
            (**on_round)(round);
        }
        tracing::debug!(round, max_rounds = state.max_rounds, "consensus round starting");

        let mut messages: Vec<AgentMessage> = Vec::with_capacity(agent_count + 1);

        if round == 0 {
            // Independent positions: nobody sees anybody.
            for agent in &state.active_agents {
                let message = env
                    .run_agent(
                        agent,
                        &state.user_input,
                        &state.messages,
                        false,
                        None,
                        &state.tool_context,
                    )
                    .await;
                messages.push(message);
            }
        } else {
            // Discussion: every agent re-answers with the prior round's
            // positions shown, visibility forced on.
            let prior_round: Vec<(String, String)> = state
                .messages
                .iter()
                .rev()
                .take(agent_count)
                .rev()
                .map(|m| (m.agent_name.clone(), m.content.clone()))
                .collect();
            let input = prompts::discussion_input(&state.user_input, &prior_round);

            for agent in &state.active_agents {
                let message = env
                    .run_agent(agent, &input, &state.messages, true, None, &state.tool_context)
                    .await;
                messages.push(message);
            }
        }

        if is_final {
            let Some(synthesizer) = select_lead(&state.active_agents, None) else {
                return StateDelta::fatal(OrchestrationError::NoCoordinator {
                    mode: state.mode.to_string(),
                });
            };

            let discussion: Vec<(String, String)> = state
                .messages
                .iter()
                .rev()
                .take(round as usize * agent_count)
                .rev()
                .chain(messages.iter())
                .map(|m| (m.agent_name.clone(), m.content.clone()))
                .collect();
            let prompt = prompts::consensus_synthesis_prompt(&state.user_input, &discussion);

            let synthesis = env
                .run_agent(
                    synthesizer,
                    &state.user_input,
                    &state.messages,
                    true,
                    Some(&prompt),
                    &state.tool_context,
                )
                .await;
            messages.push(synthesis);
        }

        let mut delta = StateDelta {
            messages,
            round: Some(round + 1),
            complete: is_final,
            ..Default::default()
        };
        if state.debug_enabled {
            delta.trace.push(TraceEvent::new(
                "consensus",
                format!(
                    "round {round} complete{}",
                    if is_final { " (synthesized)" } else { "" }
                ),
            ));
        }
        delta
    }
}
