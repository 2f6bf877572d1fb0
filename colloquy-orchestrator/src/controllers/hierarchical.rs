use async_trait::async_trait;
use serde::Deserialize;

use colloquy_core::error::OrchestrationError;
use colloquy_core::message::AgentMessage;
use colloquy_core::state::{Delegation, OrchestrationState, StateDelta, TraceEvent};

use super::{ExecutionEnv, TopologyController};
use crate::decision;
use crate::prompts;
use crate::selection::select_lead;

/// Coordinator/specialist delegation. First step asks the coordinator for a
/// delegation decision; an unparsable decision makes the coordinator's
/// direct answer final. Otherwise each delegated specialist runs in its own
/// step (forced isolated), and a final step has the coordinator synthesize.
pub struct HierarchicalController;

#[derive(Debug, Deserialize)]
struct DelegationDecision {
    delegations: Vec<DelegationEntry>,
}

#[derive(Debug, Deserialize)]
struct DelegationEntry {
    agent_id: String,
    task: String,
}

#[async_trait]
impl TopologyController for HierarchicalController {
    async fn step(&self, state: &OrchestrationState, env: &ExecutionEnv) -> StateDelta {
        if state.active_agents.is_empty() {
            return StateDelta::fatal(OrchestrationError::NoActiveAgents);
        }
        let Some(coordinator) = select_lead(&state.active_agents, None) else {
            return StateDelta::fatal(OrchestrationError::NoCoordinator {
                mode: state.mode.to_string(),
            });
        };

        if state.delegations.is_empty() {
            return self.delegate(state, env, coordinator).await;
        }
        if state.delegation_cursor < state.delegations.len() {
            return self.run_specialist(state, env).await;
        }
        self.synthesize(state, env, coordinator).await
    }
}

impl HierarchicalController {
    async fn delegate(
        &self,
        state: &OrchestrationState,
        env: &ExecutionEnv,
        coordinator: &colloquy_core::agent::AgentConfig,
    ) -> StateDelta {
        let specialists: Vec<_> = state
            .active_agents
            .iter()
            .filter(|a| a.id != coordinator.id)
            .collect();

        // Nobody to delegate to: the coordinator answers directly.
        if specialists.is_empty() {
            let message = env
                .run_agent(
                    coordinator,
                    &state.user_input,
                    &state.messages,
                    coordinator.can_see_other_agents,
                    None,
                    &state.tool_context,
                )
                .await;
            return StateDelta {
                messages: vec![message],
                complete: true,
                ..Default::default()
            };
        }

        let prompt = prompts::delegation_prompt(&specialists);
        let message = env
            .run_agent(
                coordinator,
                &state.user_input,
                &state.messages,
                coordinator.can_see_other_agents,
                Some(&prompt),
                &state.tool_context,
            )
            .await;

        let parsed = decision::extract(&message)
            .and_then(|value| serde_json::from_value::<DelegationDecision>(value).ok());

        match parsed {
            Some(decision) if !decision.delegations.is_empty() => {
                let delegations: Vec<Delegation> = decision
                    .delegations
                    .into_iter()
                    .map(|entry| Delegation {
                        agent_id: entry.agent_id,
                        task: entry.task,
                    })
                    .collect();
                tracing::debug!(
                    coordinator = %coordinator.id,
                    count = delegations.len(),
                    "coordinator delegated"
                );
                let mut delta = StateDelta {
                    delegations: Some(delegations),
                    delegation_cursor: Some(0),
                    ..Default::default()
                };
                if state.debug_enabled {
                    delta.trace.push(TraceEvent::new(
                        "hierarchical",
                        format!("coordinator {} delegated", coordinator.id),
                    ));
                }
                delta
            }
            // No decision: the coordinator's raw answer is the final output.
            _ => {
                tracing::debug!(coordinator = %coordinator.id, "no delegation decision; direct answer");
                let mut delta = StateDelta {
                    messages: vec![message],
                    complete: true,
                    ..Default::default()
                };
                if state.debug_enabled {
                    delta.trace.push(TraceEvent::new(
                        "hierarchical",
                        "no parsable delegation; coordinator answered directly",
                    ));
                }
                delta
            }
        }
    }

    async fn run_specialist(&self, state: &OrchestrationState, env: &ExecutionEnv) -> StateDelta {
        let cursor = state.delegation_cursor;
        let delegation = &state.delegations[cursor];

        let message = match state
            .active_agents
            .iter()
            .find(|a| a.id == delegation.agent_id)
        {
            // Specialists run isolated against their delegated task text.
            Some(specialist) => {
                env.run_agent(
                    specialist,
                    &delegation.task,
                    &state.messages,
                    false,
                    None,
                    &state.tool_context,
                )
                .await
            }
            None => {
                tracing::warn!(agent_id = %delegation.agent_id, "delegation names an unknown agent");
                AgentMessage::error_unattributed(
                    delegation.agent_id.clone(),
                    format!("delegated to unknown agent '{}'", delegation.agent_id),
                )
            }
        };

        StateDelta {
            messages: vec![message],
            delegation_cursor: Some(cursor + 1),
            ..Default::default()
        }
    }

    async fn synthesize(
        &self,
        state: &OrchestrationState,
        env: &ExecutionEnv,
        coordinator: &colloquy_core::agent::AgentConfig,
    ) -> StateDelta {
        // The specialist outputs are the most recent delegation-count
        // messages in the accumulated list.
        let outputs: Vec<(String, String)> = state
            .messages
            .iter()
            .rev()
            .take(state.delegations.len())
            .rev()
            .map(|m| (m.agent_name.clone(), m.content.clone()))
            .collect();

        let prompt = prompts::synthesis_prompt(&state.user_input, &outputs);
        let message = env
            .run_agent(
                coordinator,
                &state.user_input,
                &state.messages,
                coordinator.can_see_other_agents,
                Some(&prompt),
                &state.tool_context,
            )
            .await;

        let mut delta = StateDelta {
            messages: vec![message],
            complete: true,
            ..Default::default()
        };
        if state.debug_enabled {
            delta.trace.push(TraceEvent::new(
                "hierarchical",
                format!("coordinator {} synthesized", coordinator.id),
            ));
        }
        delta
    }
}
