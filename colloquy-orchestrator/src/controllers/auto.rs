use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;

use colloquy_core::agent::AgentConfig;
use colloquy_core::error::OrchestrationError;
use colloquy_core::message::AgentMessage;
use colloquy_core::state::{OrchestrationState, RoutePlan, StateDelta, TraceEvent, TurnMode};

use super::{ExecutionEnv, TopologyController};
use crate::decision;
use crate::prompts;
use crate::selection::select_lead;

/// Automatic routing. The first step asks a router agent (coordinator role,
/// else first agent) to choose a subset of agents and a sub-mode; the second
/// step executes that plan inline. Parse failure falls back to single mode
/// on the first active agent.
pub struct AutoRouterController;

#[derive(Debug, Deserialize)]
struct RouteDecision {
    #[serde(alias = "agent_ids")]
    agents: Vec<String>,
    #[serde(default)]
    mode: Option<String>,
}

#[async_trait]
impl TopologyController for AutoRouterController {
    async fn step(&self, state: &OrchestrationState, env: &ExecutionEnv) -> StateDelta {
        if state.active_agents.is_empty() {
            return StateDelta::fatal(OrchestrationError::NoActiveAgents);
        }

        match &state.route_plan {
            None => self.route(state, env).await,
            Some(plan) => self.execute_plan(state, env, plan).await,
        }
    }
}

impl AutoRouterController {
    async fn route(&self, state: &OrchestrationState, env: &ExecutionEnv) -> StateDelta {
        let Some(router) = select_lead(&state.active_agents, None) else {
            return StateDelta::fatal(OrchestrationError::NoCoordinator {
                mode: state.mode.to_string(),
            });
        };

        let prompt = prompts::routing_prompt(&state.active_agents);
        let message = env
            .run_agent(
                router,
                &state.user_input,
                &state.messages,
                router.can_see_other_agents,
                Some(&prompt),
                &state.tool_context,
            )
            .await;

        let plan = decision::extract(&message)
            .and_then(|value| serde_json::from_value::<RouteDecision>(value).ok())
            .and_then(|decision| self.validate(state, decision))
            .unwrap_or_else(|| {
                tracing::debug!(router = %router.id, "no parsable route; falling back to single");
                RoutePlan {
                    agent_ids: vec![state.active_agents[0].id.clone()],
                    mode: TurnMode::Single,
                }
            });

        let mut delta = StateDelta {
            route_plan: Some(plan.clone()),
            ..Default::default()
        };
        if state.debug_enabled {
            delta.trace.push(TraceEvent::new(
                "auto",
                format!("routed to {:?} as {}", plan.agent_ids, plan.mode),
            ));
        }
        delta
    }

    /// Keep only agent ids that resolve to active agents; an empty result
    /// means the decision was unusable.
    fn validate(&self, state: &OrchestrationState, decision: RouteDecision) -> Option<RoutePlan> {
        let agent_ids: Vec<String> = decision
            .agents
            .into_iter()
            .filter(|id| state.active_agents.iter().any(|a| &a.id == id))
            .collect();
        if agent_ids.is_empty() {
            return None;
        }

        let mode = match decision.mode.as_deref() {
            Some("sequential") => TurnMode::Sequential,
            Some("parallel") => TurnMode::Parallel,
            _ => TurnMode::Single,
        };
        Some(RoutePlan { agent_ids, mode })
    }

    async fn execute_plan(
        &self,
        state: &OrchestrationState,
        env: &ExecutionEnv,
        plan: &RoutePlan,
    ) -> StateDelta {
        let chosen: Vec<&AgentConfig> = plan
            .agent_ids
            .iter()
            .filter_map(|id| state.active_agents.iter().find(|a| &a.id == id))
            .collect();
        if chosen.is_empty() {
            return StateDelta::fatal(OrchestrationError::NoActiveAgents);
        }

        let messages: Vec<AgentMessage> = match plan.mode {
            TurnMode::Parallel => {
                let calls = chosen.iter().map(|agent| {
                    env.run_agent(
                        agent,
                        &state.user_input,
                        &state.messages,
                        agent.can_see_other_agents,
                        None,
                        &state.tool_context,
                    )
                });
                join_all(calls).await
            }
            TurnMode::Sequential => {
                let mut local_history = state.messages.clone();
                let mut produced = Vec::with_capacity(chosen.len());
                for agent in &chosen {
                    let message = env
                        .run_agent(
                            agent,
                            &state.user_input,
                            &local_history,
                            agent.can_see_other_agents,
                            None,
                            &state.tool_context,
                        )
                        .await;
                    local_history.push(message.clone());
                    produced.push(message);
                }
                produced
            }
            _ => {
                let agent = chosen[0];
                vec![
                    env.run_agent(
                        agent,
                        &state.user_input,
                        &state.messages,
                        agent.can_see_other_agents,
                        None,
                        &state.tool_context,
                    )
                    .await,
                ]
            }
        };

        StateDelta {
            messages,
            complete: true,
            ..Default::default()
        }
    }
}
