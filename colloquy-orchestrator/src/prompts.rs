//! Prompt overrides for the modes that need a coordinator, router, or
//! synthesizer. These replace the agent's stored identity for one call.

use colloquy_core::agent::AgentConfig;

/// Instructs a coordinator to either answer directly or emit a delegation
/// decision as JSON.
pub fn delegation_prompt(specialists: &[&AgentConfig]) -> String {
    let roster = specialists
        .iter()
        .map(|a| format!("- {} ({}): {}", a.id, a.name, a.role_label()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are the coordinator of a team of specialist agents.\n\
         Available specialists:\n{roster}\n\n\
         Decide how to handle the user's request. If specialists should work on it, \
         respond with ONLY a JSON object of the form \
         {{\"delegations\": [{{\"agent_id\": \"<id>\", \"task\": \"<what that agent should do>\"}}]}}. \
         If you can answer the request well yourself, answer it directly instead."
    )
}

/// Instructs the coordinator to combine specialist outputs into one answer.
pub fn synthesis_prompt(original_input: &str, outputs: &[(String, String)]) -> String {
    let combined = outputs
        .iter()
        .map(|(name, content)| format!("## {name}\n{content}"))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are the coordinator. Your specialists have completed their tasks \
         for the request: \"{original_input}\"\n\n\
         Specialist outputs:\n\n{combined}\n\n\
         Synthesize these into one final, coherent answer for the user. \
         Do not mention the delegation process."
    )
}

/// User-facing input for a consensus discussion round: the original request
/// plus every agent's prior-round position.
pub fn discussion_input(original_input: &str, prior_round: &[(String, String)]) -> String {
    let positions = prior_round
        .iter()
        .map(|(name, content)| format!("## {name}\n{content}"))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{original_input}\n\n\
         The other participants answered as follows in the previous round:\n\n{positions}\n\n\
         Reconsider your answer. Keep what you still believe is right, adopt what \
         others got right, and state your updated answer."
    )
}

/// Instructs the designated synthesizer to close out a consensus discussion.
pub fn consensus_synthesis_prompt(original_input: &str, discussion: &[(String, String)]) -> String {
    let transcript = discussion
        .iter()
        .map(|(name, content)| format!("## {name}\n{content}"))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are the synthesizer for a multi-agent discussion of the request: \
         \"{original_input}\"\n\n\
         Full discussion:\n\n{transcript}\n\n\
         Produce the single best final answer, reconciling disagreements where \
         the discussion did not converge."
    )
}

/// Instructs a router agent to pick a subset of agents and a sub-mode.
pub fn routing_prompt(agents: &[AgentConfig]) -> String {
    let roster = agents
        .iter()
        .map(|a| format!("- {} ({}): {}", a.id, a.name, a.role_label()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a routing agent. Given the user's request, choose which agents \
         should handle it and how.\n\
         Available agents:\n{roster}\n\n\
         Respond with ONLY a JSON object of the form \
         {{\"agents\": [\"<id>\", ...], \"mode\": \"single\" | \"sequential\" | \"parallel\"}}. \
         Use \"single\" with one agent for simple requests, \"sequential\" when agents \
         should build on each other, and \"parallel\" for independent perspectives."
    )
}

/// Human-readable role label used in rosters.
trait RoleLabel {
    fn role_label(&self) -> &'static str;
}

impl RoleLabel for AgentConfig {
    fn role_label(&self) -> &'static str {
        use colloquy_core::agent::AgentRole;
        match self.role {
            AgentRole::Assistant => "general assistant",
            AgentRole::Coder => "coder",
            AgentRole::Analyst => "analyst",
            AgentRole::Writer => "writer",
            AgentRole::Researcher => "researcher",
            AgentRole::Coordinator => "coordinator",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Custom => "custom",
        }
    }
}
