use colloquy_core::agent::{AgentConfig, AgentRole};

/// Shared coordinator/synthesizer selection: prefer an explicitly pinned
/// id, else the first agent with the coordinator role, else the first agent
/// in the (priority-sorted) list. Every mode that needs a lead goes through
/// here so no mode hard-codes its own selection.
pub fn select_lead<'a>(agents: &'a [AgentConfig], pinned: Option<&str>) -> Option<&'a AgentConfig> {
    if let Some(id) = pinned {
        if let Some(agent) = agents.iter().find(|a| a.id == id) {
            return Some(agent);
        }
    }
    agents
        .iter()
        .find(|a| a.role == AgentRole::Coordinator)
        .or_else(|| agents.first())
}
