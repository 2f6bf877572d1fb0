//! History filtering for one agent's view of the conversation.

use colloquy_core::agent::AgentConfig;
use colloquy_core::message::{AgentMessage, MessageRole};
use colloquy_core::model::ChatTurn;

/// Project the accumulated messages into the chat turns this agent is
/// allowed to see. User messages always pass. When `can_see_others` is
/// false every foreign assistant-authored message is dropped; when true,
/// foreign assistant content is prefixed with the author's display name so
/// the model can tell voices apart.
pub fn filter_history(
    agent: &AgentConfig,
    history: &[AgentMessage],
    can_see_others: bool,
) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(history.len());

    for message in history {
        match message.role {
            MessageRole::User => turns.push(ChatTurn::user(message.content.clone())),
            // System context is carried via the system prompt, not history.
            MessageRole::System => {}
            MessageRole::Assistant => {
                if message.agent_id == agent.id {
                    turns.push(ChatTurn::assistant(message.content.clone()));
                } else if can_see_others {
                    turns.push(ChatTurn::assistant(format!(
                        "{}: {}",
                        message.agent_name, message.content
                    )));
                }
            }
        }
    }

    turns
}
