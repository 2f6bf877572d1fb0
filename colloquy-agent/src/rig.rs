//! `ModelClient` implementation backed by a rig `CompletionModel`.
//! Enabled with the `rig` feature.

use async_trait::async_trait;

use colloquy_core::error::{ColloquyError, ModelError};
use colloquy_core::message::MessageRole;
use colloquy_core::model::{CompletionRequest, ModelClient, ModelResponse, TokenUsage};
use colloquy_core::tool::ToolCall;

/// A `ModelClient` that wraps a rig `CompletionModel`.
pub struct RigModelClient<M: rig::completion::CompletionModel> {
    model: M,
}

impl<M: rig::completion::CompletionModel> RigModelClient<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M> ModelClient for RigModelClient<M>
where
    M: rig::completion::CompletionModel + Send + Sync + 'static,
    M::Response: Send + Sync,
{
    async fn complete(&self, request: &CompletionRequest) -> Result<ModelResponse, ColloquyError> {
        let (current_prompt, chat_history) = split_prompt_and_history(request);
        let tool_definitions = to_rig_definitions(request);

        let mut builder = self
            .model
            .completion_request(current_prompt)
            .preamble(request.system_prompt.clone())
            .messages(chat_history)
            .tools(tool_definitions)
            .temperature(request.temperature as f64);
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(max_tokens as u64);
        }
        let rig_request = builder.build();

        let response = self.model.completion(rig_request).await.map_err(|e| {
            ColloquyError::Model(ModelError::CallFailed {
                provider: request.model_id.clone(),
                reason: e.to_string(),
            })
        })?;

        let mut text = None;
        let mut tool_calls = Vec::new();

        for content in response.choice.iter() {
            match content {
                rig::message::AssistantContent::Text(t) => {
                    text = Some(t.text.clone());
                }
                rig::message::AssistantContent::ToolCall(tc) => {
                    tool_calls.push(ToolCall {
                        id: tc.id.clone(),
                        tool_id: tc.function.name.clone(),
                        arguments: tc.function.arguments.clone(),
                    });
                }
                _ => {} // Reasoning, Image, etc. — ignored
            }
        }

        Ok(ModelResponse {
            text,
            tool_calls,
            structured: None,
            // Token counts are not exposed by rig's CompletionResponse.
            usage: TokenUsage::default(),
        })
    }
}

/// rig treats the latest user text as the prompt and everything before it
/// as chat history.
fn split_prompt_and_history(
    request: &CompletionRequest,
) -> (String, Vec<rig::completion::Message>) {
    let mut rig_messages: Vec<rig::completion::Message> = Vec::new();
    for turn in &request.messages {
        match turn.role {
            MessageRole::User => rig_messages.push(rig::completion::Message::user(turn.content.clone())),
            MessageRole::Assistant => {
                rig_messages.push(rig::completion::Message::assistant(turn.content.clone()))
            }
            // System context travels via the preamble.
            MessageRole::System => {}
        }
    }

    let Some(last) = request.messages.last() else {
        return (String::new(), rig_messages);
    };

    if last.role == MessageRole::User {
        rig_messages.pop();
        return (last.content.clone(), rig_messages);
    }

    (String::new(), rig_messages)
}

fn to_rig_definitions(request: &CompletionRequest) -> Vec<rig::completion::ToolDefinition> {
    request
        .tools
        .iter()
        .map(|s| rig::completion::ToolDefinition {
            name: s.id.clone(),
            description: s.description.clone(),
            parameters: s.parameters.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::model::ChatTurn;

    fn request(messages: Vec<ChatTurn>) -> CompletionRequest {
        CompletionRequest {
            model_id: "test-model".into(),
            system_prompt: "sys".into(),
            messages,
            temperature: 0.0,
            max_tokens: None,
            tools: vec![],
        }
    }

    #[test]
    fn split_uses_last_user_turn_as_prompt() {
        let req = request(vec![
            ChatTurn::assistant("hello"),
            ChatTurn::user("what now"),
        ]);

        let (prompt, history) = split_prompt_and_history(&req);
        assert_eq!(prompt, "what now");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn split_keeps_trailing_assistant_turn_in_history() {
        let req = request(vec![ChatTurn::user("question"), ChatTurn::assistant("answer")]);

        let (prompt, history) = split_prompt_and_history(&req);
        assert_eq!(prompt, "");
        assert_eq!(history.len(), 2);
    }
}
