//! Agent execution unit: runs exactly one agent for one turn, with history
//! filtering, a bounded tool-call loop, optional token streaming, and local
//! error containment.

use std::sync::Arc;

use colloquy_core::agent::AgentConfig;
use colloquy_core::error::{AgentError, ColloquyError, ModelError};
use colloquy_core::message::AgentMessage;
use colloquy_core::model::{
    ChatTurn, CompletionRequest, ModelClient, TokenCallback, TokenSink, TokenUsage,
};
use colloquy_core::tool::{ToolContext, ToolSpec};

use crate::bindings::BindingBuilder;
use crate::history::filter_history;

/// Hard cap on sequential tool-call rounds within one agent turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 10;

/// Everything one agent execution needs, borrowed from the per-call state.
pub struct ExecutionRequest<'a> {
    pub agent: &'a AgentConfig,
    pub user_input: &'a str,
    pub history: &'a [AgentMessage],
    pub can_see_others: bool,
    /// When present, replaces the agent's stored system prompt for this
    /// call (synthesis, delegation, and routing overrides).
    pub additional_context: Option<&'a str>,
    pub tool_context: &'a ToolContext,
    pub on_token: Option<TokenCallback>,
}

/// Executes one agent for one turn. Infallible at the interface: every
/// failure inside is converted to an error-marked message so one bad agent
/// cannot abort a multi-agent turn.
#[derive(Clone)]
pub struct AgentExecutor {
    model: Arc<dyn ModelClient>,
    bindings: BindingBuilder,
    max_tool_rounds: u32,
}

impl AgentExecutor {
    pub fn new(model: Arc<dyn ModelClient>, bindings: BindingBuilder) -> Self {
        Self {
            model,
            bindings,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    pub async fn execute(&self, request: ExecutionRequest<'_>) -> AgentMessage {
        let agent = request.agent;
        match self.run(&request).await {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(agent_id = %agent.id, error = %err, "agent turn failed");
                AgentMessage::error(agent, err)
            }
        }
    }

    async fn run(&self, request: &ExecutionRequest<'_>) -> Result<AgentMessage, ColloquyError> {
        let agent = request.agent;

        let system_prompt = match request.additional_context {
            Some(context) => context.to_string(),
            None => agent.system_prompt.clone(),
        };

        let mut turns = filter_history(agent, request.history, request.can_see_others);
        turns.push(ChatTurn::user(request.user_input));

        let bindings = self.bindings.build(&agent.tools, request.tool_context).await;
        let tool_specs: Vec<ToolSpec> = bindings
            .as_ref()
            .map(|map| map.values().map(|b| b.spec.clone()).collect())
            .unwrap_or_default();

        let mut usage = TokenUsage::default();
        let mut tools_used: Vec<String> = Vec::new();
        let mut structured: Option<serde_json::Value> = None;
        let mut tool_rounds: u32 = 0;

        loop {
            let completion = CompletionRequest {
                model_id: agent.model_id.clone(),
                system_prompt: system_prompt.clone(),
                messages: turns.clone(),
                temperature: agent.temperature,
                max_tokens: agent.max_tokens,
                tools: tool_specs.clone(),
            };

            let response = match &request.on_token {
                Some(callback) => {
                    let callback = callback.clone();
                    let agent_id = agent.id.clone();
                    let agent_name = agent.name.clone();
                    let sink: TokenSink =
                        Arc::new(move |fragment| (*callback)(fragment, &agent_id, &agent_name));
                    self.model.complete_streaming(&completion, sink).await?
                }
                None => self.model.complete(&completion).await?,
            };

            usage.add(response.usage);
            if response.structured.is_some() {
                structured = response.structured.clone();
            }

            if response.has_tool_calls() {
                tool_rounds += 1;
                if tool_rounds > self.max_tool_rounds {
                    return Err(AgentError::ToolBudgetExhausted {
                        agent_id: agent.id.clone(),
                        rounds: self.max_tool_rounds,
                    }
                    .into());
                }

                let Some(bindings) = bindings.as_ref() else {
                    return Err(ModelError::InvalidResponse {
                        reason: "tool calls returned on a request that offered no tools".into(),
                    }
                    .into());
                };

                tracing::debug!(
                    agent_id = %agent.id,
                    num_calls = response.tool_calls.len(),
                    round = tool_rounds,
                    "executing tool calls"
                );

                if let Some(text) = &response.text {
                    turns.push(ChatTurn::assistant(text.clone()));
                }

                for call in &response.tool_calls {
                    let result = match bindings.get(&call.tool_id) {
                        Some(binding) => {
                            tools_used.push(call.tool_id.clone());
                            binding.invoke(call.arguments.clone()).await
                        }
                        None => format!("Tool '{}' is not available", call.tool_id),
                    };
                    turns.push(ChatTurn::user(format!("[tool:{}] {result}", call.tool_id)));
                }

                continue;
            }

            // No tool calls: this is the final response.
            let text = response.text.unwrap_or_default();
            tracing::debug!(agent_id = %agent.id, tool_rounds, "agent turn completed");

            let mut message = AgentMessage::assistant(agent, text);
            message.metadata.token_usage = Some(usage);
            message.metadata.tools_used = tools_used;
            message.metadata.structured = structured;
            return Ok(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use colloquy_core::agent::AgentRole;
    use colloquy_core::error::ToolError;
    use colloquy_core::model::{MockModelClient, ModelResponse};
    use colloquy_core::tool::{ToolCall, ToolExecutor, ToolKind, ToolOutcome};

    fn agent(id: &str) -> AgentConfig {
        AgentConfig {
            id: id.into(),
            name: id.to_uppercase(),
            role: AgentRole::Assistant,
            provider: "test".into(),
            model_id: format!("{id}-model"),
            system_prompt: format!("You are {id}."),
            temperature: 0.2,
            max_tokens: Some(512),
            tools: vec![],
            can_see_other_agents: true,
            priority: 0,
            is_active: true,
        }
    }

    struct CalculatorExecutor;

    #[async_trait]
    impl ToolExecutor for CalculatorExecutor {
        async fn describe(&self, tool_id: &str) -> Option<ToolSpec> {
            (tool_id == "calculator").then(|| ToolSpec {
                id: "calculator".into(),
                name: "calculator".into(),
                description: "Evaluate arithmetic".into(),
                parameters: serde_json::json!({"type": "object"}),
            })
        }

        async fn execute(
            &self,
            tool_id: &str,
            _params: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolOutcome, ColloquyError> {
            match tool_id {
                "calculator" => Ok(ToolOutcome::ok(serde_json::json!({"result": 4}))),
                other => Err(ToolError::NotFound {
                    tool_id: other.to_string(),
                }
                .into()),
            }
        }
    }

    fn tool_call(id: &str, tool_id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            tool_id: tool_id.into(),
            arguments: serde_json::json!({}),
        }
    }

    fn executor_with(
        model: Arc<MockModelClient>,
        tools: Option<Arc<dyn ToolExecutor>>,
    ) -> AgentExecutor {
        let mut builder = BindingBuilder::new();
        if let Some(tools) = tools {
            builder = builder.with_executor(tools);
        }
        AgentExecutor::new(model, builder)
    }

    #[tokio::test]
    async fn plain_completion_produces_one_message() {
        let model = Arc::new(MockModelClient::new(vec![ModelResponse {
            text: Some("4".into()),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 1,
                total_tokens: 11,
            },
            ..Default::default()
        }]));
        let exec = executor_with(model.clone(), None);
        let config = agent("assistant");

        let message = exec
            .execute(ExecutionRequest {
                agent: &config,
                user_input: "2+2?",
                history: &[],
                can_see_others: true,
                additional_context: None,
                tool_context: &ToolContext::default(),
                on_token: None,
            })
            .await;

        assert_eq!(message.content, "4");
        assert_eq!(message.agent_id, "assistant");
        assert!(!message.is_error());
        assert_eq!(message.metadata.token_usage.unwrap().total_tokens, 11);

        let requests = model.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_prompt, "You are assistant.");
        assert_eq!(requests[0].model_id, "assistant-model");
    }

    #[tokio::test]
    async fn tool_round_then_final_answer() {
        let model = Arc::new(MockModelClient::new(vec![
            ModelResponse {
                tool_calls: vec![tool_call("call-1", "calculator")],
                ..Default::default()
            },
            ModelResponse::text("The answer is 4."),
        ]));
        let exec = executor_with(model.clone(), Some(Arc::new(CalculatorExecutor)));
        let mut config = agent("analyst");
        config.tools = vec![ToolKind::Calculator];

        let message = exec
            .execute(ExecutionRequest {
                agent: &config,
                user_input: "2+2?",
                history: &[],
                can_see_others: true,
                additional_context: None,
                tool_context: &ToolContext::default(),
                on_token: None,
            })
            .await;

        assert_eq!(message.content, "The answer is 4.");
        assert_eq!(message.metadata.tools_used, vec!["calculator".to_string()]);

        // Second model call saw the serialized tool result.
        let requests = model.recorded_requests();
        assert_eq!(requests.len(), 2);
        let last_turn = requests[1].messages.last().unwrap();
        assert!(last_turn.content.contains(r#"{"result":4}"#));
    }

    #[tokio::test]
    async fn runaway_tool_loop_hits_the_budget() {
        let responses: Vec<ModelResponse> = (0..5)
            .map(|i| ModelResponse {
                tool_calls: vec![tool_call(&format!("call-{i}"), "calculator")],
                ..Default::default()
            })
            .collect();
        let model = Arc::new(MockModelClient::new(responses));
        let exec = executor_with(model, Some(Arc::new(CalculatorExecutor)))
            .with_max_tool_rounds(2);
        let mut config = agent("analyst");
        config.tools = vec![ToolKind::Calculator];

        let message = exec
            .execute(ExecutionRequest {
                agent: &config,
                user_input: "loop forever",
                history: &[],
                can_see_others: true,
                additional_context: None,
                tool_context: &ToolContext::default(),
                on_token: None,
            })
            .await;

        assert!(message.is_error());
        assert!(
            message
                .metadata
                .error
                .as_deref()
                .unwrap()
                .contains("budget exhausted")
        );
    }

    #[tokio::test]
    async fn model_failure_becomes_an_error_marked_message() {
        let model = Arc::new(MockModelClient::with_results(vec![Err(
            ModelError::CallFailed {
                provider: "test".into(),
                reason: "connection reset".into(),
            }
            .into(),
        )]));
        let exec = executor_with(model, None);
        let config = agent("assistant");

        let message = exec
            .execute(ExecutionRequest {
                agent: &config,
                user_input: "hello",
                history: &[],
                can_see_others: true,
                additional_context: None,
                tool_context: &ToolContext::default(),
                on_token: None,
            })
            .await;

        assert!(message.is_error());
        assert_eq!(message.agent_id, "assistant");
        assert!(message.content.contains("connection reset"));
    }

    #[tokio::test]
    async fn context_override_replaces_the_stored_prompt() {
        let model = Arc::new(MockModelClient::new(vec![ModelResponse::text("done")]));
        let exec = executor_with(model.clone(), None);
        let config = agent("lead");

        exec.execute(ExecutionRequest {
            agent: &config,
            user_input: "synthesize",
            history: &[],
            can_see_others: true,
            additional_context: Some("Combine the drafts into one answer."),
            tool_context: &ToolContext::default(),
            on_token: None,
        })
        .await;

        let requests = model.recorded_requests();
        assert_eq!(
            requests[0].system_prompt,
            "Combine the drafts into one answer."
        );
        assert!(!requests[0].system_prompt.contains("You are lead."));
    }

    #[tokio::test]
    async fn isolation_excludes_foreign_output_from_the_wire() {
        let drafter = agent("drafter");
        let mut editor = agent("editor");
        editor.can_see_other_agents = false;

        let history = vec![
            AgentMessage::user("write a haiku"),
            AgentMessage::assistant(&drafter, "crisp leaves underfoot"),
        ];

        let model = Arc::new(MockModelClient::new(vec![ModelResponse::text("ok")]));
        let exec = executor_with(model.clone(), None);

        exec.execute(ExecutionRequest {
            agent: &editor,
            user_input: "edit the haiku",
            history: &history,
            can_see_others: false,
            additional_context: None,
            tool_context: &ToolContext::default(),
            on_token: None,
        })
        .await;

        let requests = model.recorded_requests();
        let assembled: String = requests[0]
            .messages
            .iter()
            .map(|t| t.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(!assembled.contains("crisp leaves underfoot"));
        assert!(assembled.contains("edit the haiku"));
    }

    #[tokio::test]
    async fn streaming_relays_fragments_with_agent_identity() {
        let model = Arc::new(MockModelClient::new(vec![ModelResponse::text(
            "streamed answer",
        )]));
        let exec = executor_with(model, None);
        let config = agent("assistant");

        let seen = Arc::new(std::sync::Mutex::new(Vec::<(String, String, String)>::new()));
        let sink_seen = seen.clone();
        let callback: TokenCallback = Arc::new(move |fragment, agent_id, agent_name| {
            sink_seen.lock().unwrap().push((
                fragment.to_string(),
                agent_id.to_string(),
                agent_name.to_string(),
            ));
        });

        let message = exec
            .execute(ExecutionRequest {
                agent: &config,
                user_input: "go",
                history: &[],
                can_see_others: true,
                additional_context: None,
                tool_context: &ToolContext::default(),
                on_token: Some(callback),
            })
            .await;

        assert_eq!(message.content, "streamed answer");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "assistant");
        assert_eq!(seen[0].2, "ASSISTANT");
    }
}
