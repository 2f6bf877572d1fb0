//! The six topology controllers. Each is a state machine over the shared
//! per-call `OrchestrationState`: a pure `step` that reads the state and
//! returns a delta, with `complete` signalling loop termination. The driver
//! owns the merge.

mod auto;
mod consensus;
mod hierarchical;
mod parallel;
mod sequential;
mod single;

pub use auto::AutoRouterController;
pub use consensus::ConsensusController;
pub use hierarchical::HierarchicalController;
pub use parallel::ParallelController;
pub use sequential::SequentialController;
pub use single::SingleController;

use async_trait::async_trait;

use colloquy_agent::{AgentExecutor, ExecutionRequest};
use colloquy_core::agent::AgentConfig;
use colloquy_core::message::AgentMessage;
use colloquy_core::model::{RoundCallback, TokenCallback};
use colloquy_core::state::{OrchestrationState, StateDelta, TurnMode};
use colloquy_core::tool::ToolContext;

/// Execution capabilities shared by every controller step: the agent
/// execution unit plus the caller's streaming/round callbacks.
pub struct ExecutionEnv {
    pub executor: AgentExecutor,
    pub on_token: Option<TokenCallback>,
    pub on_round: Option<RoundCallback>,
}

impl ExecutionEnv {
    /// Run one agent with this call's callbacks threaded through.
    pub(crate) async fn run_agent(
        &self,
        agent: &AgentConfig,
        user_input: &str,
        history: &[AgentMessage],
        can_see_others: bool,
        additional_context: Option<&str>,
        tool_context: &ToolContext,
    ) -> AgentMessage {
        self.executor
            .execute(ExecutionRequest {
                agent,
                user_input,
                history,
                can_see_others,
                additional_context,
                tool_context,
                on_token: self.on_token.clone(),
            })
            .await
    }
}

/// One topology's state machine.
#[async_trait]
pub trait TopologyController: Send + Sync {
    async fn step(&self, state: &OrchestrationState, env: &ExecutionEnv) -> StateDelta;
}

/// Controller for a requested mode.
pub fn controller_for(mode: TurnMode) -> Box<dyn TopologyController> {
    match mode {
        TurnMode::Single => Box::new(SingleController),
        TurnMode::Sequential => Box::new(SequentialController),
        TurnMode::Parallel => Box::new(ParallelController),
        TurnMode::Hierarchical => Box::new(HierarchicalController),
        TurnMode::Consensus => Box::new(ConsensusController),
        TurnMode::Auto => Box::new(AutoRouterController),
    }
}
