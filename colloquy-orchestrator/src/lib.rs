//! Multi-agent orchestration engine: topology controllers and the turn
//! driver.
//!
//! Given one user turn, a set of configured agents, and a requested
//! topology, [`Orchestrator::run_turn`] produces the agent messages that
//! topology's semantics call for — single responder, ordered relay,
//! concurrent fan-out, coordinator/specialist delegation, bounded
//! multi-round consensus with synthesis, or automatic routing. Per-agent
//! failures never abort a turn; they surface as error-marked messages.

pub mod config;
pub mod controllers;
pub mod decision;
pub mod driver;
pub mod prompts;
pub mod selection;

pub use colloquy_agent::AgentExecutor;
pub use config::{from_toml_str, load_config, validate_config, OrchestratorConfig};
pub use controllers::{controller_for, ExecutionEnv, TopologyController};
pub use driver::{Orchestrator, TurnOutcome, TurnRequest, DEFAULT_MAX_ROUNDS};
pub use selection::select_lead;
