//! Agent execution unit and tool binding builder for the colloquy
//! orchestration engine.
//!
//! [`AgentExecutor`] runs exactly one agent for one turn: it assembles
//! instructions, filters history by visibility, resolves tool bindings,
//! drives the bounded tool-call loop, and converts every failure into an
//! error-marked message instead of propagating it.

pub mod bindings;
pub mod executor;
pub mod history;

#[cfg(feature = "rig")]
pub mod rig;

pub use bindings::{BindingBuilder, ToolBinding};
pub use executor::{AgentExecutor, ExecutionRequest, DEFAULT_MAX_TOOL_ROUNDS};
pub use history::filter_history;
