use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ColloquyError;

/// Tool/plugin capability kinds an agent may declare. `Custom` and `Skill`
/// resolve dynamically; everything else maps through a fixed id table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WebSearch,
    /// Alias of `WebSearch`.
    Research,
    Calculator,
    Gmail,
    /// Alias of `Gmail`.
    Email,
    Calendar,
    Drive,
    Hubspot,
    Asana,
    Files,
    /// Alias of `Files`.
    Workspace,
    Shell,
    Custom,
    Skill,
}

/// Specification of a tool exposed to a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub id: String,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool call requested by a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub tool_id: String,
    pub arguments: serde_json::Value,
}

/// Result of executing one tool call through the external capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Credential and policy context for one call. Built once per turn,
/// read-only, threaded to every tool resolution and execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub user_id: Option<String>,
    pub credentials: HashMap<String, String>,
    pub local_file_access: bool,
    pub command_execution: bool,
    pub file_access_root: Option<PathBuf>,
    pub workspace_quota_bytes: Option<u64>,
    pub hosted_sandbox: bool,
}

/// The tool-execution capability this engine consumes as a black box.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Spec for a fixed-table tool id, if this executor can run it.
    async fn describe(&self, tool_id: &str) -> Option<ToolSpec>;

    /// User-defined tools not covered by the fixed table.
    async fn custom_tools(&self, _ctx: &ToolContext) -> Vec<ToolSpec> {
        Vec::new()
    }

    async fn execute(
        &self,
        tool_id: &str,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ColloquyError>;
}

/// An installed plugin: a slug, the tools it exposes, and the executor that
/// runs them.
#[derive(Clone)]
pub struct InstalledPlugin {
    pub slug: String,
    pub tools: Vec<ToolSpec>,
    pub executor: Arc<dyn ToolExecutor>,
}

/// Discovery of installed plugins, backing the `Skill` kind.
#[async_trait]
pub trait PluginCatalog: Send + Sync {
    async fn installed(&self, ctx: &ToolContext) -> Vec<InstalledPlugin>;
}
