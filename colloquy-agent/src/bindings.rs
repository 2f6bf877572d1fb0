//! Tool binding builder: resolves an agent's declared tool kinds into
//! invocable handles bound to the caller's credential/policy context.

use std::collections::HashMap;
use std::sync::Arc;

use colloquy_core::tool::{PluginCatalog, ToolContext, ToolExecutor, ToolKind, ToolSpec};

/// Fixed kind-to-id table. Alias kinds map to the same id; `Custom` and
/// `Skill` resolve dynamically and have no fixed id.
fn fixed_tool_id(kind: ToolKind) -> Option<&'static str> {
    match kind {
        ToolKind::WebSearch | ToolKind::Research => Some("web_search"),
        ToolKind::Calculator => Some("calculator"),
        ToolKind::Gmail | ToolKind::Email => Some("gmail"),
        ToolKind::Calendar => Some("calendar"),
        ToolKind::Drive => Some("drive"),
        ToolKind::Hubspot => Some("hubspot"),
        ToolKind::Asana => Some("asana"),
        ToolKind::Files | ToolKind::Workspace => Some("workspace_files"),
        ToolKind::Shell => Some("run_command"),
        ToolKind::Custom | ToolKind::Skill => None,
    }
}

/// A resolved, invocable tool handle scoped to one call's context.
#[derive(Clone)]
pub struct ToolBinding {
    /// Spec exposed to the model. For plugin tools the id is namespaced as
    /// `{plugin_slug}__{tool_name}`.
    pub spec: ToolSpec,
    /// Id handed to the executor, which may differ from the namespaced
    /// model-facing id.
    target_id: String,
    executor: Arc<dyn ToolExecutor>,
    context: ToolContext,
}

impl ToolBinding {
    /// Run the tool. Never propagates: failures of every shape collapse to
    /// a descriptive string, successes serialize to a JSON string payload.
    pub async fn invoke(&self, params: serde_json::Value) -> String {
        match self
            .executor
            .execute(&self.target_id, params, &self.context)
            .await
        {
            Ok(outcome) if outcome.success => match outcome.data {
                Some(data) => serde_json::to_string(&data)
                    .unwrap_or_else(|e| format!("Tool '{}' returned unserializable data: {e}", self.spec.id)),
                None => "null".to_string(),
            },
            Ok(outcome) => format!(
                "Tool '{}' failed: {}",
                self.spec.id,
                outcome.error.unwrap_or_else(|| "unspecified error".into())
            ),
            Err(e) => format!("Tool '{}' failed: {e}", self.spec.id),
        }
    }
}

/// Resolves declared tool kinds against the external tool-execution
/// capability and the plugin catalog.
#[derive(Clone, Default)]
pub struct BindingBuilder {
    executor: Option<Arc<dyn ToolExecutor>>,
    plugins: Option<Arc<dyn PluginCatalog>>,
}

impl BindingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_plugins(mut self, catalog: Arc<dyn PluginCatalog>) -> Self {
        self.plugins = Some(catalog);
        self
    }

    /// Resolve `kinds` into bindings keyed by model-facing tool id.
    /// Returns `None` when nothing resolves; the agent then runs without
    /// tool-calling.
    pub async fn build(
        &self,
        kinds: &[ToolKind],
        ctx: &ToolContext,
    ) -> Option<HashMap<String, ToolBinding>> {
        let mut bindings: HashMap<String, ToolBinding> = HashMap::new();

        for kind in kinds {
            match kind {
                ToolKind::Custom => {
                    let Some(executor) = &self.executor else {
                        continue;
                    };
                    for spec in executor.custom_tools(ctx).await {
                        bindings.insert(
                            spec.id.clone(),
                            ToolBinding {
                                target_id: spec.id.clone(),
                                spec,
                                executor: executor.clone(),
                                context: ctx.clone(),
                            },
                        );
                    }
                }
                ToolKind::Skill => {
                    let Some(catalog) = &self.plugins else {
                        continue;
                    };
                    for plugin in catalog.installed(ctx).await {
                        for tool in &plugin.tools {
                            let namespaced = format!("{}__{}", plugin.slug, tool.name);
                            bindings.insert(
                                namespaced.clone(),
                                ToolBinding {
                                    spec: ToolSpec {
                                        id: namespaced,
                                        name: tool.name.clone(),
                                        description: tool.description.clone(),
                                        parameters: tool.parameters.clone(),
                                    },
                                    target_id: tool.id.clone(),
                                    executor: plugin.executor.clone(),
                                    context: ctx.clone(),
                                },
                            );
                        }
                    }
                }
                fixed => {
                    let Some(tool_id) = fixed_tool_id(*fixed) else {
                        continue;
                    };
                    if bindings.contains_key(tool_id) {
                        continue;
                    }
                    let Some(executor) = &self.executor else {
                        continue;
                    };
                    match executor.describe(tool_id).await {
                        Some(spec) => {
                            bindings.insert(
                                tool_id.to_string(),
                                ToolBinding {
                                    target_id: spec.id.clone(),
                                    spec,
                                    executor: executor.clone(),
                                    context: ctx.clone(),
                                },
                            );
                        }
                        None => {
                            tracing::debug!(tool_id = %tool_id, "declared tool not available; skipping");
                        }
                    }
                }
            }
        }

        if bindings.is_empty() {
            None
        } else {
            Some(bindings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use colloquy_core::error::{ColloquyError, ToolError};
    use colloquy_core::tool::{InstalledPlugin, ToolOutcome};

    struct TableExecutor;

    #[async_trait]
    impl ToolExecutor for TableExecutor {
        async fn describe(&self, tool_id: &str) -> Option<ToolSpec> {
            match tool_id {
                "web_search" | "calculator" => Some(ToolSpec {
                    id: tool_id.to_string(),
                    name: tool_id.to_string(),
                    description: format!("the {tool_id} tool"),
                    parameters: serde_json::json!({"type": "object"}),
                }),
                _ => None,
            }
        }

        async fn execute(
            &self,
            tool_id: &str,
            _params: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolOutcome, ColloquyError> {
            match tool_id {
                "calculator" => Ok(ToolOutcome::ok(serde_json::json!({"result": 4}))),
                "web_search" => Ok(ToolOutcome::failed("search backend unreachable")),
                other => Err(ToolError::NotFound {
                    tool_id: other.to_string(),
                }
                .into()),
            }
        }
    }

    fn builder() -> BindingBuilder {
        BindingBuilder::new().with_executor(Arc::new(TableExecutor))
    }

    #[tokio::test]
    async fn alias_kinds_collapse_to_one_binding() {
        let bindings = builder()
            .build(
                &[ToolKind::WebSearch, ToolKind::Research, ToolKind::Calculator],
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(bindings.len(), 2);
        assert!(bindings.contains_key("web_search"));
        assert!(bindings.contains_key("calculator"));
    }

    #[tokio::test]
    async fn unresolvable_kinds_yield_none() {
        let bindings = builder()
            .build(&[ToolKind::Asana], &ToolContext::default())
            .await;
        assert!(bindings.is_none());
    }

    #[tokio::test]
    async fn success_serializes_failure_stringifies() {
        let bindings = builder()
            .build(
                &[ToolKind::Calculator, ToolKind::WebSearch],
                &ToolContext::default(),
            )
            .await
            .unwrap();

        let ok = bindings["calculator"].invoke(serde_json::json!({})).await;
        assert_eq!(ok, r#"{"result":4}"#);

        let failed = bindings["web_search"].invoke(serde_json::json!({})).await;
        assert!(failed.contains("search backend unreachable"));
        assert!(failed.starts_with("Tool 'web_search' failed"));
    }

    struct OnePlugin;

    #[async_trait]
    impl PluginCatalog for OnePlugin {
        async fn installed(&self, _ctx: &ToolContext) -> Vec<InstalledPlugin> {
            vec![InstalledPlugin {
                slug: "sheets".into(),
                tools: vec![ToolSpec {
                    id: "append_row".into(),
                    name: "append_row".into(),
                    description: "Append a row to a sheet".into(),
                    parameters: serde_json::json!({"type": "object"}),
                }],
                executor: Arc::new(EchoExecutor),
            }]
        }
    }

    struct EchoExecutor;

    #[async_trait]
    impl ToolExecutor for EchoExecutor {
        async fn describe(&self, _tool_id: &str) -> Option<ToolSpec> {
            None
        }

        async fn execute(
            &self,
            tool_id: &str,
            _params: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolOutcome, ColloquyError> {
            Ok(ToolOutcome::ok(serde_json::json!({ "ran": tool_id })))
        }
    }

    #[tokio::test]
    async fn skill_kind_synthesizes_namespaced_ids() {
        let bindings = BindingBuilder::new()
            .with_plugins(Arc::new(OnePlugin))
            .build(&[ToolKind::Skill], &ToolContext::default())
            .await
            .unwrap();

        let binding = &bindings["sheets__append_row"];
        assert_eq!(binding.spec.id, "sheets__append_row");
        assert_eq!(binding.spec.name, "append_row");

        // The plugin's executor receives its own tool id, not the
        // namespaced one.
        let result = binding.invoke(serde_json::json!({})).await;
        assert_eq!(result, r#"{"ran":"append_row"}"#);
    }
}
