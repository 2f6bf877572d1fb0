//! In-process `MemoryHooks` adapter: a bounded per-user fact store with
//! pre-turn prompt injection and post-turn fact capture. Useful for tests,
//! demos, and single-process deployments; persistent stores implement the
//! same trait elsewhere.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use colloquy_core::error::ColloquyError;
use colloquy_core::memory::{CaptureReport, MemoryHooks, MemoryInjection, TurnContext};

/// Marker agents use to flag a durable fact in their output.
const FACT_PREFIX: &str = "FACT:";

/// Per-user cap; oldest facts are dropped first.
const MAX_FACTS_PER_USER: usize = 100;

#[derive(Debug, Clone)]
struct FactRecord {
    content: String,
    created_at: DateTime<Utc>,
}

/// In-memory fact store keyed by user id.
#[derive(Clone, Default)]
pub struct InMemoryMemoryHooks {
    facts: Arc<RwLock<HashMap<String, Vec<FactRecord>>>>,
}

impl InMemoryMemoryHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Facts currently remembered for a user, oldest first.
    pub async fn facts_for(&self, user_id: &str) -> Vec<String> {
        let facts = self.facts.read().await;
        facts
            .get(user_id)
            .map(|records| records.iter().map(|r| r.content.clone()).collect())
            .unwrap_or_default()
    }

    /// Seed a fact directly, bypassing capture.
    pub async fn remember(&self, user_id: &str, fact: impl Into<String>) {
        let mut facts = self.facts.write().await;
        let records = facts.entry(user_id.to_string()).or_default();
        push_bounded(records, fact.into());
    }
}

fn push_bounded(records: &mut Vec<FactRecord>, content: String) {
    if records.iter().any(|r| r.content == content) {
        return;
    }
    records.push(FactRecord {
        content,
        created_at: Utc::now(),
    });
    if records.len() > MAX_FACTS_PER_USER {
        records.sort_by_key(|r| r.created_at);
        let excess = records.len() - MAX_FACTS_PER_USER;
        records.drain(..excess);
    }
}

/// Lines of the form `FACT: ...` anywhere in an output.
fn extract_facts(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix(FACT_PREFIX)
                .map(|fact| fact.trim().to_string())
        })
        .filter(|fact| !fact.is_empty())
        .collect()
}

#[async_trait]
impl MemoryHooks for InMemoryMemoryHooks {
    async fn before_turn(&self, ctx: &TurnContext) -> Result<MemoryInjection, ColloquyError> {
        let remembered = self.facts_for(&ctx.user_id).await;
        if remembered.is_empty() {
            return Ok(MemoryInjection {
                system_prompt: ctx.system_prompt.clone(),
                memories_found: false,
            });
        }

        debug!(user_id = %ctx.user_id, count = remembered.len(), "injecting remembered facts");
        let block = remembered
            .iter()
            .map(|fact| format!("- {fact}"))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(MemoryInjection {
            system_prompt: format!(
                "{}\n\nRemembered facts about this user:\n{block}",
                ctx.system_prompt
            ),
            memories_found: true,
        })
    }

    async fn after_turn(
        &self,
        ctx: &TurnContext,
        output: &str,
        _tokens_used: Option<u32>,
    ) -> Result<CaptureReport, ColloquyError> {
        let captured = extract_facts(output);
        if captured.is_empty() {
            return Ok(CaptureReport::default());
        }

        let mut facts = self.facts.write().await;
        let records = facts.entry(ctx.user_id.clone()).or_default();
        for fact in &captured {
            push_bounded(records, fact.clone());
        }

        debug!(user_id = %ctx.user_id, count = captured.len(), "captured facts");
        Ok(CaptureReport {
            captured: true,
            facts: captured,
        })
    }
}
