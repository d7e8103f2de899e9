//! Refinement and expansion of an existing session.

use crate::orchestrator::GenerationOrchestrator;
use crate::prompts;
use crate::retry::RetryPolicy;
use atelier_core::artifact::{Artifact, ArtifactKind, ArtifactPatch, ArtifactStatus};
use atelier_core::error::{AtelierError, Result};
use atelier_core::generation::GenerationClient;
use atelier_core::session::SessionStore;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

pub const FALLBACK_AGENT_TITLE: &str = "Specialist Agent";
pub const FALLBACK_AGENT_KIND: ArtifactKind = ArtifactKind::Architecture;
const FALLBACK_AGENT_REASONING: &str = "Adding a specialist perspective to the team";

/// Role picked for a new agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDecision {
    pub title: String,
    pub kind: ArtifactKind,
    pub reasoning: String,
}

impl Default for RoleDecision {
    fn default() -> Self {
        Self {
            title: FALLBACK_AGENT_TITLE.to_string(),
            kind: FALLBACK_AGENT_KIND,
            reasoning: FALLBACK_AGENT_REASONING.to_string(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawRoleDecision {
    title: Option<String>,
    kind: Option<String>,
    reasoning: Option<String>,
}

impl RoleDecision {
    /// Reads a decision from structured output, falling back field by field.
    pub fn from_value(value: serde_json::Value) -> Self {
        let raw: RawRoleDecision = serde_json::from_value(value).unwrap_or_default();
        let fallback = Self::default();
        Self {
            title: non_blank(raw.title).unwrap_or(fallback.title),
            kind: raw
                .kind
                .and_then(|k| ArtifactKind::from_str(k.trim()).ok())
                .unwrap_or(fallback.kind),
            reasoning: non_blank(raw.reasoning).unwrap_or(fallback.reasoning),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Clears the refining flag on drop.
struct RefiningGuard(Arc<AtomicBool>);

impl Drop for RefiningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Refines existing artifacts and adds new agents to the current session.
#[derive(Clone)]
pub struct RefinementController {
    client: Arc<dyn GenerationClient>,
    store: SessionStore,
    retry: RetryPolicy,
    orchestrator: GenerationOrchestrator,
    refining: Arc<AtomicBool>,
    expansion: Arc<Mutex<()>>,
}

impl RefinementController {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        store: SessionStore,
        retry: RetryPolicy,
        orchestrator: GenerationOrchestrator,
    ) -> Self {
        Self {
            client,
            store,
            retry,
            orchestrator,
            refining: Arc::new(AtomicBool::new(false)),
            expansion: Arc::new(Mutex::new(())),
        }
    }

    pub fn is_refining(&self) -> bool {
        self.refining.load(Ordering::SeqCst)
    }

    /// Regenerates `artifact_id` from `instructions`, keeping its history.
    ///
    /// On success a new variation is appended and selected. On failure the
    /// content and variations stay as they are, the failure is recorded in
    /// the reasoning, and the error is returned.
    pub async fn refine(&self, artifact_id: &str, instructions: &str) -> Result<()> {
        let instructions = instructions.trim();
        if instructions.is_empty() {
            return Err(AtelierError::invalid_input("refine instructions must not be empty"));
        }

        let session = self
            .store
            .snapshot()
            .ok_or_else(|| AtelierError::not_found("Session", "current"))?;
        let artifact = session
            .artifact(artifact_id)
            .cloned()
            .ok_or_else(|| AtelierError::not_found("Artifact", artifact_id))?;

        let prompt = prompts::refine_prompt(&artifact.title, artifact.kind, &artifact.content, instructions)?;
        let system = prompts::role_instructions(artifact.kind);

        if self
            .refining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AtelierError::busy("a refinement is already in progress"));
        }
        let _guard = RefiningGuard(self.refining.clone());

        tracing::info!(artifact_id = %artifact_id, title = %artifact.title, "Refining artifact");
        self.store.update_artifact(
            &session.id,
            artifact_id,
            ArtifactPatch::status(ArtifactStatus::Streaming)
                .with_reasoning(format!("Refining: {instructions}")),
        );

        let result = self
            .retry
            .run("refine", || self.client.generate_text(&prompt, system))
            .await;

        match result {
            Ok(content) => {
                self.store.complete_artifact(
                    &session.id,
                    artifact_id,
                    content,
                    format!("Refined: {instructions}"),
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(artifact_id = %artifact_id, error = %err, "Refinement failed");
                self.store.fail_refinement(
                    &session.id,
                    artifact_id,
                    format!("Refinement failed: {err}"),
                );
                Err(err.into())
            }
        }
    }

    /// Adds one agent to the current session and generates its deliverable.
    ///
    /// Returns the new artifact's id, or `None` when the session was replaced
    /// or reset while the role was being decided.
    pub async fn add_agent(&self) -> Result<Option<String>> {
        let _serial = self.expansion.lock().await;

        let session = self
            .store
            .snapshot()
            .ok_or_else(|| AtelierError::not_found("Session", "current"))?;

        let decision = self.decide_role(&session.prompt, &session.roster()).await;
        tracing::info!(
            session_id = %session.id,
            title = %decision.title,
            kind = %decision.kind,
            "Adding agent"
        );

        let artifact = Artifact::pending(decision.title, decision.kind, decision.reasoning);
        let artifact_id = artifact.id.clone();
        if !self.store.append_artifact(&session.id, artifact) {
            tracing::debug!(session_id = %session.id, "Session replaced before the agent joined");
            return Ok(None);
        }

        self.orchestrator
            .generate_artifact(&session.id, &artifact_id)
            .await;
        Ok(Some(artifact_id))
    }

    async fn decide_role(&self, prompt: &str, roster: &[String]) -> RoleDecision {
        let role_prompt = match prompts::role_prompt(prompt, roster) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(error = %err, "Using fallback role");
                return RoleDecision::default();
            }
        };
        let schema = prompts::role_schema();

        match self
            .retry
            .run("role_decision", || {
                self.client.generate_structured(&role_prompt, &schema)
            })
            .await
        {
            Ok(value) => RoleDecision::from_value(value),
            Err(err) => {
                tracing::warn!(error = %err, "Role decision failed; using fallback role");
                RoleDecision::default()
            }
        }
    }
}
