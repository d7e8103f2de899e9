//! Initial generation workflow.
//!
//! `start_generation` replaces the session with the default roster in
//! `streaming`, derives project metadata, then fans out one content call per
//! artifact. Each completion is folded into the store on its own, so a slow
//! role never holds back the others.

use crate::prompts;
use crate::retry::RetryPolicy;
use atelier_core::artifact::{Artifact, ArtifactKind, ArtifactPatch, ArtifactStatus};
use atelier_core::error::{AtelierError, Result};
use atelier_core::generation::GenerationClient;
use atelier_core::session::{ProjectMetadata, Session, SessionStore, transitions};
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A role seeded into every new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTemplate {
    pub title: &'static str,
    pub kind: ArtifactKind,
    /// Provisional reasoning shown while the role is generating
    pub reasoning: &'static str,
}

/// The roster every generation starts with, in display order.
pub fn default_roster() -> Vec<RoleTemplate> {
    vec![
        RoleTemplate {
            title: "System Architect",
            kind: ArtifactKind::Architecture,
            reasoning: "Mapping out the system structure",
        },
        RoleTemplate {
            title: "UI Designer",
            kind: ArtifactKind::Ui,
            reasoning: "Sketching the user interface",
        },
        RoleTemplate {
            title: "Logic Engineer",
            kind: ArtifactKind::Logic,
            reasoning: "Working out the data model and core flows",
        },
    ]
}

/// Counts in-flight workflows and decrements on drop.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs the initial generation workflow and single-artifact generation.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    client: Arc<dyn GenerationClient>,
    store: SessionStore,
    retry: RetryPolicy,
    in_flight: Arc<AtomicUsize>,
}

impl GenerationOrchestrator {
    pub fn new(client: Arc<dyn GenerationClient>, store: SessionStore, retry: RetryPolicy) -> Self {
        Self {
            client,
            store,
            retry,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// True while any initial generation workflow is running.
    pub fn is_generating(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Starts a new session for `prompt` and generates every default role.
    ///
    /// Returns the id of the session that was created. Individual role
    /// failures land on their artifacts as `error`; they do not fail the
    /// workflow.
    pub async fn start_generation(&self, prompt: &str) -> Result<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AtelierError::invalid_input("prompt must not be empty"));
        }

        let _guard = InFlightGuard::enter(&self.in_flight);

        let artifacts: Vec<Artifact> = default_roster()
            .into_iter()
            .map(|role| Artifact::pending(role.title, role.kind, role.reasoning))
            .collect();
        let artifact_ids: Vec<String> = artifacts.iter().map(|a| a.id.clone()).collect();
        let session = self.store.replace(transitions::create_session(prompt, artifacts));
        tracing::info!(
            session_id = %session.id,
            roles = artifact_ids.len(),
            "Generation started"
        );

        self.derive_project(&session).await;

        let tasks = artifact_ids
            .iter()
            .map(|artifact_id| self.generate_artifact(&session.id, artifact_id));
        join_all(tasks).await;

        tracing::info!(session_id = %session.id, "Generation finished");
        Ok(session.id.clone())
    }

    /// Asks for project metadata. Failures are logged and ignored.
    async fn derive_project(&self, session: &Session) {
        let prompt = match prompts::manifest_prompt(&session.prompt) {
            Ok(prompt) => prompt,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping project metadata");
                return;
            }
        };
        let schema = prompts::manifest_schema();

        let result = self
            .retry
            .run("project_metadata", || {
                self.client.generate_structured(&prompt, &schema)
            })
            .await;

        match result {
            Ok(value) => match serde_json::from_value::<ProjectMetadata>(value) {
                Ok(metadata) if !metadata.is_empty() => {
                    tracing::info!(session_id = %session.id, title = %metadata.title, "Project metadata derived");
                    self.store.set_project(&session.id, metadata);
                }
                Ok(_) => tracing::warn!(session_id = %session.id, "Project metadata was empty"),
                Err(err) => {
                    tracing::warn!(session_id = %session.id, error = %err, "Project metadata was malformed")
                }
            },
            Err(err) => {
                tracing::warn!(session_id = %session.id, error = %err, "Project metadata failed")
            }
        }
    }

    /// Generates content for one artifact of `session_id`.
    ///
    /// Reads the artifact's title and kind from the latest snapshot, calls the
    /// backend through the retry policy and records either a completed first
    /// variation or an error. Nothing is recorded when the session or the
    /// artifact is gone by then.
    pub async fn generate_artifact(&self, session_id: &str, artifact_id: &str) {
        let Some((prompt, project, title, kind)) = self.target(session_id, artifact_id) else {
            tracing::debug!(artifact_id = %artifact_id, "Artifact vanished before generation");
            return;
        };

        let result = match prompts::content_prompt(&prompt, project.as_ref(), &title, kind) {
            Ok(content_prompt) => {
                let instructions = prompts::role_instructions(kind);
                self.retry
                    .run(&title, || self.client.generate_text(&content_prompt, instructions))
                    .await
                    .map_err(AtelierError::from)
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(content) => {
                tracing::info!(artifact_id = %artifact_id, title = %title, "Artifact complete");
                self.store.complete_artifact(
                    session_id,
                    artifact_id,
                    content,
                    format!("{title} delivered the {kind} draft"),
                );
            }
            Err(err) => {
                tracing::error!(artifact_id = %artifact_id, title = %title, error = %err, "Artifact failed");
                self.store.update_artifact(
                    session_id,
                    artifact_id,
                    ArtifactPatch::status(ArtifactStatus::Error).with_reasoning(err.to_string()),
                );
            }
        }
    }

    fn target(
        &self,
        session_id: &str,
        artifact_id: &str,
    ) -> Option<(String, Option<ProjectMetadata>, String, ArtifactKind)> {
        let session = self.store.snapshot()?;
        if session.id != session_id {
            return None;
        }
        let artifact = session.artifact(artifact_id)?;
        Some((
            session.prompt.clone(),
            session.project.clone(),
            artifact.title.clone(),
            artifact.kind,
        ))
    }
}
