//! Command interface for rendering collaborators.
//!
//! `Studio` wires the store, orchestrator and controller together and is the
//! only type a front end needs: it exposes every user intent as a method and
//! session state as read-only snapshots.

use crate::controller::RefinementController;
use crate::orchestrator::GenerationOrchestrator;
use crate::retry::RetryPolicy;
use atelier_core::config::AtelierConfig;
use atelier_core::error::{AtelierError, Result};
use atelier_core::export::{self, ExportDocument};
use atelier_core::generation::GenerationClient;
use atelier_core::session::{Session, SessionSnapshot, SessionStore};
use atelier_interaction::GeminiApiAgent;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct Studio {
    store: SessionStore,
    orchestrator: GenerationOrchestrator,
    controller: RefinementController,
}

impl Studio {
    pub fn new(client: Arc<dyn GenerationClient>, retry: RetryPolicy) -> Self {
        let store = SessionStore::new();
        let orchestrator = GenerationOrchestrator::new(client.clone(), store.clone(), retry);
        let controller =
            RefinementController::new(client, store.clone(), retry, orchestrator.clone());
        Self {
            store,
            orchestrator,
            controller,
        }
    }

    /// Builds a studio backed by the Gemini API.
    pub fn from_config(config: &AtelierConfig) -> Self {
        let client = Arc::new(GeminiApiAgent::from_env(config));
        Self::new(client, config.retry.into())
    }

    // ============================================================================
    // Intents
    // ============================================================================

    /// Replaces the session and generates the default roster.
    pub async fn start_generation(&self, prompt: &str) -> Result<String> {
        self.orchestrator.start_generation(prompt).await
    }

    pub async fn refine_artifact(&self, artifact_id: &str, instructions: &str) -> Result<()> {
        self.controller.refine(artifact_id, instructions).await
    }

    /// Adds an agent; `None` means the session changed before it joined.
    pub async fn add_agent(&self) -> Result<Option<String>> {
        self.controller.add_agent().await
    }

    /// Selects a stored variation of an artifact.
    ///
    /// Returns `Ok(false)` when `index` is out of range; the artifact is left
    /// unchanged in that case.
    pub fn switch_variation(&self, artifact_id: &str, index: usize) -> Result<bool> {
        let session = self.current()?;
        if !session.contains_artifact(artifact_id) {
            return Err(AtelierError::not_found("Artifact", artifact_id));
        }
        Ok(self.store.select_variation(&session.id, artifact_id, index))
    }

    /// Removes an artifact. Removing an unknown id is not an error.
    pub fn remove_artifact(&self, artifact_id: &str) {
        if let Some(session_id) = self.store.current_session_id() {
            if self.store.remove_artifact(&session_id, artifact_id) {
                tracing::info!(artifact_id = %artifact_id, "Artifact removed");
            }
        }
    }

    /// Renders the current session as one markdown document.
    pub fn export_all(&self) -> Result<ExportDocument> {
        let session = self.current()?;
        Ok(export::export_session(&session))
    }

    /// Writes the export document into `dir` and returns the file path.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        let document = self.export_all()?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&document.file_name);
        std::fs::write(&path, document.content)?;
        tracing::info!(path = %path.display(), "Session exported");
        Ok(path)
    }

    /// Discards the current session. In-flight results for it are dropped.
    pub fn reset(&self) {
        self.store.reset();
    }

    // ============================================================================
    // State
    // ============================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.store.subscribe()
    }

    pub fn is_generating(&self) -> bool {
        self.orchestrator.is_generating()
    }

    pub fn is_refining(&self) -> bool {
        self.controller.is_refining()
    }

    fn current(&self) -> Result<Arc<Session>> {
        self.store
            .snapshot()
            .ok_or_else(|| AtelierError::not_found("Session", "current"))
    }
}
