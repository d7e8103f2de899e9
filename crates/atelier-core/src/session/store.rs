//! Session state store.
//!
//! `SessionStore` is the single owner of the current session. It keeps the
//! value in a `tokio::sync::watch` channel so renderers can subscribe to
//! snapshots, and applies every mutation as a read-modify-write against the
//! latest value while holding the channel's lock.
//!
//! Session-scoped operations take the id of the session they were issued
//! for. When that session has since been replaced or reset, or the target
//! artifact no longer exists, the operation is a silent no-op and returns
//! `false`.

use super::model::{ProjectMetadata, Session};
use super::transitions;
use crate::artifact::{Artifact, ArtifactPatch, ArtifactStatus};
use std::sync::Arc;
use tokio::sync::watch;

/// Read-only view handed to renderers.
pub type SessionSnapshot = Option<Arc<Session>>;

/// Owner of the current session value.
#[derive(Clone)]
pub struct SessionStore {
    sender: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionStore {
    /// Creates an empty store (no session).
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Returns the latest snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.sender.borrow().clone()
    }

    /// Subscribes to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.sender.subscribe()
    }

    /// Id of the current session, if any.
    pub fn current_session_id(&self) -> Option<String> {
        self.sender.borrow().as_ref().map(|s| s.id.clone())
    }

    /// Replaces the current session wholesale.
    pub fn replace(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        tracing::debug!(session_id = %session.id, "[SessionStore] session replaced");
        self.sender.send_replace(Some(session.clone()));
        session
    }

    /// Discards the current session.
    pub fn reset(&self) {
        tracing::debug!("[SessionStore] session reset");
        self.sender.send_replace(None);
    }

    /// Applies `transition` to the current session if its id matches.
    ///
    /// Returns `true` when the transition was applied.
    pub fn update<F>(&self, session_id: &str, transition: F) -> bool
    where
        F: FnOnce(&Session) -> Session,
    {
        self.apply_if(session_id, |_| true, transition)
    }

    /// Applies `transition` only if the session still holds `artifact_id`.
    fn update_artifact_with<F>(&self, session_id: &str, artifact_id: &str, transition: F) -> bool
    where
        F: FnOnce(&Session) -> Session,
    {
        self.apply_if(session_id, |s| s.contains_artifact(artifact_id), transition)
    }

    fn apply_if<G, F>(&self, session_id: &str, guard: G, transition: F) -> bool
    where
        G: FnOnce(&Session) -> bool,
        F: FnOnce(&Session) -> Session,
    {
        self.sender.send_if_modified(|slot| {
            let next = match slot.as_deref() {
                Some(current) if current.id == session_id && guard(current) => transition(current),
                _ => {
                    tracing::debug!(
                        session_id = %session_id,
                        "[SessionStore] dropping update for stale target"
                    );
                    return false;
                }
            };
            *slot = Some(Arc::new(next));
            true
        })
    }

    /// Applies a partial update to an artifact.
    pub fn update_artifact(&self, session_id: &str, artifact_id: &str, patch: ArtifactPatch) -> bool {
        self.update_artifact_with(session_id, artifact_id, |s| {
            transitions::update_artifact(s, artifact_id, patch)
        })
    }

    /// Appends an artifact to the session.
    pub fn append_artifact(&self, session_id: &str, artifact: Artifact) -> bool {
        self.update(session_id, |s| transitions::append_artifact(s, artifact))
    }

    /// Removes an artifact; repeated calls are harmless.
    pub fn remove_artifact(&self, session_id: &str, artifact_id: &str) -> bool {
        self.update_artifact_with(session_id, artifact_id, |s| {
            transitions::remove_artifact(s, artifact_id)
        })
    }

    /// Appends a variation and makes it current.
    pub fn append_variation(&self, session_id: &str, artifact_id: &str, content: String) -> bool {
        self.update_artifact_with(session_id, artifact_id, |s| {
            transitions::append_variation(s, artifact_id, content)
        })
    }

    /// Selects an existing variation. Returns `false` for an out-of-range index.
    pub fn select_variation(&self, session_id: &str, artifact_id: &str, index: usize) -> bool {
        self.apply_if(
            session_id,
            |s| {
                s.artifact(artifact_id)
                    .is_some_and(|a| index < a.variations.len())
            },
            |s| transitions::select_variation(s, artifact_id, index),
        )
    }

    /// Records a successful generation in one atomic step.
    ///
    /// Appends `content` as a new variation, marks the artifact complete and
    /// sets its reasoning.
    pub fn complete_artifact(
        &self,
        session_id: &str,
        artifact_id: &str,
        content: String,
        reasoning: String,
    ) -> bool {
        self.update_artifact_with(session_id, artifact_id, |s| {
            let next = transitions::append_variation(s, artifact_id, content);
            transitions::update_artifact(
                &next,
                artifact_id,
                ArtifactPatch::status(ArtifactStatus::Complete).with_reasoning(reasoning),
            )
        })
    }

    /// Settles an artifact after a failed refinement.
    ///
    /// Content and variations are left as they are now. The status becomes
    /// `Complete` when the artifact has any variation and `Error` otherwise,
    /// judged against the latest state.
    pub fn fail_refinement(&self, session_id: &str, artifact_id: &str, reasoning: String) -> bool {
        self.update_artifact_with(session_id, artifact_id, |s| {
            let status = match s.artifact(artifact_id) {
                Some(a) if !a.variations.is_empty() => ArtifactStatus::Complete,
                _ => ArtifactStatus::Error,
            };
            transitions::update_artifact(
                s,
                artifact_id,
                ArtifactPatch::status(status).with_reasoning(reasoning),
            )
        })
    }

    /// Attaches project metadata.
    pub fn set_project(&self, session_id: &str, metadata: ProjectMetadata) -> bool {
        self.update(session_id, |s| transitions::set_project(s, metadata))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
