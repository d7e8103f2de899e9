//! Pure session transitions.
//!
//! Every function takes the prior session by reference and returns a new
//! session value. Nothing here mutates shared state; the store decides
//! when a transition is applied.
//!
//! Transitions that target an artifact id that does not exist return an
//! unchanged copy of the session.

use super::model::{ProjectMetadata, Session};
use crate::artifact::{Artifact, ArtifactPatch};
use chrono::Utc;
use uuid::Uuid;

/// Creates a fresh session for `prompt` seeded with `initial_artifacts`.
pub fn create_session(prompt: impl Into<String>, initial_artifacts: Vec<Artifact>) -> Session {
    Session {
        id: Uuid::new_v4().to_string(),
        prompt: prompt.into(),
        artifacts: initial_artifacts,
        timestamp: Utc::now(),
        project: None,
    }
}

fn map_artifact<F>(session: &Session, artifact_id: &str, f: F) -> Session
where
    F: FnOnce(&mut Artifact),
{
    let mut next = session.clone();
    if let Some(artifact) = next.artifacts.iter_mut().find(|a| a.id == artifact_id) {
        f(artifact);
    }
    next
}

/// Applies a partial update to one artifact.
pub fn update_artifact(session: &Session, artifact_id: &str, patch: ArtifactPatch) -> Session {
    map_artifact(session, artifact_id, |artifact| patch.apply_to(artifact))
}

/// Appends an artifact at the end of the display order.
pub fn append_artifact(session: &Session, artifact: Artifact) -> Session {
    let mut next = session.clone();
    next.artifacts.push(artifact);
    next
}

/// Removes an artifact. Removing an unknown id is a no-op.
pub fn remove_artifact(session: &Session, artifact_id: &str) -> Session {
    let mut next = session.clone();
    next.artifacts.retain(|a| a.id != artifact_id);
    next
}

/// Appends a new variation and makes it the active content.
pub fn append_variation(session: &Session, artifact_id: &str, content: impl Into<String>) -> Session {
    let content = content.into();
    map_artifact(session, artifact_id, |artifact| {
        artifact.variations.push(content.clone());
        artifact.current_variation_index = artifact.variations.len() - 1;
        artifact.content = content;
    })
}

/// Selects an existing variation as the active content.
///
/// An out-of-range index leaves the artifact untouched.
pub fn select_variation(session: &Session, artifact_id: &str, index: usize) -> Session {
    map_artifact(session, artifact_id, |artifact| {
        if let Some(content) = artifact.variations.get(index) {
            artifact.content = content.clone();
            artifact.current_variation_index = index;
        }
    })
}

/// Attaches project metadata to the session.
pub fn set_project(session: &Session, metadata: ProjectMetadata) -> Session {
    let mut next = session.clone();
    next.project = Some(metadata);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactKind, ArtifactStatus};

    fn session_with(titles: &[&str]) -> Session {
        let artifacts = titles
            .iter()
            .map(|t| Artifact::pending(*t, ArtifactKind::Architecture, "pending"))
            .collect();
        create_session("Build a todo app", artifacts)
    }

    #[test]
    fn test_create_session_keeps_order() {
        let session = session_with(&["A", "B", "C"]);
        assert_eq!(session.roster(), vec!["A", "B", "C"]);
        assert_eq!(session.prompt, "Build a todo app");
        assert!(session.project.is_none());
    }

    #[test]
    fn test_append_variation_grows_by_one_and_tracks_last() {
        let mut session = session_with(&["A"]);
        let id = session.artifacts[0].id.clone();

        for n in 0..5 {
            let before = session.artifact(&id).unwrap().variations.len();
            session = append_variation(&session, &id, format!("v{n}"));
            let artifact = session.artifact(&id).unwrap();
            assert_eq!(artifact.variations.len(), before + 1);
            assert_eq!(artifact.current_variation_index, artifact.variations.len() - 1);
            assert_eq!(artifact.content, format!("v{n}"));
        }
    }

    #[test]
    fn test_select_variation_in_range() {
        let mut session = session_with(&["A"]);
        let id = session.artifacts[0].id.clone();
        for v in ["v0", "v1", "v2"] {
            session = append_variation(&session, &id, v);
        }

        for idx in 0..3 {
            session = select_variation(&session, &id, idx);
            let artifact = session.artifact(&id).unwrap();
            assert_eq!(artifact.content, artifact.variations[idx]);
            assert_eq!(artifact.current_variation_index, idx);
        }
    }

    #[test]
    fn test_select_variation_out_of_range_is_ignored() {
        let mut session = session_with(&["A"]);
        let id = session.artifacts[0].id.clone();
        session = append_variation(&session, &id, "v0");
        session = append_variation(&session, &id, "v1");

        let next = select_variation(&session, &id, 7);
        let artifact = next.artifact(&id).unwrap();
        assert_eq!(artifact.content, "v1");
        assert_eq!(artifact.current_variation_index, 1);
    }

    #[test]
    fn test_select_variation_on_empty_history() {
        let session = session_with(&["A"]);
        let id = session.artifacts[0].id.clone();
        let next = select_variation(&session, &id, 0);
        assert_eq!(next, session);
    }

    #[test]
    fn test_remove_artifact_is_idempotent() {
        let session = session_with(&["A", "B", "C"]);
        let id = session.artifacts[1].id.clone();

        let once = remove_artifact(&session, &id);
        let twice = remove_artifact(&once, &id);
        assert_eq!(once.roster(), vec!["A", "C"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_update_artifact_leaves_siblings_alone() {
        let session = session_with(&["A", "B"]);
        let id = session.artifacts[0].id.clone();
        let next = update_artifact(
            &session,
            &id,
            ArtifactPatch::status(ArtifactStatus::Complete).with_reasoning("done"),
        );
        assert_eq!(next.artifacts[0].status, ArtifactStatus::Complete);
        assert_eq!(next.artifacts[0].reasoning.as_deref(), Some("done"));
        assert_eq!(next.artifacts[1], session.artifacts[1]);
        // prior value is untouched
        assert_eq!(session.artifacts[0].status, ArtifactStatus::Streaming);
    }

    #[test]
    fn test_unknown_artifact_is_noop() {
        let session = session_with(&["A"]);
        let next = append_variation(&session, "missing", "v0");
        assert_eq!(next, session);
        let next = update_artifact(&session, "missing", ArtifactPatch::status(ArtifactStatus::Error));
        assert_eq!(next, session);
    }

    #[test]
    fn test_append_artifact_goes_last() {
        let session = session_with(&["A"]);
        let next = append_artifact(
            &session,
            Artifact::pending("Security Auditor", ArtifactKind::Logic, "pending"),
        );
        assert_eq!(next.roster(), vec!["A", "Security Auditor"]);
    }

    #[test]
    fn test_set_project() {
        let session = session_with(&[]);
        let next = set_project(
            &session,
            ProjectMetadata {
                title: "Todo Pro".into(),
                stack: vec!["Rust".into()],
            },
        );
        assert_eq!(next.project_title(), Some("Todo Pro"));
    }
}
