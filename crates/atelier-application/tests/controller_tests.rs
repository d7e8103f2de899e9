mod support;

use atelier_application::Studio;
use atelier_core::artifact::{ArtifactKind, ArtifactStatus};
use atelier_core::generation::GenerationError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use support::{MockClient, default_structured, draft_for, is_role_prompt, studio};

/// Text handler that answers "v0", "v1", ... for the UI role.
fn versioned_ui() -> MockClient {
    let ui_calls = Arc::new(AtomicUsize::new(0));
    MockClient::new(
        move |_, system| {
            if system.contains("UI designer") {
                Ok(format!("v{}", ui_calls.fetch_add(1, Ordering::SeqCst)))
            } else {
                Ok(draft_for(system))
            }
        },
        default_structured,
    )
}

fn ui_id(studio: &Studio) -> String {
    studio
        .snapshot()
        .unwrap()
        .artifacts
        .iter()
        .find(|a| a.kind == ArtifactKind::Ui)
        .unwrap()
        .id
        .clone()
}

#[tokio::test]
async fn test_refine_appends_variation() {
    let client = Arc::new(versioned_ui());
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();
    let id = ui_id(&studio);

    studio.refine_artifact(&id, "make it darker").await.unwrap();

    let session = studio.snapshot().unwrap();
    let artifact = session.artifact(&id).unwrap();
    assert_eq!(artifact.variations, vec!["v0".to_string(), "v1".to_string()]);
    assert_eq!(artifact.current_variation_index, 1);
    assert_eq!(artifact.content, "v1");
    assert_eq!(artifact.status, ArtifactStatus::Complete);
    assert!(artifact.reasoning.as_deref().unwrap().contains("make it darker"));
    assert!(!studio.is_refining());

    // the refine prompt carries the previous content and the instructions
    let refine_prompt = client.prompts().last().cloned().unwrap();
    assert!(refine_prompt.contains("v0"));
    assert!(refine_prompt.contains("make it darker"));
}

#[tokio::test]
async fn test_refine_leaves_other_artifacts_alone() {
    let client = Arc::new(versioned_ui());
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();
    let before = studio.snapshot().unwrap();
    let id = ui_id(&studio);

    studio.refine_artifact(&id, "add a footer").await.unwrap();

    let after = studio.snapshot().unwrap();
    for (old, new) in before.artifacts.iter().zip(after.artifacts.iter()) {
        assert_eq!(old.id, new.id);
        if old.id != id {
            assert_eq!(old, new);
        }
    }
}

#[tokio::test]
async fn test_refine_failure_keeps_history() {
    let refining = Arc::new(AtomicUsize::new(0));
    let calls = refining.clone();
    let client = Arc::new(MockClient::new(
        move |prompt, system| {
            if prompt.contains("Revise it") {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GenerationError::api(500, "backend exploded"))
            } else {
                Ok(draft_for(system))
            }
        },
        default_structured,
    ));
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();
    let id = ui_id(&studio);

    let err = studio.refine_artifact(&id, "make it pop").await.unwrap_err();
    assert!(err.is_generation());
    assert_eq!(refining.load(Ordering::SeqCst), 1);

    let session = studio.snapshot().unwrap();
    let artifact = session.artifact(&id).unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Complete);
    assert_eq!(artifact.variations, vec!["<main>mockup</main>".to_string()]);
    assert_eq!(artifact.content, "<main>mockup</main>");
    assert!(artifact.reasoning.as_deref().unwrap().contains("backend exploded"));
    assert!(!studio.is_refining());
}

#[tokio::test]
async fn test_failed_refine_respects_variation_switched_meanwhile() {
    let ui_calls = Arc::new(AtomicUsize::new(0));
    let client = Arc::new(MockClient::new(
        move |prompt, system| {
            if prompt.contains("fail this pass") {
                Err(GenerationError::api(500, "backend exploded"))
            } else if system.contains("UI designer") {
                Ok(format!("v{}", ui_calls.fetch_add(1, Ordering::SeqCst)))
            } else {
                Ok(draft_for(system))
            }
        },
        default_structured,
    ));
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();
    let id = ui_id(&studio);
    studio.refine_artifact(&id, "second draft").await.unwrap();

    client.hold();
    let calls = client.text_calls();
    let pending = {
        let studio = studio.clone();
        let id = id.clone();
        tokio::spawn(async move { studio.refine_artifact(&id, "fail this pass").await })
    };
    client.wait_for_text_calls(calls + 1).await;

    assert!(studio.switch_variation(&id, 0).unwrap());
    client.release(1);
    assert!(pending.await.unwrap().unwrap_err().is_generation());

    let session = studio.snapshot().unwrap();
    let artifact = session.artifact(&id).unwrap();
    assert_eq!(artifact.variations, vec!["v0".to_string(), "v1".to_string()]);
    assert_eq!(artifact.current_variation_index, 0);
    assert_eq!(artifact.content, artifact.variations[artifact.current_variation_index]);
    assert_eq!(artifact.status, ArtifactStatus::Complete);
}

#[tokio::test]
async fn test_failed_refine_keeps_generation_that_finished_meanwhile() {
    let client = Arc::new(MockClient::new(
        |prompt, system| {
            if prompt.contains("Revise it") {
                Err(GenerationError::api(500, "backend exploded"))
            } else {
                Ok(draft_for(system))
            }
        },
        default_structured,
    ));
    client.hold();
    let studio = studio(client.clone());
    let mut rx = studio.subscribe();

    let generation = {
        let studio = studio.clone();
        tokio::spawn(async move { studio.start_generation("a landing page").await })
    };
    rx.wait_for(|s| s.is_some()).await.unwrap();
    client.wait_for_text_calls(3).await;
    let id = ui_id(&studio);

    let refine = {
        let studio = studio.clone();
        let id = id.clone();
        tokio::spawn(async move { studio.refine_artifact(&id, "make it pop").await })
    };
    client.wait_for_text_calls(4).await;

    // the three generation calls queued first and are released first
    client.release(3);
    generation.await.unwrap().unwrap();
    client.release(1);
    assert!(refine.await.unwrap().is_err());

    let session = studio.snapshot().unwrap();
    let artifact = session.artifact(&id).unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Complete);
    assert_eq!(artifact.variations, vec!["<main>mockup</main>".to_string()]);
    assert_eq!(artifact.current_variation_index, 0);
    assert_eq!(artifact.content, "<main>mockup</main>");
}

#[tokio::test]
async fn test_refine_unknown_artifact_is_not_found() {
    let client = Arc::new(MockClient::happy());
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();
    let calls = client.text_calls();

    let err = studio.refine_artifact("missing", "anything").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(client.text_calls(), calls);
}

#[tokio::test]
async fn test_refine_rejects_blank_instructions() {
    let client = Arc::new(MockClient::happy());
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();
    let id = ui_id(&studio);

    let err = studio.refine_artifact(&id, "  ").await.unwrap_err();
    assert!(matches!(err, atelier_core::AtelierError::InvalidInput(_)));
}

#[tokio::test]
async fn test_concurrent_refine_is_busy() {
    let client = Arc::new(versioned_ui());
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();
    let id = ui_id(&studio);

    client.hold();
    let mut rx = studio.subscribe();
    let first = {
        let studio = studio.clone();
        let id = id.clone();
        tokio::spawn(async move { studio.refine_artifact(&id, "first pass").await })
    };
    rx.wait_for(|s| {
        s.as_ref()
            .and_then(|s| s.artifact(&id))
            .is_some_and(|a| a.status == ArtifactStatus::Streaming)
    })
    .await
    .unwrap();
    assert!(studio.is_refining());

    let err = studio.refine_artifact(&id, "second pass").await.unwrap_err();
    assert!(err.is_busy());

    client.release(1);
    first.await.unwrap().unwrap();
    let session = studio.snapshot().unwrap();
    assert_eq!(session.artifact(&id).unwrap().variations.len(), 2);
    assert!(!studio.is_refining());
}

#[tokio::test]
async fn test_add_agent_appends_decided_role() {
    let client = Arc::new(MockClient::happy());
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();
    let before = studio.snapshot().unwrap();

    let new_id = studio.add_agent().await.unwrap().expect("agent should join");

    let session = studio.snapshot().unwrap();
    assert_eq!(session.artifacts.len(), 4);
    let added = session.artifacts.last().unwrap();
    assert_eq!(added.id, new_id);
    assert_eq!(added.title, "Security Auditor");
    assert_eq!(added.kind, ArtifactKind::Logic);
    assert_eq!(added.status, ArtifactStatus::Complete);
    assert_eq!(added.variations.len(), 1);
    assert_eq!(&session.artifacts[..3], &before.artifacts[..]);
}

#[tokio::test]
async fn test_add_agent_falls_back_on_malformed_decision() {
    let client = Arc::new(MockClient::new(
        |_, system| Ok(draft_for(system)),
        |prompt| {
            if is_role_prompt(prompt) {
                Ok(serde_json::json!({}))
            } else {
                default_structured(prompt)
            }
        },
    ));
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();

    studio.add_agent().await.unwrap();

    let session = studio.snapshot().unwrap();
    let added = session.artifacts.last().unwrap();
    assert_eq!(added.title, "Specialist Agent");
    assert_eq!(added.kind, ArtifactKind::Architecture);
    assert_eq!(added.status, ArtifactStatus::Complete);
}

#[tokio::test]
async fn test_add_agent_falls_back_when_decision_fails() {
    let client = Arc::new(MockClient::new(
        |_, system| Ok(draft_for(system)),
        |prompt| {
            if is_role_prompt(prompt) {
                Err(GenerationError::transport("connection reset"))
            } else {
                default_structured(prompt)
            }
        },
    ));
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();

    studio.add_agent().await.unwrap();

    let added = studio.snapshot().unwrap().artifacts.last().cloned().unwrap();
    assert_eq!(added.title, "Specialist Agent");
}

#[tokio::test]
async fn test_add_agent_roster_reaches_prompt() {
    let client = Arc::new(MockClient::new(
        |_, system| Ok(draft_for(system)),
        |prompt| {
            if is_role_prompt(prompt) {
                assert!(prompt.contains("- UI Designer"));
                assert!(prompt.contains("- Logic Engineer"));
            }
            default_structured(prompt)
        },
    ));
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();

    studio.add_agent().await.unwrap();
    assert_eq!(client.structured_calls(), 2);
}

#[tokio::test]
async fn test_add_agent_for_replaced_session_is_quiet() {
    let current: Arc<OnceLock<Studio>> = Arc::new(OnceLock::new());
    let handle = current.clone();
    let client = Arc::new(MockClient::new(
        |_, system| Ok(draft_for(system)),
        move |prompt| {
            if is_role_prompt(prompt) {
                // the user starts over while the role is being decided
                if let Some(studio) = handle.get() {
                    studio.reset();
                }
            }
            default_structured(prompt)
        },
    ));
    let studio = studio(client.clone());
    let _ = current.set(studio.clone());
    studio.start_generation("a landing page").await.unwrap();
    let calls = client.text_calls();

    let added = studio.add_agent().await.unwrap();

    assert_eq!(added, None);
    assert!(studio.snapshot().is_none());
    assert_eq!(client.text_calls(), calls);
}

#[tokio::test]
async fn test_add_agent_without_session_is_not_found() {
    let client = Arc::new(MockClient::happy());
    let studio = studio(client.clone());

    let err = studio.add_agent().await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(client.structured_calls(), 0);
}

#[tokio::test]
async fn test_add_agent_calls_serialize() {
    let client = Arc::new(MockClient::happy());
    let studio = studio(client.clone());
    studio.start_generation("a landing page").await.unwrap();

    let (a, b) = tokio::join!(studio.add_agent(), studio.add_agent());
    let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());
    assert_ne!(a, b);

    let session = studio.snapshot().unwrap();
    assert_eq!(session.artifacts.len(), 5);
    assert!(session.artifacts.iter().all(|a| a.status == ArtifactStatus::Complete));
}
