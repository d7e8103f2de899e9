//! Artifact domain model.
//!
//! An artifact is one unit of generated content (architecture notes, a UI
//! mockup, a logic spec) together with the history of its variations.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Classification of an artifact.
///
/// The kind selects the role instructions used for generation and tells the
/// rendering side whether `content` is markup (`Ui`) or prose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ArtifactKind {
    Ui,
    Logic,
    Architecture,
}

/// Lifecycle state of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactStatus {
    #[default]
    Idle,
    Streaming,
    Complete,
    Error,
}

impl ArtifactStatus {
    /// True once the artifact has reached `Complete` or `Error`.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// A unit of generated content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique identifier (UUID format), immutable
    pub id: String,
    /// Human label, usually the role name
    pub title: String,
    pub kind: ArtifactKind,
    /// Active content; mirrors `variations[current_variation_index]`
    pub content: String,
    pub status: ArtifactStatus,
    /// Short rationale shown alongside the content
    pub reasoning: Option<String>,
    /// Append-only history of generated content
    pub variations: Vec<String>,
    pub current_variation_index: usize,
}

impl Artifact {
    /// Creates an artifact that is about to be generated.
    ///
    /// The artifact starts in `Streaming` with empty content so a renderer has
    /// something to show before the first response lands.
    pub fn pending(title: impl Into<String>, kind: ArtifactKind, reasoning: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            kind,
            content: String::new(),
            status: ArtifactStatus::Streaming,
            reasoning: Some(reasoning.into()),
            variations: Vec::new(),
            current_variation_index: 0,
        }
    }

    /// The currently selected variation, if any content has been generated.
    pub fn current_variation(&self) -> Option<&str> {
        self.variations
            .get(self.current_variation_index)
            .map(String::as_str)
    }
}

/// Partial update for an artifact's mutable fields.
///
/// `None` leaves the field untouched. Variations are not patchable here; use
/// the dedicated variation transitions so the index invariant holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactPatch {
    pub content: Option<String>,
    pub status: Option<ArtifactStatus>,
    pub reasoning: Option<String>,
}

impl ArtifactPatch {
    pub fn status(status: ArtifactStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub(crate) fn apply_to(self, artifact: &mut Artifact) {
        if let Some(content) = self.content {
            artifact.content = content;
        }
        if let Some(status) = self.status {
            artifact.status = status;
        }
        if let Some(reasoning) = self.reasoning {
            artifact.reasoning = Some(reasoning);
        }
    }
}
