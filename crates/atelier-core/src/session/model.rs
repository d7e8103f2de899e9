//! Session domain model.
//!
//! This module contains the core Session entity that represents
//! one user-initiated project in the application's domain layer.

use crate::artifact::Artifact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project-level metadata derived from the initial prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Short project title, used for export file names
    #[serde(default)]
    pub title: String,
    /// Suggested technology stack
    #[serde(default)]
    pub stack: Vec<String>,
}

impl ProjectMetadata {
    /// True when the backend produced nothing worth keeping.
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.stack.is_empty()
    }
}

/// Represents the working unit for one project.
///
/// A session contains:
/// - The most recent top-level prompt
/// - The ordered artifact list (insertion order is display order)
/// - Optional project metadata
/// - The creation timestamp
///
/// Sessions are treated as immutable values: every change produces a new
/// `Session` through [`super::transitions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    pub prompt: String,
    pub artifacts: Vec<Artifact>,
    /// Creation time, immutable
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub project: Option<ProjectMetadata>,
}

impl Session {
    /// Looks up an artifact by id.
    pub fn artifact(&self, artifact_id: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id == artifact_id)
    }

    /// Returns true if an artifact with this id is part of the session.
    pub fn contains_artifact(&self, artifact_id: &str) -> bool {
        self.artifact(artifact_id).is_some()
    }

    /// Titles of all artifacts, in display order.
    pub fn roster(&self) -> Vec<String> {
        self.artifacts.iter().map(|a| a.title.clone()).collect()
    }

    /// Project title when one was generated.
    pub fn project_title(&self) -> Option<&str> {
        self.project
            .as_ref()
            .map(|p| p.title.as_str())
            .filter(|t| !t.trim().is_empty())
    }
}
