use anyhow::{Context, Result};
use atelier_application::Studio;
use atelier_core::artifact::ArtifactStatus;
use colored::Colorize;
use std::path::Path;

use super::render;

/// Runs a full generation, adds `agents` extra agents and writes the export.
pub async fn run(studio: Studio, prompt: &str, agents: usize, out: &Path) -> Result<()> {
    println!("{}", format!("Generating: {prompt}").bright_magenta());
    studio.start_generation(prompt).await?;

    for n in 0..agents {
        let added = studio
            .add_agent()
            .await
            .with_context(|| format!("Failed to add agent {}", n + 1))?;
        if let Some(id) = added {
            tracing::debug!(artifact_id = %id, "Agent added");
        }
    }

    let session = studio
        .snapshot()
        .context("Session disappeared before export")?;
    render::print_session(&session, None);

    let path = studio.export_to(out)?;
    println!("{}", format!("Exported to {}", path.display()).green());

    let failed = session
        .artifacts
        .iter()
        .filter(|a| a.status == ArtifactStatus::Error)
        .count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} artifacts failed", session.artifacts.len());
    }
    Ok(())
}
