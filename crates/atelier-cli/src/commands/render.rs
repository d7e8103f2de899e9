//! Terminal rendering of session snapshots.

use atelier_core::artifact::{Artifact, ArtifactStatus};
use atelier_core::session::Session;
use colored::{ColoredString, Colorize};

pub fn status_label(status: ArtifactStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        ArtifactStatus::Idle => label.bright_black(),
        ArtifactStatus::Streaming => label.yellow(),
        ArtifactStatus::Complete => label.green(),
        ArtifactStatus::Error => label.red(),
    }
}

/// One line per artifact: number, title, kind, status, variation position.
pub fn summary(session: &Session, focused: Option<&str>) -> Vec<String> {
    session
        .artifacts
        .iter()
        .enumerate()
        .map(|(n, artifact)| summary_line(n + 1, artifact, focused == Some(artifact.id.as_str())))
        .collect()
}

fn summary_line(number: usize, artifact: &Artifact, focused: bool) -> String {
    let marker = if focused { "*" } else { " " };
    let variations = if artifact.variations.is_empty() {
        String::new()
    } else {
        format!(
            " v{}/{}",
            artifact.current_variation_index + 1,
            artifact.variations.len()
        )
    };
    format!(
        "{marker}{number:>2}. {} [{}] {}{}",
        artifact.title.bold(),
        artifact.kind,
        status_label(artifact.status),
        variations.bright_black()
    )
}

/// Prints the project header and the artifact summary.
pub fn print_session(session: &Session, focused: Option<&str>) {
    match &session.project {
        Some(project) if !project.is_empty() => {
            println!("{}", project.title.bright_magenta().bold());
            if !project.stack.is_empty() {
                println!("{}", format!("stack: {}", project.stack.join(", ")).bright_black());
            }
        }
        _ => println!("{}", session.prompt.bright_magenta()),
    }
    for line in summary(session, focused) {
        println!("{line}");
    }
}

/// Prints one artifact in full.
pub fn print_artifact(artifact: &Artifact) {
    println!(
        "{} [{}] {}",
        format!("== {} ==", artifact.title).bright_cyan().bold(),
        artifact.kind,
        status_label(artifact.status)
    );
    if let Some(reasoning) = &artifact.reasoning {
        println!("{}", reasoning.italic().bright_black());
    }
    println!();
    for line in artifact.content.lines() {
        println!("{line}");
    }
}
