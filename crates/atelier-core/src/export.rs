//! One-way export of a session to a single markdown document.

use crate::session::Session;
use once_cell::sync::Lazy;
use regex::Regex;

/// File name used when the session has no usable project title.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "project-artifacts.md";

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"));

/// A rendered export, ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub file_name: String,
    pub content: String,
}

/// Renders every artifact as a `## <title>` section, in display order.
pub fn render_document(session: &Session) -> String {
    session
        .artifacts
        .iter()
        .map(|artifact| format!("## {}\n\n{}\n", artifact.title, artifact.content.trim_end()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercase-hyphenated form of `title`, or `None` if nothing survives.
pub fn slugify(title: &str) -> Option<String> {
    let lower = title.to_lowercase();
    let slug = NON_SLUG_CHARS.replace_all(&lower, "-");
    let slug = slug.trim_matches('-');
    (!slug.is_empty()).then(|| slug.to_string())
}

/// Export file name derived from the project title.
pub fn file_name_for(session: &Session) -> String {
    session
        .project_title()
        .and_then(slugify)
        .map(|slug| format!("{slug}.md"))
        .unwrap_or_else(|| DEFAULT_EXPORT_FILE_NAME.to_string())
}

/// Builds the full export for a session.
pub fn export_session(session: &Session) -> ExportDocument {
    ExportDocument {
        file_name: file_name_for(session),
        content: render_document(session),
    }
}
