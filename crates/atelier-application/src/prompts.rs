//! Prompt templates.
//!
//! Every prompt sent to the generation backend is rendered here from a typed
//! request through `minijinja`, so the wording lives in one place and the
//! role instructions are a pure function of the artifact kind.

use atelier_core::artifact::ArtifactKind;
use atelier_core::error::{AtelierError, Result};
use atelier_core::session::ProjectMetadata;
use minijinja::Environment;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::OnceLock;

const UI_ROLE: &str = r#"You are a senior UI designer.
Produce a single self-contained HTML mockup for the requested project.
- Use inline CSS only; no external scripts, fonts or images.
- Favour a clean layout with realistic placeholder content.
- Output ONLY the HTML document, without markdown code fences."#;

const ARCHITECTURE_ROLE: &str = r#"You are a pragmatic system architect.
Describe the architecture of the requested project in markdown.
- Name the main components and how they communicate.
- Call out data storage, external services and deployment shape.
- Keep it concise; prefer lists and short sections over prose."#;

const LOGIC_ROLE: &str = r#"You are a meticulous logic engineer.
Specify the core data model and business logic of the requested project in markdown.
- List entities with their key fields.
- Describe the main flows step by step, including edge cases.
- Keep it implementation-agnostic."#;

const CONTENT_TEMPLATE: &str = r#"Project request:
{{ prompt }}
{% if project %}
Project: {{ project.title }}{% if project.stack %} (stack: {{ project.stack | join(", ") }}){% endif %}
{% endif %}
You are acting as the {{ title }} for this project. Produce your {{ kind }} deliverable now."#;

const REFINE_TEMPLATE: &str = r#"You previously produced the following {{ kind }} deliverable as the {{ title }}:

{{ content }}

Revise it according to these instructions:
{{ instructions }}

Return the complete revised deliverable, not a diff or a summary of changes."#;

const MANIFEST_TEMPLATE: &str = r#"Derive project metadata for this request:

{{ prompt }}

Respond with a short project title (2-5 words) and the recommended technology stack as a list of names."#;

const ROLE_TEMPLATE: &str = r#"A team is working on this project:

{{ prompt }}

Current team members:
{% for title in roster -%}
- {{ title }}
{% endfor %}
Propose ONE additional specialist whose perspective is missing from the team.
Give the role title, the kind of deliverable they produce (one of: ui, logic, architecture), and a one-sentence reasoning."#;

#[derive(Serialize)]
struct ContentRequest<'a> {
    prompt: &'a str,
    project: Option<&'a ProjectMetadata>,
    title: &'a str,
    kind: ArtifactKind,
}

#[derive(Serialize)]
struct RefineRequest<'a> {
    title: &'a str,
    kind: ArtifactKind,
    content: &'a str,
    instructions: &'a str,
}

#[derive(Serialize)]
struct ManifestRequest<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
struct RoleRequest<'a> {
    prompt: &'a str,
    roster: &'a [String],
}

fn environment() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        for (name, source) in [
            ("content", CONTENT_TEMPLATE),
            ("refine", REFINE_TEMPLATE),
            ("manifest", MANIFEST_TEMPLATE),
            ("role", ROLE_TEMPLATE),
        ] {
            if let Err(err) = env.add_template(name, source) {
                tracing::error!(template = name, error = %err, "Invalid prompt template");
            }
        }
        env
    })
}

fn render<S: Serialize>(name: &str, request: &S) -> Result<String> {
    let template = environment()
        .get_template(name)
        .map_err(|e| AtelierError::internal(format!("Prompt template '{name}' unavailable: {e}")))?;
    template
        .render(request)
        .map_err(|e| AtelierError::internal(format!("Failed to render prompt '{name}': {e}")))
}

/// System instructions for the role that produces artifacts of `kind`.
pub fn role_instructions(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Ui => UI_ROLE,
        ArtifactKind::Architecture => ARCHITECTURE_ROLE,
        ArtifactKind::Logic => LOGIC_ROLE,
    }
}

/// Prompt asking one role for its first deliverable.
pub fn content_prompt(
    prompt: &str,
    project: Option<&ProjectMetadata>,
    title: &str,
    kind: ArtifactKind,
) -> Result<String> {
    render(
        "content",
        &ContentRequest {
            prompt,
            project: project.filter(|p| !p.is_empty()),
            title,
            kind,
        },
    )
}

/// Prompt asking a role to revise its current deliverable.
pub fn refine_prompt(title: &str, kind: ArtifactKind, content: &str, instructions: &str) -> Result<String> {
    render(
        "refine",
        &RefineRequest {
            title,
            kind,
            content,
            instructions,
        },
    )
}

pub fn manifest_prompt(prompt: &str) -> Result<String> {
    render("manifest", &ManifestRequest { prompt })
}

pub fn role_prompt(prompt: &str, roster: &[String]) -> Result<String> {
    render("role", &RoleRequest { prompt, roster })
}

/// Response schema for project metadata.
pub fn manifest_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "stack": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["title", "stack"]
    })
}

/// Response schema for a new agent's role decision.
pub fn role_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "kind": { "type": "STRING", "enum": ["ui", "logic", "architecture"] },
            "reasoning": { "type": "STRING" }
        },
        "required": ["title", "kind", "reasoning"]
    })
}
