//! Interactive studio.
//!
//! Plain text starts a generation; slash commands act on the current session.
//! Long-running intents run as spawned tasks so the prompt stays responsive,
//! and a watcher task prints artifact status transitions as they land.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use atelier_application::Studio;
use atelier_core::artifact::ArtifactStatus;
use atelier_core::session::SessionSnapshot;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::watch;

use super::render;

const COMMANDS: &[&str] = &[
    "/refine", "/add", "/switch", "/remove", "/focus", "/show", "/export", "/reset", "/help",
    "/quit",
];

/// A parsed line of REPL input. Artifact numbers are 1-based display positions.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Generate(String),
    Refine { number: usize, instructions: String },
    Add,
    Switch { number: usize, variation: usize },
    Remove(usize),
    Focus(usize),
    Show,
    Export(Option<PathBuf>),
    Reset,
    Help,
    Quit,
}

fn parse_number(value: Option<&str>, what: &str) -> Result<usize, String> {
    let value = value.ok_or_else(|| format!("missing {what}"))?;
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("{what} must be a positive number, got '{value}'")),
    }
}

impl ReplCommand {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if !line.starts_with('/') {
            return Ok(Self::Generate(line.to_string()));
        }

        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.split_whitespace();

        match name {
            "/refine" => {
                let number = parse_number(args.next(), "artifact number")?;
                let instructions = rest
                    .split_once(char::is_whitespace)
                    .map(|(_, text)| text.trim().to_string())
                    .unwrap_or_default();
                if instructions.is_empty() {
                    return Err("usage: /refine <n> <instructions>".to_string());
                }
                Ok(Self::Refine {
                    number,
                    instructions,
                })
            }
            "/add" => Ok(Self::Add),
            "/switch" => Ok(Self::Switch {
                number: parse_number(args.next(), "artifact number")?,
                variation: parse_number(args.next(), "variation number")?,
            }),
            "/remove" => Ok(Self::Remove(parse_number(args.next(), "artifact number")?)),
            "/focus" => Ok(Self::Focus(parse_number(args.next(), "artifact number")?)),
            "/show" => Ok(Self::Show),
            "/export" => Ok(Self::Export((!rest.is_empty()).then(|| PathBuf::from(rest)))),
            "/reset" => Ok(Self::Reset),
            "/help" => Ok(Self::Help),
            "/quit" | "/exit" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct StudioHelper;

impl Helper for StudioHelper {}

impl Completer for StudioHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return Ok((0, vec![]));
        }
        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for StudioHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for StudioHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.starts_with('/') && !line.contains(' ') {
            COMMANDS
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for StudioHelper {}

fn print_help() {
    let lines = [
        ("<text>", "start a new generation for the described project"),
        ("/refine <n> <text>", "revise artifact n with instructions"),
        ("/add", "add an agent with a new perspective"),
        ("/switch <n> <v>", "show variation v of artifact n"),
        ("/remove <n>", "remove artifact n"),
        ("/focus <n>", "focus artifact n (again to unfocus)"),
        ("/show", "show the focused artifact, or the summary"),
        ("/export [dir]", "write all artifacts to a markdown file"),
        ("/reset", "discard the session"),
        ("/quit", "exit"),
    ];
    for (command, description) in lines {
        println!("  {:<20} {}", command.bright_cyan(), description.bright_black());
    }
}

/// Watches snapshots and prints artifact status transitions.
async fn watch_transitions(mut rx: watch::Receiver<SessionSnapshot>) {
    let mut session_id: Option<String> = None;
    let mut statuses: HashMap<String, ArtifactStatus> = HashMap::new();

    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        let Some(session) = snapshot else {
            if session_id.take().is_some() {
                println!("{}", "Session discarded.".bright_black());
            }
            statuses.clear();
            continue;
        };

        if session_id.as_deref() != Some(session.id.as_str()) {
            session_id = Some(session.id.clone());
            statuses.clear();
            println!("{}", format!("New session: {}", session.prompt).bright_magenta());
        }

        for artifact in &session.artifacts {
            let previous = statuses.insert(artifact.id.clone(), artifact.status);
            if previous == Some(artifact.status) {
                continue;
            }
            let line = match artifact.status {
                ArtifactStatus::Error => format!(
                    "{}: {}",
                    artifact.title,
                    artifact.reasoning.as_deref().unwrap_or("failed")
                ),
                _ => artifact.title.clone(),
            };
            println!("[{}] {}", render::status_label(artifact.status), line);
        }
        statuses.retain(|id, _| session.contains_artifact(id));
    }
}

/// Id of the artifact shown at 1-based position `number`.
fn artifact_id(studio: &Studio, number: usize) -> Option<String> {
    let session = studio.snapshot()?;
    let artifact = session.artifacts.get(number.checked_sub(1)?)?;
    Some(artifact.id.clone())
}

fn report<T>(result: atelier_core::error::Result<T>, what: &str) {
    if let Err(err) = result {
        eprintln!("{}", format!("{what} failed: {err}").red());
    }
}

/// Runs the interactive studio until `/quit` or EOF.
pub async fn run(studio: Studio) -> Result<()> {
    let watcher = tokio::spawn(watch_transitions(studio.subscribe()));

    let mut rl = Editor::new()?;
    rl.set_helper(Some(StudioHelper));

    println!("{}", "=== Atelier ===".bright_magenta().bold());
    println!(
        "{}",
        "Describe a project to start, or type /help for commands.".bright_black()
    );
    println!();

    let mut focused: Option<String> = None;

    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(trimmed);

        let command = match ReplCommand::parse(trimmed) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message.yellow());
                continue;
            }
        };

        match command {
            ReplCommand::Generate(prompt) => {
                if studio.is_generating() {
                    println!(
                        "{}",
                        "A generation is already running; its results will be replaced.".yellow()
                    );
                }
                focused = None;
                let studio = studio.clone();
                tokio::spawn(async move {
                    let result = studio.start_generation(&prompt).await;
                    if result.is_ok() {
                        println!("{}", "Generation finished. /show for the summary.".green());
                    }
                    report(result, "Generation");
                });
            }
            ReplCommand::Refine {
                number,
                instructions,
            } => {
                let Some(id) = artifact_id(&studio, number) else {
                    println!("{}", format!("No artifact {number}").yellow());
                    continue;
                };
                let studio = studio.clone();
                tokio::spawn(async move {
                    report(studio.refine_artifact(&id, &instructions).await, "Refinement");
                });
            }
            ReplCommand::Add => {
                let studio = studio.clone();
                tokio::spawn(async move {
                    report(studio.add_agent().await, "Adding agent");
                });
            }
            ReplCommand::Switch { number, variation } => {
                let Some(id) = artifact_id(&studio, number) else {
                    println!("{}", format!("No artifact {number}").yellow());
                    continue;
                };
                match studio.switch_variation(&id, variation - 1) {
                    Ok(true) => println!("{}", format!("Artifact {number} now shows v{variation}").green()),
                    Ok(false) => println!("{}", format!("Artifact {number} has no v{variation}").yellow()),
                    Err(err) => eprintln!("{}", err.to_string().red()),
                }
            }
            ReplCommand::Remove(number) => {
                let Some(id) = artifact_id(&studio, number) else {
                    println!("{}", format!("No artifact {number}").yellow());
                    continue;
                };
                if focused.as_deref() == Some(id.as_str()) {
                    focused = None;
                }
                studio.remove_artifact(&id);
            }
            ReplCommand::Focus(number) => {
                let Some(id) = artifact_id(&studio, number) else {
                    println!("{}", format!("No artifact {number}").yellow());
                    continue;
                };
                focused = if focused.as_deref() == Some(id.as_str()) {
                    None
                } else {
                    Some(id)
                };
            }
            ReplCommand::Show => match studio.snapshot() {
                Some(session) => {
                    match focused.as_deref().and_then(|id| session.artifact(id)) {
                        Some(artifact) => render::print_artifact(artifact),
                        None => render::print_session(&session, None),
                    }
                }
                None => println!("{}", "No session yet.".bright_black()),
            },
            ReplCommand::Export(dir) => {
                let dir = dir.unwrap_or_else(|| PathBuf::from("."));
                match studio.export_to(&dir) {
                    Ok(path) => println!("{}", format!("Exported to {}", path.display()).green()),
                    Err(err) => eprintln!("{}", err.to_string().red()),
                }
            }
            ReplCommand::Reset => {
                focused = None;
                studio.reset();
            }
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => break,
        }
    }

    println!("{}", "Goodbye!".bright_green());
    watcher.abort();
    Ok(())
}
