//! Application layer for Atelier.
//!
//! This crate sequences generation calls against the session store:
//! the retry policy, the prompt templates, the initial generation workflow,
//! refinement and expansion, and the `Studio` facade that exposes every user
//! intent to a rendering collaborator.

pub mod controller;
pub mod orchestrator;
pub mod prompts;
pub mod retry;
pub mod studio;

pub use controller::RefinementController;
pub use orchestrator::{GenerationOrchestrator, RoleTemplate, default_roster};
pub use retry::RetryPolicy;
pub use studio::Studio;
