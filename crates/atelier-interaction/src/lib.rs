//! Generation backends for Atelier.
//!
//! Currently a single backend: the Gemini REST API.

mod gemini_api_agent;

pub use gemini_api_agent::GeminiApiAgent;
