//! Domain layer for Atelier.
//!
//! Holds the artifact and session models, the pure session transitions and
//! the store that owns the current session, the generation client contract,
//! export rendering, and configuration.

pub mod artifact;
pub mod config;
pub mod error;
pub mod export;
pub mod generation;
pub mod session;

// Re-export common error type
pub use error::AtelierError;
