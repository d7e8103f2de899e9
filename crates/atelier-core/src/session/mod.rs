//! Session domain: model, pure transitions, and the state store.

mod model;
mod store;
pub mod transitions;

pub use model::{ProjectMetadata, Session};
pub use store::{SessionSnapshot, SessionStore};
