#![allow(dead_code)]

use async_trait::async_trait;
use atelier_application::{RetryPolicy, Studio};
use atelier_core::generation::{GenerationClient, GenerationError};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

type TextHandler = Box<dyn Fn(&str, &str) -> Result<String, GenerationError> + Send + Sync>;
type StructuredHandler = Box<dyn Fn(&str) -> Result<Value, GenerationError> + Send + Sync>;

/// Generation client driven by closures.
///
/// Text calls can be held at a gate so tests can observe intermediate
/// session states; see [`MockClient::hold`] and [`MockClient::release`].
pub struct MockClient {
    text: TextHandler,
    structured: StructuredHandler,
    text_calls: AtomicUsize,
    structured_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    holding: AtomicBool,
    gate: Semaphore,
}

impl MockClient {
    pub fn new<T, S>(text: T, structured: S) -> Self
    where
        T: Fn(&str, &str) -> Result<String, GenerationError> + Send + Sync + 'static,
        S: Fn(&str) -> Result<Value, GenerationError> + Send + Sync + 'static,
    {
        Self {
            text: Box::new(text),
            structured: Box::new(structured),
            text_calls: AtomicUsize::new(0),
            structured_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            holding: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    /// Answers every text call with a label derived from the role
    /// instructions, and every structured call with sensible metadata.
    pub fn happy() -> Self {
        Self::new(|_, system| Ok(draft_for(system)), default_structured)
    }

    /// Makes subsequent text calls wait until released.
    pub fn hold(&self) {
        self.holding.store(true, Ordering::SeqCst);
    }

    /// Lets `n` held text calls proceed.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn structured_calls(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
    }

    /// Waits until at least `n` text calls have started.
    pub async fn wait_for_text_calls(&self, n: usize) {
        while self.text_calls() < n {
            tokio::task::yield_now().await;
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for MockClient {
    async fn generate_text(
        &self,
        prompt: &str,
        system_instructions: &str,
    ) -> Result<String, GenerationError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.holding.load(Ordering::SeqCst) {
            self.gate.acquire().await.unwrap().forget();
        }
        (self.text)(prompt, system_instructions)
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        _schema: &Value,
    ) -> Result<Value, GenerationError> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        (self.structured)(prompt)
    }
}

/// Content keyed by the role the instructions describe.
pub fn draft_for(system_instructions: &str) -> String {
    if system_instructions.contains("UI designer") {
        "<main>mockup</main>".to_string()
    } else if system_instructions.contains("system architect") {
        "# Architecture".to_string()
    } else {
        "# Logic".to_string()
    }
}

pub fn is_role_prompt(prompt: &str) -> bool {
    prompt.contains("Current team members")
}

pub fn default_structured(prompt: &str) -> Result<Value, GenerationError> {
    if is_role_prompt(prompt) {
        Ok(json!({
            "title": "Security Auditor",
            "kind": "logic",
            "reasoning": "Nobody is looking at authentication"
        }))
    } else {
        Ok(json!({ "title": "Recipe Box", "stack": ["Rust", "SQLite"] }))
    }
}

pub fn rate_limited() -> GenerationError {
    GenerationError::api(429, "Resource has been exhausted (e.g. check quota).")
}

/// Studio over `client` with a fast retry policy.
pub fn studio(client: Arc<MockClient>) -> Studio {
    Studio::new(client, RetryPolicy::new(3, Duration::from_millis(10)))
}
