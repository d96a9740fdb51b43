// Core ThreadDigest functionality:
// - Data model shared by the session and the stores
// - Prompt building and response interpretation
// - Gemini API client
// - Chat session state and the application driver

pub mod model;
pub use model::*;

pub mod prompt;
pub use prompt::{BuiltPrompt, QueryMode};

pub mod interpret;
pub use interpret::{dedupe, interpret, InterpretOptions};

pub mod markdown;

pub mod types;

pub mod client;
pub use client::{GeminiClient, InvocationRequest, ModelInvoker, ModelOutput};

pub mod config;
pub use config::DigestConfig;

pub mod errors;
pub use errors::*;

pub mod session;
pub use session::{ChatSession, Completion, PendingQuery};

pub mod store;
pub use store::{HistoryStore, InMemoryStore, PreferenceStore, StoreError};

pub mod app;
pub use app::DigestApp;
