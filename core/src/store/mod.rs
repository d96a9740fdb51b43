//! Persistence seams for history and preferences.
//!
//! The session never touches storage itself. After each state transition the
//! application driver hands the affected state to one of these traits, so the
//! transitions can be tested without any backend.

mod in_memory;

pub use in_memory::InMemoryStore;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{HistoryItem, Theme, User};

/// Error type for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Corrupt record {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Per-identity history lists, always written as a whole
#[async_trait]
pub trait HistoryStore: Send + Sync + Debug {
    /// Load the history list for `identity`, empty if none was saved
    async fn load(&self, identity: &str) -> Result<Vec<HistoryItem>, StoreError>;

    /// Replace the history list for `identity`
    async fn save(&self, identity: &str, items: &[HistoryItem]) -> Result<(), StoreError>;

    /// Remove the history list for `identity`
    async fn clear(&self, identity: &str) -> Result<(), StoreError>;
}

/// The remembered identity and theme
#[async_trait]
pub trait PreferenceStore: Send + Sync + Debug {
    async fn load_identity(&self) -> Result<Option<User>, StoreError>;

    async fn save_identity(&self, user: &User) -> Result<(), StoreError>;

    async fn clear_identity(&self) -> Result<(), StoreError>;

    async fn load_theme(&self) -> Result<Option<Theme>, StoreError>;

    async fn save_theme(&self, theme: Theme) -> Result<(), StoreError>;
}

pub type HistoryStoreRef = Arc<dyn HistoryStore>;
pub type PreferenceStoreRef = Arc<dyn PreferenceStore>;
