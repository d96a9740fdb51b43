use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::model::{HistoryItem, Theme, User};
use crate::store::{HistoryStore, PreferenceStore, StoreError};

#[derive(Debug, Default)]
struct State {
    histories: HashMap<String, Vec<HistoryItem>>,
    identity: Option<User>,
    theme: Option<Theme>,
}

/// In-memory implementation of both stores
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> Result<T, StoreError> {
        let state = self.state.read().map_err(|e| {
            StoreError::StorageError(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(f(&state))
    }

    fn write<T>(&self, f: impl FnOnce(&mut State) -> T) -> Result<T, StoreError> {
        let mut state = self.state.write().map_err(|e| {
            StoreError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        Ok(f(&mut state))
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn load(&self, identity: &str) -> Result<Vec<HistoryItem>, StoreError> {
        self.read(|state| state.histories.get(identity).cloned().unwrap_or_default())
    }

    async fn save(&self, identity: &str, items: &[HistoryItem]) -> Result<(), StoreError> {
        self.write(|state| {
            state
                .histories
                .insert(identity.to_string(), items.to_vec());
        })?;
        debug!(identity, items = items.len(), "Saved history");
        Ok(())
    }

    async fn clear(&self, identity: &str) -> Result<(), StoreError> {
        self.write(|state| {
            state.histories.remove(identity);
        })
    }
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    async fn load_identity(&self) -> Result<Option<User>, StoreError> {
        self.read(|state| state.identity.clone())
    }

    async fn save_identity(&self, user: &User) -> Result<(), StoreError> {
        self.write(|state| state.identity = Some(user.clone()))
    }

    async fn clear_identity(&self) -> Result<(), StoreError> {
        self.write(|state| state.identity = None)
    }

    async fn load_theme(&self) -> Result<Option<Theme>, StoreError> {
        self.read(|state| state.theme)
    }

    async fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        self.write(|state| state.theme = Some(theme))
    }
}
