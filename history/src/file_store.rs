use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use digest_core::model::{HistoryItem, Theme, User};
use digest_core::store::{HistoryStore, PreferenceStore, StoreError};

const PREFERENCES_FILE: &str = "preferences.json";

/// Contents of the preferences document
#[derive(Debug, Default, Serialize, Deserialize)]
struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    theme: Option<Theme>,
}

/// JSON files under one directory: `history_<name>.json` per identity and a
/// shared `preferences.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        debug!("Using store directory {}", dir.display());
        Ok(Self { dir })
    }

    fn history_path(&self, identity: &str) -> PathBuf {
        self.dir
            .join(format!("history_{}.json", encode_identity(identity)))
    }

    fn preferences_path(&self) -> PathBuf {
        self.dir.join(PREFERENCES_FILE)
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    async fn write_json<T: Serialize + Sync>(path: &Path, value: &T) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(value)?;
        fs::write(path, content).await?;
        Ok(())
    }

    async fn remove(path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_preferences(&self) -> Result<Preferences, StoreError> {
        match Self::read_json(&self.preferences_path()).await {
            Ok(prefs) => Ok(prefs.unwrap_or_default()),
            Err(StoreError::Corrupt { path, message }) => {
                warn!(path = %path, message = %message, "Ignoring unreadable preferences");
                Ok(Preferences::default())
            }
            Err(e) => Err(e),
        }
    }

    async fn update_preferences(
        &self,
        f: impl FnOnce(&mut Preferences) + Send,
    ) -> Result<(), StoreError> {
        let mut prefs = self.load_preferences().await?;
        f(&mut prefs);
        Self::write_json(&self.preferences_path(), &prefs).await
    }
}

/// Makes an identity safe to use inside a file name.
///
/// ASCII letters, digits, `-` and `_` are kept; every other byte becomes `%XX`,
/// so distinct names never share a file.
fn encode_identity(identity: &str) -> String {
    let mut encoded = String::with_capacity(identity.len());
    for byte in identity.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

#[async_trait]
impl HistoryStore for FileStore {
    async fn load(&self, identity: &str) -> Result<Vec<HistoryItem>, StoreError> {
        let items: Option<Vec<HistoryItem>> = Self::read_json(&self.history_path(identity)).await?;
        Ok(items.unwrap_or_default())
    }

    async fn save(&self, identity: &str, items: &[HistoryItem]) -> Result<(), StoreError> {
        let path = self.history_path(identity);
        Self::write_json(&path, &items).await?;
        debug!(identity, items = items.len(), "Wrote {}", path.display());
        Ok(())
    }

    async fn clear(&self, identity: &str) -> Result<(), StoreError> {
        Self::remove(&self.history_path(identity)).await
    }
}

#[async_trait]
impl PreferenceStore for FileStore {
    async fn load_identity(&self) -> Result<Option<User>, StoreError> {
        Ok(self.load_preferences().await?.user)
    }

    async fn save_identity(&self, user: &User) -> Result<(), StoreError> {
        let user = user.clone();
        self.update_preferences(move |prefs| prefs.user = Some(user))
            .await
    }

    async fn clear_identity(&self) -> Result<(), StoreError> {
        self.update_preferences(|prefs| prefs.user = None).await
    }

    async fn load_theme(&self) -> Result<Option<Theme>, StoreError> {
        Ok(self.load_preferences().await?.theme)
    }

    async fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        self.update_preferences(move |prefs| prefs.theme = Some(theme))
            .await
    }
}
