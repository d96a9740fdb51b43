//! Application driver: the chat session plus its collaborators.
//!
//! Every transition is applied to the in-memory session first and persisted
//! right after. A failed write is logged and leaves the in-memory state as it is.
//! A history list that failed to load is never overwritten until it is cleared.

use std::sync::Arc;

use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};

use crate::client::{InvocationRequest, ModelInvoker};
use crate::config::DigestConfig;
use crate::errors::{DigestError, SessionError};
use crate::model::{HistoryItem, Message, Theme, User};
use crate::session::{ChatSession, PendingQuery};
use crate::store::{HistoryStoreRef, PreferenceStoreRef};

pub struct DigestApp {
    session: ChatSession,
    theme: Theme,
    config: DigestConfig,
    invoker: Arc<dyn ModelInvoker>,
    history_store: HistoryStoreRef,
    preferences: PreferenceStoreRef,
    /// Set when the signed-in identity's stored history could not be read
    history_unreadable: bool,
}

impl DigestApp {
    pub fn new(
        config: DigestConfig,
        invoker: Arc<dyn ModelInvoker>,
        history_store: HistoryStoreRef,
        preferences: PreferenceStoreRef,
    ) -> Self {
        Self {
            session: ChatSession::new(config.interpret_options()),
            theme: Theme::default(),
            config,
            invoker,
            history_store,
            preferences,
            history_unreadable: false,
        }
    }

    /// Restores theme and identity from the preference store.
    pub async fn start(&mut self) {
        self.theme = match self.preferences.load_theme().await {
            Ok(theme) => theme.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to load theme, using default");
                Theme::default()
            }
        };

        let identity = self.preferences.load_identity().await;
        match identity {
            Ok(Some(user)) => {
                let history = self.load_history(&user.name).await;
                info!(user = %user.name, items = history.len(), "Restored identity");
                self.session.sign_in(user, history);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to load identity"),
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    pub fn user(&self) -> Option<&User> {
        self.session.user()
    }

    pub fn history(&self) -> &[HistoryItem] {
        self.session.history()
    }

    fn invocation_request(&self, pending: &PendingQuery) -> InvocationRequest {
        InvocationRequest {
            model: self.config.model_name().to_string(),
            prompt: pending.prompt.prompt.clone(),
            system_instruction: pending.prompt.system_instruction.clone(),
            google_search: true,
            thinking_budget: self.config.thinking_budget(),
        }
    }

    /// Sends `query` to the model and returns the reply turn.
    ///
    /// A failed or timed out call still yields a reply, carrying the error text.
    pub async fn submit(&mut self, query: &str) -> Result<Message, SessionError> {
        let pending = self.session.begin(query)?;
        let request = self.invocation_request(&pending);

        let secs = self.config.request_timeout_secs();
        let outcome = match timeout(Duration::from_secs(secs), self.invoker.invoke(&request)).await
        {
            Ok(result) => result,
            Err(_) => Err(DigestError::Timeout(secs)),
        };

        let completion = self.session.complete(pending, outcome);
        if completion.recorded.is_some() {
            self.persist_history().await;
        }
        Ok(completion.reply)
    }

    /// Signs in as `name`. The password must be present but is never checked.
    pub async fn sign_in(&mut self, name: &str, password: &str) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() || password.trim().is_empty() {
            return Err(SessionError::MissingCredentials);
        }

        let user = User {
            name: name.to_string(),
        };
        if let Err(e) = self.preferences.save_identity(&user).await {
            error!(error = %e, "Failed to persist identity");
        }
        let history = self.load_history(name).await;
        info!(user = name, items = history.len(), "Signed in");
        self.session.sign_in(user, history);
        Ok(())
    }

    pub async fn sign_out(&mut self) {
        self.session.sign_out();
        self.history_unreadable = false;
        if let Err(e) = self.preferences.clear_identity().await {
            error!(error = %e, "Failed to clear identity");
        }
        info!("Signed out");
    }

    pub async fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggle();
        if let Err(e) = self.preferences.save_theme(self.theme).await {
            error!(error = %e, "Failed to persist theme");
        }
        self.theme
    }

    pub async fn clear_history(&mut self) {
        self.session.clear_history();
        if let Some(user) = self.session.user() {
            match self.history_store.clear(&user.name).await {
                Ok(()) => self.history_unreadable = false,
                Err(e) => error!(error = %e, user = %user.name, "Failed to clear history"),
            }
        }
    }

    pub fn new_session(&mut self) {
        self.session.new_session();
    }

    pub fn open_history_item(&mut self, index: usize) -> Result<(), SessionError> {
        self.session.open_history_item(index)
    }

    async fn load_history(&mut self, name: &str) -> Vec<HistoryItem> {
        match self.history_store.load(name).await {
            Ok(items) => {
                self.history_unreadable = false;
                items
            }
            Err(e) => {
                error!(
                    error = %e,
                    user = name,
                    "Failed to load history; new entries stay unsaved until it is cleared"
                );
                self.history_unreadable = true;
                Vec::new()
            }
        }
    }

    async fn persist_history(&self) {
        let Some(user) = self.session.user() else {
            return;
        };
        if self.history_unreadable {
            warn!(user = %user.name, "Not overwriting unreadable history");
            return;
        }
        if let Err(e) = self
            .history_store
            .save(&user.name, self.session.history())
            .await
        {
            error!(error = %e, user = %user.name, "Failed to persist history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ModelOutput;
    use crate::errors::DigestResult;
    use crate::model::{LoadingState, Role};
    use crate::store::{HistoryStore, InMemoryStore, PreferenceStore, StoreError};
    use crate::types::GroundingChunk;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeInvoker {
        reply: Option<String>,
        delay_secs: u64,
        requests: Mutex<Vec<InvocationRequest>>,
    }

    impl FakeInvoker {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ModelInvoker for FakeInvoker {
        async fn invoke(&self, request: &InvocationRequest) -> DigestResult<ModelOutput> {
            self.requests.lock().unwrap().push(request.clone());
            if self.delay_secs > 0 {
                tokio::time::sleep(Duration::from_secs(self.delay_secs)).await;
            }
            match &self.reply {
                Some(text) => Ok(ModelOutput {
                    text: text.clone(),
                    grounding_chunks: vec![GroundingChunk::web("https://x.dev", Some("X"))],
                }),
                None => Err(DigestError::HttpError {
                    status_code: 429,
                    message: "quota".into(),
                }),
            }
        }
    }

    fn app_with(
        invoker: Arc<FakeInvoker>,
        store: &InMemoryStore,
        config: DigestConfig,
    ) -> DigestApp {
        DigestApp::new(
            config,
            invoker,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    const REPLY: &str = "TITLE: About X\n# 🎯 Direct Answer\nX is...";

    /// History backend whose stored list cannot be parsed until it is cleared
    #[derive(Debug, Default)]
    struct CorruptHistory {
        cleared: Mutex<bool>,
        saves: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl HistoryStore for CorruptHistory {
        async fn load(&self, _identity: &str) -> Result<Vec<HistoryItem>, StoreError> {
            if *self.cleared.lock().unwrap() {
                return Ok(Vec::new());
            }
            Err(StoreError::Corrupt {
                path: "history_ada.json".into(),
                message: "expected value".into(),
            })
        }

        async fn save(&self, _identity: &str, items: &[HistoryItem]) -> Result<(), StoreError> {
            self.saves.lock().unwrap().push(items.len());
            Ok(())
        }

        async fn clear(&self, _identity: &str) -> Result<(), StoreError> {
            *self.cleared.lock().unwrap() = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_anonymous_submit_records_no_history() {
        let store = InMemoryStore::new();
        let invoker = Arc::new(FakeInvoker::replying(REPLY));
        let mut app = app_with(invoker.clone(), &store, DigestConfig::default());
        app.start().await;

        let reply = app.submit("What is X?").await.unwrap();
        assert_eq!(reply.title.as_deref(), Some("About X"));

        let transcript = app.session().transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].role, Role::Model);
        assert!(app.history().is_empty());

        let requests = invoker.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gemini-2.5-flash");
        assert!(requests[0].google_search);
        assert_eq!(requests[0].thinking_budget, 1024);
    }

    #[tokio::test]
    async fn test_signed_in_submit_persists_history() {
        let store = InMemoryStore::new();
        let mut app = app_with(
            Arc::new(FakeInvoker::replying(REPLY)),
            &store,
            DigestConfig::default(),
        );
        app.start().await;
        app.sign_in("ada", "secret").await.unwrap();

        app.submit("What is X?").await.unwrap();
        assert_eq!(app.history().len(), 1);

        let saved = store.load("ada").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].query, "What is X?");
        assert_eq!(saved[0].summary_data.title, "About X");
    }

    #[tokio::test]
    async fn test_failure_becomes_error_turn() {
        let store = InMemoryStore::new();
        let mut app = app_with(Arc::new(FakeInvoker::default()), &store, DigestConfig::default());
        app.sign_in("ada", "pw").await.unwrap();

        let reply = app.submit("What is X?").await.unwrap();
        assert!(reply.content.starts_with("Error: HTTP Error: 429"));
        assert_eq!(app.session().status(), LoadingState::Error);
        assert!(store.load("ada").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_call_times_out() {
        let store = InMemoryStore::new();
        let invoker = Arc::new(FakeInvoker {
            reply: Some(REPLY.into()),
            delay_secs: 600,
            ..Default::default()
        });
        let config = DigestConfig {
            request_timeout_secs: Some(3),
            ..Default::default()
        };
        let mut app = app_with(invoker, &store, config);

        let reply = app.submit("slow").await.unwrap();
        assert_eq!(reply.content, "Error: Request timed out after 3 seconds");
        assert!(!app.session().is_pending());
    }

    #[tokio::test]
    async fn test_sign_in_requires_both_fields() {
        let store = InMemoryStore::new();
        let mut app = app_with(Arc::new(FakeInvoker::default()), &store, DigestConfig::default());
        assert_eq!(
            app.sign_in("ada", "  ").await,
            Err(SessionError::MissingCredentials)
        );
        assert_eq!(
            app.sign_in(" ", "pw").await,
            Err(SessionError::MissingCredentials)
        );
        assert!(app.user().is_none());
        assert_eq!(store.load_identity().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_start_restores_identity_history_and_theme() {
        let store = InMemoryStore::new();
        {
            let mut app = app_with(
                Arc::new(FakeInvoker::replying(REPLY)),
                &store,
                DigestConfig::default(),
            );
            app.start().await;
            assert_eq!(app.theme(), Theme::Dark);
            app.sign_in("ada", "pw").await.unwrap();
            app.submit("q").await.unwrap();
            assert_eq!(app.toggle_theme().await, Theme::Light);
        }

        let mut app = app_with(Arc::new(FakeInvoker::default()), &store, DigestConfig::default());
        app.start().await;
        assert_eq!(app.theme(), Theme::Light);
        assert_eq!(app.user().map(|u| u.name.as_str()), Some("ada"));
        assert_eq!(app.history().len(), 1);
        assert!(app.session().transcript().is_empty());

        app.open_history_item(0).unwrap();
        assert_eq!(app.session().transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_sign_out_and_clear_history() {
        let store = InMemoryStore::new();
        let mut app = app_with(
            Arc::new(FakeInvoker::replying(REPLY)),
            &store,
            DigestConfig::default(),
        );
        app.sign_in("ada", "pw").await.unwrap();
        app.submit("q").await.unwrap();

        app.clear_history().await;
        assert!(app.history().is_empty());
        assert!(store.load("ada").await.unwrap().is_empty());

        app.submit("again").await.unwrap();
        app.sign_out().await;
        assert!(app.user().is_none());
        assert!(app.session().transcript().is_empty());
        assert_eq!(store.load_identity().await.unwrap(), None);
        // history survives sign-out on disk
        assert_eq!(store.load("ada").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_history_is_not_overwritten() {
        let history = Arc::new(CorruptHistory::default());
        let mut app = DigestApp::new(
            DigestConfig::default(),
            Arc::new(FakeInvoker::replying(REPLY)),
            history.clone(),
            Arc::new(InMemoryStore::new()),
        );
        app.sign_in("ada", "pw").await.unwrap();
        assert!(app.history().is_empty());

        app.submit("q").await.unwrap();
        assert_eq!(app.history().len(), 1);
        assert!(history.saves.lock().unwrap().is_empty());

        app.clear_history().await;
        app.submit("again").await.unwrap();
        assert_eq!(*history.saves.lock().unwrap(), vec![1]);
    }
}
