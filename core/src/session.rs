//! Chat session state and its transitions.
//!
//! Nothing here performs I/O. A submission is split in two: [`ChatSession::begin`]
//! admits the query and builds its prompt, [`ChatSession::complete`] records
//! whatever the model call produced. Only one submission may be outstanding.

use tracing::{debug, warn};

use crate::client::ModelOutput;
use crate::errors::{DigestResult, SessionError};
use crate::interpret::{interpret, InterpretOptions};
use crate::model::{
    now_millis, HistoryItem, IdGenerator, LoadingState, Message, SummaryData, User,
};
use crate::prompt::{self, BuiltPrompt};

/// What a finished submission produced
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// The model turn appended to the transcript
    pub reply: Message,
    /// Set when the exchange was added to the signed-in user's history
    pub recorded: Option<HistoryItem>,
}

/// An admitted query waiting for the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub query: String,
    pub prompt: BuiltPrompt,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    transcript: Vec<Message>,
    status: LoadingState,
    user: Option<User>,
    history: Vec<HistoryItem>,
    ids: IdGenerator,
    options: InterpretOptions,
}

impl ChatSession {
    pub fn new(options: InterpretOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn status(&self) -> LoadingState {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == LoadingState::Loading
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn history(&self) -> &[HistoryItem] {
        &self.history
    }

    /// Admits `query` and appends the user turn.
    ///
    /// The prompt only sees the turns that came before this one.
    pub fn begin(&mut self, query: &str) -> Result<PendingQuery, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyQuery);
        }
        if self.is_pending() {
            warn!("Rejected submission while a request is pending");
            return Err(SessionError::Busy);
        }

        let prompt = prompt::build(query, &self.transcript);
        debug!(mode = ?prompt.mode, prior_turns = self.transcript.len(), "Built prompt");

        let id = self.ids.next_id();
        self.transcript
            .push(Message::user(id, query.to_string(), now_millis()));
        self.status = LoadingState::Loading;

        Ok(PendingQuery {
            query: query.to_string(),
            prompt,
        })
    }

    /// Records the outcome of `pending`.
    ///
    /// A history entry is only produced when the call succeeded for a signed-in user.
    pub fn complete(
        &mut self,
        pending: PendingQuery,
        outcome: DigestResult<ModelOutput>,
    ) -> Completion {
        match outcome {
            Ok(output) => {
                let summary = interpret(
                    &output.text,
                    &output.grounding_chunks,
                    &pending.query,
                    pending.prompt.mode,
                    self.options,
                );
                self.record_success(pending.query, summary)
            }
            Err(e) => {
                warn!(error = %e, "Generation failed");
                let id = self.ids.next_id();
                let reply = Message::failure(id, &e.to_string(), now_millis());
                self.transcript.push(reply.clone());
                self.status = LoadingState::Error;
                Completion {
                    reply,
                    recorded: None,
                }
            }
        }
    }

    fn record_success(&mut self, query: String, summary: SummaryData) -> Completion {
        let id = self.ids.next_id();
        let reply = Message::model(id, &summary, now_millis());
        self.transcript.push(reply.clone());
        self.status = LoadingState::Success;

        let recorded = self.user.is_some().then(|| HistoryItem {
            id: self.ids.next_id(),
            query,
            summary_data: summary,
            timestamp: now_millis(),
        });
        if let Some(item) = &recorded {
            self.history.push(item.clone());
        }
        Completion { reply, recorded }
    }

    /// Starts over with an empty transcript. History is untouched.
    pub fn new_session(&mut self) {
        self.transcript.clear();
        self.status = LoadingState::Idle;
    }

    pub fn sign_in(&mut self, user: User, history: Vec<HistoryItem>) {
        self.user = Some(user);
        self.history = history;
    }

    pub fn sign_out(&mut self) {
        self.user = None;
        self.history.clear();
        self.new_session();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Replaces the transcript with the exchange stored at `index`.
    pub fn open_history_item(&mut self, index: usize) -> Result<(), SessionError> {
        let item = self
            .history
            .get(index)
            .ok_or(SessionError::NoSuchHistoryItem(index))?;
        self.transcript = Message::from_history(item).to_vec();
        self.status = LoadingState::Success;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DigestError;
    use crate::model::Role;
    use crate::prompt::QueryMode;
    use crate::types::GroundingChunk;

    fn output(text: &str) -> DigestResult<ModelOutput> {
        Ok(ModelOutput {
            text: text.to_string(),
            grounding_chunks: vec![
                GroundingChunk::web("https://a", Some("A")),
                GroundingChunk::web("https://a", Some("A again")),
            ],
        })
    }

    fn signed_in() -> ChatSession {
        let mut session = ChatSession::default();
        session.sign_in(User { name: "ada".into() }, vec![]);
        session
    }

    #[test]
    fn test_blank_query_is_rejected() {
        let mut session = ChatSession::default();
        assert_eq!(session.begin("   "), Err(SessionError::EmptyQuery));
        assert!(session.transcript().is_empty());
        assert_eq!(session.status(), LoadingState::Idle);
    }

    #[test]
    fn test_second_submission_is_rejected_while_pending() {
        let mut session = ChatSession::default();
        let pending = session.begin("first").unwrap();
        assert!(session.is_pending());

        assert_eq!(session.begin("second"), Err(SessionError::Busy));
        assert_eq!(session.transcript().len(), 1);

        session.complete(pending, output("TITLE: One\nBody"));
        assert!(session.begin("second").is_ok());
    }

    #[test]
    fn test_prompt_sees_only_prior_turns() {
        let mut session = ChatSession::default();
        let first = session.begin("What is X?").unwrap();
        assert!(!first.prompt.prompt.contains("Previous Conversation Context"));
        session.complete(first, output("TITLE: About X\nX is a letter."));

        let second = session.begin("And Y?").unwrap();
        assert!(second
            .prompt
            .prompt
            .starts_with("Previous Conversation Context:\nUser: What is X?\nAssistant: X is a letter.\n\n"));
        assert!(!second.prompt.prompt.contains("User: And Y?"));
    }

    #[test]
    fn test_success_without_identity_records_nothing() {
        let mut session = ChatSession::default();
        let pending = session.begin("What is X?").unwrap();
        let completion =
            session.complete(pending, output("TITLE: About X\n# 🎯 Direct Answer\nX is..."));

        assert!(completion.recorded.is_none());
        assert_eq!(completion.reply.title.as_deref(), Some("About X"));
        assert!(session.history().is_empty());
        assert_eq!(session.status(), LoadingState::Success);

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].role, Role::Model);
        assert_eq!(transcript[1].title.as_deref(), Some("About X"));
        assert_eq!(transcript[1].content, "# 🎯 Direct Answer\nX is...");
        assert!(
            transcript[0].id.parse::<i64>().unwrap() < transcript[1].id.parse::<i64>().unwrap()
        );
    }

    #[test]
    fn test_success_with_identity_records_history() {
        let mut session = signed_in();
        let pending = session.begin("https://example.com/thread").unwrap();
        assert_eq!(pending.prompt.mode, QueryMode::Url);

        let recorded = session
            .complete(pending, output("# Heading only"))
            .recorded
            .unwrap();
        assert_eq!(recorded.query, "https://example.com/thread");
        assert_eq!(recorded.summary_data.title, "Link Summary");
        // duplicates are kept in storage
        assert_eq!(recorded.summary_data.sources.len(), 2);
        assert_eq!(session.history(), &[recorded]);
    }

    #[test]
    fn test_failure_appends_error_turn() {
        let mut session = signed_in();
        let pending = session.begin("What is X?").unwrap();
        let completion = session.complete(pending, Err(DigestError::Timeout(5)));

        assert!(completion.recorded.is_none());
        assert!(session.history().is_empty());
        assert_eq!(session.status(), LoadingState::Error);
        let last = session.transcript().last().unwrap();
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.content, "Error: Request timed out after 5 seconds");
        assert!(last.title.is_none());
    }

    #[test]
    fn test_sign_out_clears_everything() {
        let mut session = signed_in();
        let pending = session.begin("q").unwrap();
        session.complete(pending, output("TITLE: t\nb"));

        session.sign_out();
        assert!(session.user().is_none());
        assert!(session.history().is_empty());
        assert!(session.transcript().is_empty());
        assert_eq!(session.status(), LoadingState::Idle);
    }

    #[test]
    fn test_new_session_resets_pending_gate() {
        let mut session = ChatSession::default();
        session.begin("stuck").unwrap();
        session.new_session();
        assert!(session.transcript().is_empty());
        assert!(session.begin("fresh").is_ok());
    }

    #[test]
    fn test_open_history_item() {
        let mut session = signed_in();
        let pending = session.begin("q").unwrap();
        session.complete(pending, output("TITLE: t\nbody"));
        session.new_session();

        assert_eq!(
            session.open_history_item(3),
            Err(SessionError::NoSuchHistoryItem(3))
        );
        session.open_history_item(0).unwrap();
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].content, "q");
        assert_eq!(transcript[1].content, "body");
        assert_eq!(session.status(), LoadingState::Success);
    }
}
