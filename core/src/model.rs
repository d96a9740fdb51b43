use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Label used when a turn is replayed to the model as context
    pub fn actor(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Model => "Assistant",
        }
    }
}

/// A citation returned by search grounding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// Structured result of one model invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    pub title: String,
    pub summary: String,
    pub sources: Vec<Source>,
}

/// One conversational turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Message {
    pub fn user(id: String, content: String, timestamp: i64) -> Self {
        Self {
            id,
            role: Role::User,
            content,
            title: None,
            sources: None,
            timestamp,
        }
    }

    pub fn model(id: String, summary: &SummaryData, timestamp: i64) -> Self {
        Self {
            id,
            role: Role::Model,
            content: summary.summary.clone(),
            title: Some(summary.title.clone()),
            sources: Some(summary.sources.clone()),
            timestamp,
        }
    }

    /// A model-authored turn reporting a failed generation
    pub fn failure(id: String, reason: &str, timestamp: i64) -> Self {
        Self {
            id,
            role: Role::Model,
            content: format!("Error: {}", reason),
            title: None,
            sources: None,
            timestamp,
        }
    }

    /// Rebuilds the two-turn exchange captured by a history entry.
    ///
    /// The model turn is stamped one second after the query.
    pub fn from_history(item: &HistoryItem) -> [Message; 2] {
        [
            Message::user(
                format!("{}-query", item.id),
                item.query.clone(),
                item.timestamp,
            ),
            Message::model(
                format!("{}-answer", item.id),
                &item.summary_data,
                item.timestamp + 1000,
            ),
        ]
    }
}

/// A persisted record of one completed query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub query: String,
    pub summary_data: SummaryData,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl HistoryItem {
    pub fn created_at(&self) -> DateTime<Utc> {
        millis_to_datetime(self.timestamp)
    }
}

/// The signed-in identity. Only a display name, nothing is verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("Unknown theme: {}", other)),
        }
    }
}

/// Progress of the single outstanding request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Hands out millisecond-based ids that never repeat or go backwards
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> String {
        self.next_at(now_millis()).to_string()
    }

    fn next_at(&mut self, now: i64) -> i64 {
        let id = if now > self.last { now } else { self.last + 1 };
        self.last = id;
        id
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(|| DateTime::<Utc>::from(std::time::UNIX_EPOCH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generator_is_strictly_increasing() {
        let mut ids = IdGenerator::new();
        let a = ids.next_at(500);
        let b = ids.next_at(500);
        let c = ids.next_at(400);
        let d = ids.next_at(900);

        assert_eq!(a, 500);
        assert_eq!(b, 501);
        assert_eq!(c, 502);
        assert_eq!(d, 900);
    }

    #[test]
    fn test_history_item_uses_browser_layout() {
        let item = HistoryItem {
            id: "1700000000000".to_string(),
            query: "What is X?".to_string(),
            summary_data: SummaryData {
                title: "About X".to_string(),
                summary: "X is...".to_string(),
                sources: vec![],
            },
            timestamp: 1_700_000_000_000,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["summaryData"]["title"], "About X");
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);

        let back: HistoryItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_from_history_rebuilds_exchange() {
        let item = HistoryItem {
            id: "42".to_string(),
            query: "q".to_string(),
            summary_data: SummaryData {
                title: "t".to_string(),
                summary: "s".to_string(),
                sources: vec![Source {
                    title: "a".to_string(),
                    uri: "https://a".to_string(),
                }],
            },
            timestamp: 10_000,
        };

        let [question, answer] = Message::from_history(&item);
        assert_eq!(question.role, Role::User);
        assert_eq!(question.content, "q");
        assert_eq!(answer.role, Role::Model);
        assert_eq!(answer.title.as_deref(), Some("t"));
        assert_eq!(answer.timestamp, 11_000);
        assert_eq!(answer.sources.map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_theme_toggle_and_parse() {
        assert_eq!(Theme::default(), Theme::Dark);
        assert_eq!(Theme::Dark.toggle(), Theme::Light);
        assert_eq!("Light".parse::<Theme>(), Ok(Theme::Light));
        assert!("sepia".parse::<Theme>().is_err());
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
        assert_eq!(Role::User.actor(), "User");
        assert_eq!(Role::Model.actor(), "Assistant");
    }
}
