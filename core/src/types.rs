use serde::{Deserialize, Serialize};

/// Request to Gemini API to generate content
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Tool entry for Gemini API. Only search grounding is requested here.
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
}

impl Tool {
    pub fn google_search() -> Self {
        Self {
            google_search: Some(GoogleSearch {}),
        }
    }
}

/// Serializes to `{}`
#[derive(Serialize, Debug, Clone, Default)]
pub struct GoogleSearch {}

/// Content structure for requests
#[derive(Serialize, Clone, Debug, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Part structure for a piece of content
#[derive(Serialize, Clone, Debug, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: String) -> Self {
        Self { text: Some(text) }
    }
}

/// Generation configuration options
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

/// Upper bound on the model's internal reasoning tokens
#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: i32,
}

/// Response from Gemini API
#[derive(Deserialize, Debug, Serialize, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Candidate in the response
#[derive(Deserialize, Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<ContentResponsePart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_metadata: Option<GroundingMetadata>,
}

/// Content part in the response
#[derive(Deserialize, Debug, Serialize, Default)]
pub struct ContentResponsePart {
    #[serde(default)]
    pub parts: Vec<PartResponse>,
    pub role: Option<String>,
}

/// Part response from the API
#[derive(Deserialize, Debug, Serialize, Default)]
pub struct PartResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set on parts that carry the model's reasoning summary rather than the answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

/// Search grounding attached to a candidate
#[derive(Deserialize, Debug, Serialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

/// One grounding chunk. Every field is optional on the wire.
#[derive(Deserialize, Debug, Serialize, Default, Clone, PartialEq)]
pub struct GroundingChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebChunk>,
}

#[derive(Deserialize, Debug, Serialize, Default, Clone, PartialEq)]
pub struct WebChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl GroundingChunk {
    pub fn web(uri: &str, title: Option<&str>) -> Self {
        Self {
            web: Some(WebChunk {
                uri: Some(uri.to_string()),
                title: title.map(str::to_string),
            }),
        }
    }
}
