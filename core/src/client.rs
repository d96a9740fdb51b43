use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::DigestConfig;
use crate::errors::{DigestError, DigestResult};
use crate::types::*;

/// What a single model call needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub model: String,
    pub prompt: String,
    pub system_instruction: String,
    /// Ask for web-search grounding
    pub google_search: bool,
    pub thinking_budget: i32,
}

/// Generated text and any grounding chunks attached to it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelOutput {
    pub text: String,
    pub grounding_chunks: Vec<GroundingChunk>,
}

/// The external generative model
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, request: &InvocationRequest) -> DigestResult<ModelOutput>;
}

/// Client for interacting with the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

impl GeminiClient {
    /// Create a new Gemini API client
    pub fn new(config: &DigestConfig) -> DigestResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            DigestError::ConfigError(
                "API key is required to initialize the Gemini client".to_string(),
            )
        })?;

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the client at another API root, e.g. a local gateway.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The key travels in a header, never in the URL.
    fn get_endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Generate content using the Gemini API
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> DigestResult<GenerateContentResponse> {
        let url = self.get_endpoint(model);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                DigestError::RequestError(format!("Failed to send request: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                DigestError::ResponseError(format!(
                    "Failed to read error response: {}",
                    e.without_url()
                ))
            })?;

            return Err(DigestError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| {
                DigestError::ParsingError(format!("Failed to parse response: {}", e.without_url()))
            })
    }
}

/// Builds the wire request for one digest call.
pub fn build_request(request: &InvocationRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part::text(request.prompt.clone())],
            role: Some("user".to_string()),
        }],
        system_instruction: Some(Content {
            parts: vec![Part::text(request.system_instruction.clone())],
            role: None,
        }),
        tools: request.google_search.then(|| vec![Tool::google_search()]),
        generation_config: Some(GenerationConfig {
            thinking_config: Some(ThinkingConfig {
                thinking_budget: request.thinking_budget,
            }),
        }),
    }
}

/// Pulls the answer text and grounding out of the first candidate.
///
/// Thought parts are skipped. A response without answer text is an error.
pub fn extract_output(response: GenerateContentResponse) -> DigestResult<ModelOutput> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| DigestError::ResponseError("No candidates in response".to_string()))?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| part.thought != Some(true))
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(DigestError::ResponseError(
            "No summary could be generated".to_string(),
        ));
    }

    let grounding_chunks = candidate
        .grounding_metadata
        .map(|metadata| metadata.grounding_chunks)
        .unwrap_or_default();

    Ok(ModelOutput {
        text,
        grounding_chunks,
    })
}

#[async_trait]
impl ModelInvoker for GeminiClient {
    async fn invoke(&self, request: &InvocationRequest) -> DigestResult<ModelOutput> {
        info!(
            model = %request.model,
            prompt_len = request.prompt.len(),
            "Calling Gemini"
        );
        let body = build_request(request);
        let response = self.generate_content(&request.model, &body).await?;
        let output = extract_output(response)?;
        debug!(
            text_len = output.text.len(),
            chunks = output.grounding_chunks.len(),
            "Gemini responded"
        );
        Ok(output)
    }
}
