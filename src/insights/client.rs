//! Perplexity chat completions client
//!
//! # Configuration
//!
//! The API key comes from `--perplexity-key` or `PERPLEXITY_API_KEY`. Without
//! one, no client is built and insights are skipped.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Chat completions endpoint
const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";

/// Model with web search, used for up-to-date market context
const DEFAULT_MODEL: &str = "sonar-pro";

/// Errors that can occur while generating insights
#[derive(Debug, Error)]
pub enum InsightError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API answered with a non-success status
    #[error("Perplexity API error: {status} {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Response had no message content
    #[error("No content in Perplexity response")]
    EmptyContent,

    /// Content was not valid JSON
    #[error("Failed to parse insights JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Content was JSON but not the expected shape
    #[error("Invalid insights structure: {0}")]
    InvalidStructure(String),

    /// No API key is configured
    #[error("Perplexity API key not configured")]
    MissingApiKey,
}

/// Something that turns a system and user instruction into free text
#[async_trait]
pub trait NarrativeClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, InsightError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    return_citations: bool,
    return_images: bool,
    return_related_questions: bool,
    search_recency_filter: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for the Perplexity chat completions API
#[derive(Debug, Clone)]
pub struct PerplexityClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl PerplexityClient {
    /// Creates a client with the default endpoint and model
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: PERPLEXITY_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the base URL (for testing against a local server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request<'a>(&'a self, system: &'a str, user: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            // Low temperature keeps the JSON shape consistent
            temperature: 0.3,
            max_tokens: 2000,
            top_p: 0.9,
            return_citations: false,
            return_images: false,
            return_related_questions: false,
            search_recency_filter: "week",
        }
    }
}

#[async_trait]
impl NarrativeClient for PerplexityClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, InsightError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "requesting insights");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request(system, user))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::Status { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(InsightError::EmptyContent)
    }
}
