// HTTP transport to the AI suggestion service.
//
// The request is a plain JSON POST; the response body is an event stream that
// the caller feeds to a `SuggestionSession` via `bytes_stream()`.

use redline_common::types::Role;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::AiConfig;
use crate::error::SuggestError;

const ERROR_BODY_EXCERPT_CHARS: usize = 512;

/// Separator between paragraphs in the request's `document` field.
pub const PARAGRAPH_BREAK: &str = "\n\n";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SuggestRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Paragraphs joined by [`PARAGRAPH_BREAK`]. The break itself is not
    /// document text, so an anchor containing it never matches.
    pub document: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
}

impl SuggestRequest {
    pub fn new<S: AsRef<str>>(config: &AiConfig, prompt: &str, paragraphs: &[S]) -> Self {
        let document =
            paragraphs.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(PARAGRAPH_BREAK);
        Self {
            model: config.model.clone(),
            messages: vec![ChatMessage { role: Role::User, content: prompt.to_string() }],
            document,
            tools: config.tool_names.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiClient {
    http: reqwest::Client,
    endpoint: url::Url,
    api_key: Option<String>,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Result<Self, SuggestError> {
        let endpoint = url::Url::parse(&config.endpoint)
            .map_err(|error| SuggestError::transport(format!("invalid endpoint: {error}")))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|error| {
                SuggestError::transport(format!("failed to build HTTP client: {error}"))
            })?;

        Ok(Self { http, endpoint, api_key: config.api_key() })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// POST the request and return the streaming response once it is 2xx.
    pub async fn stream_suggestions(
        &self,
        request: &SuggestRequest,
    ) -> Result<reqwest::Response, SuggestError> {
        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(endpoint = %self.endpoint, "requesting suggestion stream");
        let response = builder
            .send()
            .await
            .map_err(|error| SuggestError::transport(format!("request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SuggestError::Transport {
                status: Some(status.as_u16()),
                message: format!("{status}: {}", excerpt(&body)),
            });
        }

        info!(%status, "suggestion stream opened");
        Ok(response)
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(ERROR_BODY_EXCERPT_CHARS).collect();
    out.push('…');
    out
}
