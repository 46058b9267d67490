//! HTTP generator for a Gemini-style `generateContent` endpoint.
//!
//! The prompt is the configured template with `{category}` substituted; the
//! generated document is read from `candidates[0].content.parts[0].text`.

use super::{ContentGenerator, RawOutput};
use crate::config::GeneratorSettings;
use crate::error::{GeneratorError, GeneratorResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument};

const CATEGORY_PLACEHOLDER: &str = "{category}";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct HttpContentGenerator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    prompt_template: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpContentGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpContentGenerator")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpContentGenerator {
    pub fn from_settings(settings: &GeneratorSettings) -> GeneratorResult<Self> {
        let timeout = settings.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeneratorError::request(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            prompt_template: settings.prompt_template.clone(),
            timeout,
        })
    }

    fn render_prompt(&self, category: &str) -> String {
        self.prompt_template.replace(CATEGORY_PLACEHOLDER, category)
    }

    fn map_send_error(&self, err: reqwest::Error) -> GeneratorError {
        // Request URLs never reach error messages or logs
        let err = err.without_url();
        if err.is_timeout() {
            GeneratorError::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            GeneratorError::request(format!("HTTP request failed: {err}"))
        }
    }
}

fn request_body(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![TextPart { text: prompt }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
        },
    }
}

/// Pull the generated document out of a `generateContent` response body
fn extract_candidate_text(body: &str) -> GeneratorResult<String> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GeneratorError::malformed(format!("Unreadable generator response: {e}")))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| GeneratorError::malformed("Generator response has no candidate text"))
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    #[instrument(skip(self))]
    async fn generate(&self, category: &str) -> GeneratorResult<RawOutput> {
        let prompt = self.render_prompt(category);
        let mut request = self.client.post(&self.endpoint).json(&request_body(&prompt));
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.as_str());
        }

        info!(category = category, "Requesting generated content");
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            error!(status = status.as_u16(), "Generator upstream returned an error");
            return Err(GeneratorError::upstream(status.as_u16(), body));
        }

        extract_candidate_text(&body).map(RawOutput::from)
    }

    fn generator_name(&self) -> &'static str {
        "http"
    }
}
