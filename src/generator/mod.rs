//! # Content Generator
//!
//! The expensive side of the system: one external call per `generate`, followed
//! by a local `parse` that turns raw output into title, body, and annotations.
//!
//! Parsing is fail-soft for individual fields (sentinel title/body, empty
//! annotations) and hard only when the payload as a whole is unusable; see
//! [`parser::parse_generated_content`].

use crate::error::GeneratorResult;
use crate::models::GeneratedContent;
use async_trait::async_trait;

pub mod http;
pub mod parser;
pub mod timeout;

pub use http::HttpContentGenerator;
pub use parser::parse_generated_content;
pub use timeout::TimeoutGenerator;

/// Raw text returned by an external generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput(String);

impl RawOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RawOutput {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for RawOutput {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

/// Produces content for a category through an external, slow call
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Perform one external generation call for `category`.
    ///
    /// Implementations own their deadline: the coordinator never times this out.
    async fn generate(&self, category: &str) -> GeneratorResult<RawOutput>;

    /// Extract structured fields from `raw`
    fn parse(&self, raw: &RawOutput) -> GeneratorResult<GeneratedContent> {
        parse_generated_content(raw.as_str())
    }

    /// Name used in logs
    fn generator_name(&self) -> &'static str;
}
