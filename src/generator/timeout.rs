//! Deadline decorator for any [`ContentGenerator`].

use super::{ContentGenerator, RawOutput};
use crate::error::{GeneratorError, GeneratorResult};
use crate::models::GeneratedContent;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Bounds every `generate` call of the wrapped generator by `timeout`
#[derive(Debug, Clone)]
pub struct TimeoutGenerator<G> {
    inner: G,
    timeout: Duration,
}

impl<G: ContentGenerator> TimeoutGenerator<G> {
    pub fn new(inner: G, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: ContentGenerator> ContentGenerator for TimeoutGenerator<G> {
    async fn generate(&self, category: &str) -> GeneratorResult<RawOutput> {
        match tokio::time::timeout(self.timeout, self.inner.generate(category)).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(
                    generator = self.inner.generator_name(),
                    category = category,
                    timeout_ms = timeout_ms,
                    "Generator call exceeded its deadline"
                );
                Err(GeneratorError::Timeout { timeout_ms })
            }
        }
    }

    fn parse(&self, raw: &RawOutput) -> GeneratorResult<GeneratedContent> {
        self.inner.parse(raw)
    }

    fn generator_name(&self) -> &'static str {
        self.inner.generator_name()
    }
}
