// src/memory/retry.rs — Retry with backoff for store collaborators
//
// Wraps any SuggestionStore. Each call gets a timeout; timeouts and
// StoreUnavailable errors are retried. Validation and not-found errors are
// returned immediately.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use super::backend::SuggestionStore;
use crate::infra::config::StoreConfig;
use crate::infra::errors::{AdReplyError, Result};
use crate::learner::keyword_stats::KeywordStat;
use crate::matching::types::{GroupHistory, Template, TemplateFilter, VariantIndex};

const BACKOFF_FACTOR: u32 = 2;
const MAX_DELAY_MS: u64 = 5_000;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&StoreConfig::default())
    }
}

impl From<&StoreConfig> for RetryConfig {
    fn from(c: &StoreConfig) -> Self {
        Self {
            max_retries: c.max_retries,
            initial_delay: Duration::from_millis(c.retry_backoff_ms),
            timeout: Duration::from_millis(c.timeout_ms),
        }
    }
}

/// A store wrapper that adds timeouts and retry with exponential backoff.
pub struct RetryStore<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: SuggestionStore> RetryStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            config: RetryConfig::default(),
        }
    }

    pub fn with_config(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Delay before retry `attempt` (0-indexed).
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = BACKOFF_FACTOR.saturating_pow(attempt);
        self.config
            .initial_delay
            .saturating_mul(factor)
            .min(Duration::from_millis(MAX_DELAY_MS))
    }

    async fn call<'a, T, F, Fut>(&'a self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut(&'a S) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.config.timeout, f(&self.inner)).await {
                Ok(r) => r,
                Err(_) => Err(AdReplyError::unavailable(
                    operation,
                    format!("timed out after {}ms", self.config.timeout.as_millis()),
                )),
            };

            match result {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retriable() && attempt < self.config.max_retries => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying store call after error: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<S: SuggestionStore> SuggestionStore for RetryStore<S> {
    async fn get_templates(&self, filter: Option<&TemplateFilter>) -> Result<Vec<Template>> {
        self.call("get_templates", |s| s.get_templates(filter)).await
    }

    async fn get_template(&self, id: &str) -> Result<Option<Template>> {
        self.call("get_template", |s| s.get_template(id)).await
    }

    async fn increment_template_usage(&self, id: &str) -> Result<()> {
        self.call("increment_template_usage", |s| s.increment_template_usage(id))
            .await
    }

    async fn get_group_history(&self, group_id: &str) -> Result<Option<GroupHistory>> {
        self.call("get_group_history", |s| s.get_group_history(group_id))
            .await
    }

    async fn update_group_history(
        &self,
        group_id: &str,
        template_id: &str,
        variant: VariantIndex,
    ) -> Result<()> {
        self.call("update_group_history", |s| {
            s.update_group_history(group_id, template_id, variant)
        })
        .await
    }

    async fn get_keyword_stats(&self, category: &str) -> Result<HashMap<String, KeywordStat>> {
        self.call("get_keyword_stats", |s| s.get_keyword_stats(category))
            .await
    }

    async fn save_keyword_stats(
        &self,
        category: &str,
        stats: HashMap<String, KeywordStat>,
    ) -> Result<()> {
        self.call("save_keyword_stats", |s| {
            s.save_keyword_stats(category, stats.clone())
        })
        .await
    }

    async fn list_keyword_categories(&self) -> Result<Vec<String>> {
        self.call("list_keyword_categories", |s| s.list_keyword_categories())
            .await
    }

    async fn delete_keyword_category(&self, category: &str) -> Result<usize> {
        self.call("delete_keyword_category", |s| {
            s.delete_keyword_category(category)
        })
        .await
    }
}
