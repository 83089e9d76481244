// src/memory/backend.rs — Store collaborators consumed by the matching core

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use super::store_server::StoreHandle;
use crate::infra::errors::{AdReplyError, Result};
use crate::learner::keyword_stats::KeywordStat;
use crate::matching::types::{GroupHistory, Template, TemplateFilter, VariantIndex};

/// Everything the suggestion engine and learning recorder read or write.
///
/// All operations may fail with `StoreUnavailable`; callers decide whether
/// that degrades the result or is skipped.
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    async fn get_templates(&self, filter: Option<&TemplateFilter>) -> Result<Vec<Template>>;

    async fn get_template(&self, id: &str) -> Result<Option<Template>>;

    async fn increment_template_usage(&self, id: &str) -> Result<()>;

    async fn get_group_history(&self, group_id: &str) -> Result<Option<GroupHistory>>;

    async fn update_group_history(
        &self,
        group_id: &str,
        template_id: &str,
        variant: VariantIndex,
    ) -> Result<()>;

    async fn get_keyword_stats(&self, category: &str) -> Result<HashMap<String, KeywordStat>>;

    async fn save_keyword_stats(
        &self,
        category: &str,
        stats: HashMap<String, KeywordStat>,
    ) -> Result<()>;

    async fn list_keyword_categories(&self) -> Result<Vec<String>>;

    async fn delete_keyword_category(&self, category: &str) -> Result<usize>;
}

#[async_trait]
impl SuggestionStore for StoreHandle {
    async fn get_templates(&self, filter: Option<&TemplateFilter>) -> Result<Vec<Template>> {
        self.query_templates(filter.cloned()).await
    }

    async fn get_template(&self, id: &str) -> Result<Option<Template>> {
        self.query_template(id.to_string()).await
    }

    async fn increment_template_usage(&self, id: &str) -> Result<()> {
        StoreHandle::increment_template_usage(self, id.to_string()).await
    }

    async fn get_group_history(&self, group_id: &str) -> Result<Option<GroupHistory>> {
        self.query_group_history(group_id.to_string()).await
    }

    async fn update_group_history(
        &self,
        group_id: &str,
        template_id: &str,
        variant: VariantIndex,
    ) -> Result<()> {
        self.upsert_group_history(group_id.to_string(), template_id.to_string(), variant)
            .await
    }

    async fn get_keyword_stats(&self, category: &str) -> Result<HashMap<String, KeywordStat>> {
        self.query_keyword_stats(category.to_string()).await
    }

    async fn save_keyword_stats(
        &self,
        category: &str,
        stats: HashMap<String, KeywordStat>,
    ) -> Result<()> {
        StoreHandle::save_keyword_stats(self, category.to_string(), stats).await
    }

    async fn list_keyword_categories(&self) -> Result<Vec<String>> {
        self.query_keyword_categories().await
    }

    async fn delete_keyword_category(&self, category: &str) -> Result<usize> {
        StoreHandle::delete_keyword_category(self, category.to_string()).await
    }
}

#[derive(Default)]
struct MemoryState {
    templates: HashMap<String, Template>,
    groups: HashMap<String, GroupHistory>,
    stats: HashMap<String, HashMap<String, KeywordStat>>,
}

/// Process-local store, used by tests and embedders without a database.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a template after write-boundary validation.
    pub fn insert_template(&self, template: Template) -> Result<()> {
        template.validate()?;
        let mut state = self.lock()?;
        state.templates.insert(template.id.clone(), template);
        Ok(())
    }

    pub fn remove_template(&self, id: &str) -> Result<bool> {
        Ok(self.lock()?.templates.remove(id).is_some())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| AdReplyError::unavailable("memory_store", e))
    }
}

#[async_trait]
impl SuggestionStore for MemoryStore {
    async fn get_templates(&self, filter: Option<&TemplateFilter>) -> Result<Vec<Template>> {
        let state = self.lock()?;
        let mut templates: Vec<Template> = state
            .templates
            .values()
            .filter(|t| filter.map_or(true, |f| f.matches(t)))
            .cloned()
            .collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(templates)
    }

    async fn get_template(&self, id: &str) -> Result<Option<Template>> {
        Ok(self.lock()?.templates.get(id).cloned())
    }

    async fn increment_template_usage(&self, id: &str) -> Result<()> {
        let mut state = self.lock()?;
        let template = state
            .templates
            .get_mut(id)
            .ok_or_else(|| AdReplyError::TemplateNotFound { id: id.to_string() })?;
        template.usage_count += 1;
        template.updated_at = Utc::now();
        Ok(())
    }

    async fn get_group_history(&self, group_id: &str) -> Result<Option<GroupHistory>> {
        Ok(self.lock()?.groups.get(group_id).cloned())
    }

    async fn update_group_history(
        &self,
        group_id: &str,
        template_id: &str,
        variant: VariantIndex,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let entry = state
            .groups
            .entry(group_id.to_string())
            .or_insert_with(|| GroupHistory {
                group_id: group_id.to_string(),
                last_template_id: template_id.to_string(),
                last_variant: variant,
                last_used_at: Utc::now(),
                total_comments: 0,
            });
        entry.last_template_id = template_id.to_string();
        entry.last_variant = variant;
        entry.last_used_at = Utc::now();
        entry.total_comments += 1;
        Ok(())
    }

    async fn get_keyword_stats(&self, category: &str) -> Result<HashMap<String, KeywordStat>> {
        Ok(self
            .lock()?
            .stats
            .get(category)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_keyword_stats(
        &self,
        category: &str,
        stats: HashMap<String, KeywordStat>,
    ) -> Result<()> {
        self.lock()?.stats.insert(category.to_string(), stats);
        Ok(())
    }

    async fn list_keyword_categories(&self) -> Result<Vec<String>> {
        let state = self.lock()?;
        let mut categories: Vec<String> = state
            .stats
            .iter()
            .filter(|(_, m)| !m.is_empty())
            .map(|(c, _)| c.clone())
            .collect();
        categories.sort();
        Ok(categories)
    }

    async fn delete_keyword_category(&self, category: &str) -> Result<usize> {
        Ok(self
            .lock()?
            .stats
            .remove(category)
            .map_or(0, |m| m.len()))
    }
}

/// The supported store collaborators.
#[derive(Clone)]
pub enum Backend {
    Sqlite(StoreHandle),
    Memory(MemoryStore),
}

impl Backend {
    pub fn kind(&self) -> &str {
        match self {
            Backend::Sqlite(_) => "sqlite",
            Backend::Memory(_) => "memory",
        }
    }

    fn inner(&self) -> &dyn SuggestionStore {
        match self {
            Backend::Sqlite(h) => h,
            Backend::Memory(m) => m,
        }
    }

    /// Template writes are not part of the matching contract; they live here.
    pub async fn upsert_template(&self, template: Template) -> Result<()> {
        match self {
            Backend::Sqlite(h) => h.upsert_template(template).await,
            Backend::Memory(m) => m.insert_template(template),
        }
    }

    pub async fn delete_template(&self, id: &str) -> Result<bool> {
        match self {
            Backend::Sqlite(h) => h.delete_template(id.to_string()).await,
            Backend::Memory(m) => m.remove_template(id),
        }
    }
}

#[async_trait]
impl SuggestionStore for Backend {
    async fn get_templates(&self, filter: Option<&TemplateFilter>) -> Result<Vec<Template>> {
        self.inner().get_templates(filter).await
    }

    async fn get_template(&self, id: &str) -> Result<Option<Template>> {
        self.inner().get_template(id).await
    }

    async fn increment_template_usage(&self, id: &str) -> Result<()> {
        self.inner().increment_template_usage(id).await
    }

    async fn get_group_history(&self, group_id: &str) -> Result<Option<GroupHistory>> {
        self.inner().get_group_history(group_id).await
    }

    async fn update_group_history(
        &self,
        group_id: &str,
        template_id: &str,
        variant: VariantIndex,
    ) -> Result<()> {
        self.inner()
            .update_group_history(group_id, template_id, variant)
            .await
    }

    async fn get_keyword_stats(&self, category: &str) -> Result<HashMap<String, KeywordStat>> {
        self.inner().get_keyword_stats(category).await
    }

    async fn save_keyword_stats(
        &self,
        category: &str,
        stats: HashMap<String, KeywordStat>,
    ) -> Result<()> {
        self.inner().save_keyword_stats(category, stats).await
    }

    async fn list_keyword_categories(&self) -> Result<Vec<String>> {
        self.inner().list_keyword_categories().await
    }

    async fn delete_keyword_category(&self, category: &str) -> Result<usize> {
        self.inner().delete_keyword_category(category).await
    }
}
