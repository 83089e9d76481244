// src/learner/recorder.rs — Learning feedback from shown, chosen and ignored suggestions

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::keyword_stats::{suggested_removals, KeywordStat, LearningEvent};
use super::report::{build_report, PerformanceReport, ReportOptions};
use super::scheduler::{Debouncer, ScheduledTask};
use crate::infra::config::LearningConfig;
use crate::infra::errors::Result;
use crate::matching::types::Suggestion;
use crate::memory::backend::SuggestionStore;

/// One async mutex per key; writers to the same key queue up behind it.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Forget the lock of a key that no longer has data. Holders of the old
    /// lock keep it until they finish.
    pub fn remove(&self, key: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.contains_key(key)
    }
}

struct Inner<S> {
    store: Arc<S>,
    config: LearningConfig,
    /// Ignore timers keyed by suggestion id.
    pending: Mutex<HashMap<String, ScheduledTask>>,
    locks: KeyedLocks,
    recalc: Debouncer,
}

/// Write side of the keyword learning loop.
///
/// Counters are only ever changed under the per-category lock, so concurrent
/// events for the same category cannot lose updates even when the store
/// offers nothing better than get/save.
pub struct FeedbackRecorder<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for FeedbackRecorder<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SuggestionStore + 'static> FeedbackRecorder<S> {
    pub fn new(store: Arc<S>, config: LearningConfig) -> Self {
        let recalc = Debouncer::new(Duration::from_secs(config.recalc_debounce_secs));
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                pending: Mutex::new(HashMap::new()),
                locks: KeyedLocks::default(),
                recalc,
            }),
        }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.inner.config
    }

    // -- Raw events --

    pub async fn record_match(&self, category: &str, keywords: &BTreeSet<String>) -> Result<()> {
        self.record(category, keywords, LearningEvent::Match).await
    }

    pub async fn record_selection(
        &self,
        category: &str,
        keywords: &BTreeSet<String>,
    ) -> Result<()> {
        self.record(category, keywords, LearningEvent::Selection)
            .await
    }

    pub async fn record_ignore(&self, category: &str, keywords: &BTreeSet<String>) -> Result<()> {
        self.record(category, keywords, LearningEvent::Ignore).await
    }

    async fn record(
        &self,
        category: &str,
        keywords: &BTreeSet<String>,
        event: LearningEvent,
    ) -> Result<()> {
        if keywords.is_empty() {
            return Ok(());
        }

        {
            let _guard = self.inner.locks.lock(category).await;
            let mut stats = self.inner.store.get_keyword_stats(category).await?;
            for keyword in keywords {
                stats
                    .entry(keyword.clone())
                    .or_insert_with(|| KeywordStat::new(category, keyword))
                    .apply(event);
            }
            self.inner.store.save_keyword_stats(category, stats).await?;
        }

        tracing::debug!(
            category,
            event = event.as_str(),
            keywords = keywords.len(),
            "Recorded learning event"
        );
        self.schedule_recalculation();
        Ok(())
    }

    fn schedule_recalculation(&self) {
        let recorder = self.clone();
        self.inner.recalc.trigger(move || async move {
            if let Err(e) = recorder.calculate_scores().await {
                tracing::warn!("Debounced score recalculation failed: {}", e);
            }
        });
    }

    // -- Suggestion lifecycle --

    /// A suggestion list was shown: count matches and start ignore timers.
    /// Failures are logged; they never reach the suggestion path.
    pub async fn suggestions_shown(&self, suggestions: &[Suggestion]) {
        let mut by_category: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for s in suggestions {
            by_category
                .entry(s.category.as_str())
                .or_default()
                .extend(s.matched_keywords.iter().cloned());
        }
        for (category, keywords) in &by_category {
            if let Err(e) = self.record_match(category, keywords).await {
                tracing::warn!(category, "Skipping match update: {}", e);
            }
        }

        for s in suggestions {
            self.start_ignore_timer(s);
        }
    }

    fn start_ignore_timer(&self, suggestion: &Suggestion) {
        let recorder = self.clone();
        let id = suggestion.suggestion_id.clone();
        let category = suggestion.category.clone();
        let keywords = suggestion.matched_keywords.clone();
        let window = Duration::from_secs(self.inner.config.ignore_window_secs);

        // Holding the map lock while spawning keeps the timer from observing
        // the map before its own entry is in it.
        let mut pending = self.inner.pending.lock().unwrap_or_else(|e| e.into_inner());
        let task = ScheduledTask::schedule(window, {
            let id = id.clone();
            async move {
                let still_pending = recorder
                    .inner
                    .pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&id)
                    .is_some();
                if !still_pending {
                    return;
                }
                if let Err(e) = recorder.record_ignore(&category, &keywords).await {
                    tracing::warn!(suggestion = %id, "Skipping ignore update: {}", e);
                }
            }
        });

        if let Some(previous) = pending.insert(id, task) {
            previous.cancel();
        }
    }

    /// The user acted on a suggestion: cancel its ignore timer, count the choice.
    pub async fn suggestion_selected(&self, suggestion: &Suggestion) {
        self.cancel_ignore(&suggestion.suggestion_id);
        if let Err(e) = self
            .record_selection(&suggestion.category, &suggestion.matched_keywords)
            .await
        {
            tracing::warn!(
                suggestion = %suggestion.suggestion_id,
                "Skipping selection update: {}",
                e
            );
        }
    }

    /// Returns true if a pending ignore timer was cancelled.
    pub fn cancel_ignore(&self, suggestion_id: &str) -> bool {
        let task = self
            .inner
            .pending
            .lock()
            .ok()
            .and_then(|mut p| p.remove(suggestion_id));
        match task {
            Some(task) => {
                task.cancel();
                true
            }
            None => false,
        }
    }

    pub fn pending_ignores(&self) -> usize {
        self.inner.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Drop every pending ignore timer and any scheduled recalculation.
    pub fn shutdown(&self) {
        self.inner.recalc.cancel();
        let tasks: Vec<ScheduledTask> = self
            .inner
            .pending
            .lock()
            .map(|mut p| p.drain().map(|(_, t)| t).collect())
            .unwrap_or_default();
        for task in &tasks {
            task.cancel();
        }
        if !tasks.is_empty() {
            tracing::debug!("Cancelled {} pending ignore timer(s)", tasks.len());
        }
    }

    // -- Read side --

    /// Recompute and persist every score. Returns the number of stats written.
    pub async fn calculate_scores(&self) -> Result<usize> {
        let categories = self.inner.store.list_keyword_categories().await?;
        let mut updated = 0;
        for category in categories {
            let _guard = self.inner.locks.lock(&category).await;
            let mut stats = self.inner.store.get_keyword_stats(&category).await?;
            for stat in stats.values_mut() {
                stat.recompute();
            }
            updated += stats.len();
            self.inner.store.save_keyword_stats(&category, stats).await?;
        }
        tracing::debug!(updated, "Recalculated keyword scores");
        Ok(updated)
    }

    async fn load_all(&self) -> Result<BTreeMap<String, HashMap<String, KeywordStat>>> {
        let categories = self.inner.store.list_keyword_categories().await?;
        let loads = categories
            .iter()
            .map(|c| self.inner.store.get_keyword_stats(c));
        let results = join_all(loads).await;

        let mut all = BTreeMap::new();
        for (category, result) in categories.into_iter().zip(results) {
            all.insert(category, result?);
        }
        Ok(all)
    }

    /// Advisory list of keywords worth pruning, weakest first.
    pub async fn get_suggested_removals(
        &self,
        threshold: f64,
        min_matches: u64,
    ) -> Result<Vec<KeywordStat>> {
        let all = self.load_all().await?;
        Ok(suggested_removals(
            all.values().flat_map(|m| m.values()),
            threshold,
            min_matches,
        ))
    }

    pub async fn get_performance_report(&self) -> Result<PerformanceReport> {
        let all = self.load_all().await?;
        let config = &self.inner.config;
        Ok(build_report(
            &all,
            ReportOptions {
                top_keywords: config.report_top_keywords,
                removal_threshold: config.removal_threshold,
                removal_min_matches: config.removal_min_matches,
            },
        ))
    }

    /// Delete statistics of categories no template carries any more.
    pub async fn prune_orphans(&self, known_categories: &HashSet<String>) -> Result<usize> {
        let mut removed = 0;
        for category in self.inner.store.list_keyword_categories().await? {
            if known_categories.contains(&category) {
                continue;
            }
            let guard = self.inner.locks.lock(&category).await;
            removed += self.inner.store.delete_keyword_category(&category).await?;
            drop(guard);
            self.inner.locks.remove(&category);
        }
        if removed > 0 {
            tracing::info!("Pruned {} orphaned keyword stats", removed);
        }
        Ok(removed)
    }
}
