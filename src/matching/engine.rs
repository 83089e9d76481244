// src/matching/engine.rs — Suggestion pipeline and usage recording

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, RwLock};

use super::diversity::diversify;
use super::extractor::extract_keywords;
use super::ranker::{rank_suggestions, ResolvedCandidate};
use super::rotation::apply_rotation;
use super::scorer::{score_all, ScoredTemplate};
use super::types::{GroupHistory, Suggestion, SuggestionOptions, Template};
use super::variant::select_variant;
use crate::infra::config::Config;
use crate::infra::errors::{AdReplyError, Result};
use crate::learner::keyword_stats::KeywordStat;
use crate::learner::recorder::FeedbackRecorder;
use crate::learner::report::PerformanceReport;
use crate::memory::backend::SuggestionStore;

/// Where a candidate list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateSource {
    Scored,
    /// Templates could not be read; most-used snapshot entries, unscored.
    Fallback,
}

/// Turns post text into ranked template suggestions and feeds outcomes back
/// into keyword learning.
pub struct SuggestionEngine<S> {
    store: Arc<S>,
    config: Config,
    recorder: FeedbackRecorder<S>,
    /// Last template list read successfully, used when the store is down.
    snapshot: RwLock<Vec<Template>>,
}

impl<S: SuggestionStore + 'static> SuggestionEngine<S> {
    pub fn new(store: Arc<S>, config: Config) -> Self {
        let recorder = FeedbackRecorder::new(Arc::clone(&store), config.learning.clone());
        Self {
            store,
            config,
            recorder,
            snapshot: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn recorder(&self) -> &FeedbackRecorder<S> {
        &self.recorder
    }

    /// Suggest templates for a post. Never fails: bad input yields an empty
    /// list, an unavailable store yields a degraded list.
    pub async fn get_suggestions(
        &self,
        post_text: Option<&str>,
        group_id: &str,
        options: Option<SuggestionOptions>,
    ) -> Vec<Suggestion> {
        let extracted = extract_keywords(post_text);
        if extracted.is_empty() {
            return Vec::new();
        }

        let max = options
            .and_then(|o| o.max_suggestions)
            .unwrap_or(self.config.suggestions.max_suggestions);
        if max == 0 {
            return Vec::new();
        }

        let history = match self.store.get_group_history(group_id).await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(group = group_id, "Group history unavailable: {}", e);
                None
            }
        };

        // Rotation sees every relevant template; a repeat may only survive
        // when nothing else matched, not because diversity hid the others.
        let (candidates, source) = match self.store.get_templates(None).await {
            Ok(templates) => {
                let scored = score_all(&templates, &extracted, &self.config.scoring);
                self.remember(templates);
                (
                    diversify(
                        apply_rotation(scored, history.as_ref()),
                        self.config.suggestions.diversity_threshold,
                    ),
                    CandidateSource::Scored,
                )
            }
            Err(e) => {
                tracing::warn!("Templates unavailable, serving degraded suggestions: {}", e);
                (
                    apply_rotation(self.fallback_candidates(), history.as_ref()),
                    CandidateSource::Fallback,
                )
            }
        };

        let suggestions = self.finish(candidates, history.as_ref(), max);

        tracing::debug!(
            group = group_id,
            words = extracted.word_count,
            returned = suggestions.len(),
            degraded = source == CandidateSource::Fallback,
            "Suggestions computed"
        );

        if self.config.learning.enabled && source == CandidateSource::Scored {
            self.recorder.suggestions_shown(&suggestions).await;
        }
        suggestions
    }

    fn finish(
        &self,
        candidates: Vec<ScoredTemplate>,
        history: Option<&GroupHistory>,
        max: usize,
    ) -> Vec<Suggestion> {
        let resolved = candidates
            .into_iter()
            .map(|scored| {
                let (variant, _) = select_variant(&scored.template, history);
                ResolvedCandidate { scored, variant }
            })
            .collect();

        rank_suggestions(
            resolved,
            max,
            &self.config.confidence,
            &self.config.placeholders,
        )
    }

    fn remember(&self, templates: Vec<Template>) {
        if let Ok(mut snapshot) = self.snapshot.write() {
            *snapshot = templates;
        }
    }

    fn fallback_candidates(&self) -> Vec<ScoredTemplate> {
        let Ok(snapshot) = self.snapshot.read() else {
            return Vec::new();
        };

        let mut templates: Vec<&Template> = snapshot.iter().collect();
        templates.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then_with(|| a.id.cmp(&b.id)));
        templates
            .into_iter()
            .take(self.config.suggestions.fallback_count)
            .map(|t| ScoredTemplate {
                template: t.clone(),
                score: 0.0,
                matched_keywords: BTreeSet::new(),
            })
            .collect()
    }

    /// The user posted `suggestion` in `group_id`.
    ///
    /// Group history is written before the usage count, so a failed history
    /// write leaves both untouched. Unknown templates change nothing.
    pub async fn record_suggestion_usage(
        &self,
        suggestion: &Suggestion,
        group_id: &str,
    ) -> Result<()> {
        if self.store.get_template(&suggestion.template_id).await?.is_none() {
            return Err(AdReplyError::TemplateNotFound {
                id: suggestion.template_id.clone(),
            });
        }
        self.store
            .update_group_history(group_id, &suggestion.template_id, suggestion.variant)
            .await?;
        self.store
            .increment_template_usage(&suggestion.template_id)
            .await?;

        tracing::info!(
            group = group_id,
            template = %suggestion.template_id,
            variant = %suggestion.variant,
            "Recorded suggestion usage"
        );

        if self.config.learning.enabled {
            self.recorder.suggestion_selected(suggestion).await;
        }
        Ok(())
    }

    // -- Learning surface --

    pub async fn record_match(&self, category: &str, keywords: &BTreeSet<String>) -> Result<()> {
        self.recorder.record_match(category, keywords).await
    }

    pub async fn record_selection(
        &self,
        category: &str,
        keywords: &BTreeSet<String>,
    ) -> Result<()> {
        self.recorder.record_selection(category, keywords).await
    }

    pub async fn record_ignore(&self, category: &str, keywords: &BTreeSet<String>) -> Result<()> {
        self.recorder.record_ignore(category, keywords).await
    }

    pub async fn calculate_scores(&self) -> Result<usize> {
        self.recorder.calculate_scores().await
    }

    pub async fn get_suggested_removals(
        &self,
        threshold: Option<f64>,
        min_matches: Option<u64>,
    ) -> Result<Vec<KeywordStat>> {
        let learning = &self.config.learning;
        self.recorder
            .get_suggested_removals(
                threshold.unwrap_or(learning.removal_threshold),
                min_matches.unwrap_or(learning.removal_min_matches),
            )
            .await
    }

    pub async fn get_performance_report(&self) -> Result<PerformanceReport> {
        self.recorder.get_performance_report().await
    }

    /// Stop pending ignore timers and any scheduled recalculation.
    pub fn shutdown(&self) {
        self.recorder.shutdown();
    }

    /// Drop keyword statistics for categories no stored template uses.
    pub async fn prune_orphaned_stats(&self) -> Result<usize> {
        let known: HashSet<String> = self
            .store
            .get_templates(None)
            .await?
            .iter()
            .map(Template::category)
            .collect();
        self.recorder.prune_orphans(&known).await
    }
}
