// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub suggestions: SuggestionsConfig,

    #[serde(default)]
    pub confidence: ConfidenceBands,

    #[serde(default)]
    pub learning: LearningConfig,

    #[serde(default)]
    pub store: StoreConfig,

    /// Values substituted for `{name}` markers in rendered texts.
    #[serde(default)]
    pub placeholders: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Contribution of each positive keyword found in the post.
    pub keyword_match_weight: f32,
    /// Contribution of each vertical tag found in the post.
    pub vertical_match_weight: f32,
    /// Candidates must score strictly above this.
    pub min_score: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_match_weight: 1.0,
            vertical_match_weight: 0.5,
            min_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionsConfig {
    pub max_suggestions: usize,
    /// Jaccard overlap at or above which two templates count as near-duplicates.
    pub diversity_threshold: f32,
    /// Size of the most-used fallback list when the store cannot be read.
    pub fallback_count: usize,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 3,
            diversity_threshold: 0.6,
            fallback_count: 3,
        }
    }
}

/// Lower bounds of the confidence tiers; anything below `low` is very_low.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceBands {
    pub high: f32,
    pub medium: f32,
    pub low: f32,
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        Self {
            high: 0.7,
            medium: 0.4,
            low: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub enabled: bool,
    pub ignore_window_secs: u64,
    pub recalc_debounce_secs: u64,
    pub removal_threshold: f64,
    pub removal_min_matches: u64,
    /// Number of best keywords listed per category in the performance report.
    pub report_top_keywords: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ignore_window_secs: 10,
            recalc_debounce_secs: 5,
            removal_threshold: 0.1,
            removal_min_matches: 20,
            report_top_keywords: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Per-call timeout; a call exceeding it counts as the store being unavailable.
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_backoff_ms: 200,
            timeout_ms: 2_000,
        }
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the matching pipeline cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let bands = &self.confidence;
        if !(bands.high >= bands.medium && bands.medium >= bands.low) {
            anyhow::bail!(
                "confidence bands must be ordered high >= medium >= low (got {}/{}/{})",
                bands.high,
                bands.medium,
                bands.low
            );
        }
        if self.scoring.keyword_match_weight <= 0.0 {
            anyhow::bail!("scoring.keyword_match_weight must be positive");
        }
        if self.scoring.vertical_match_weight < 0.0 {
            anyhow::bail!("scoring.vertical_match_weight must not be negative");
        }
        if !(0.0..=1.0).contains(&self.suggestions.diversity_threshold) {
            anyhow::bail!("suggestions.diversity_threshold must be within [0, 1]");
        }
        Ok(())
    }
}
