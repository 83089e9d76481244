// src/learner/keyword_stats.rs — Per-keyword effectiveness counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::infra::errors::{AdReplyError, Result};

/// What happened to a shown suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningEvent {
    /// The keyword contributed to a suggestion that was shown.
    Match,
    /// The user acted on the suggestion.
    Selection,
    /// The suggestion timed out without being acted on.
    Ignore,
}

impl LearningEvent {
    pub fn as_str(&self) -> &str {
        match self {
            LearningEvent::Match => "match",
            LearningEvent::Selection => "selection",
            LearningEvent::Ignore => "ignore",
        }
    }
}

/// Learned effectiveness of one keyword within one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordStat {
    pub category: String,
    pub keyword: String,
    pub matches: u64,
    pub chosen: u64,
    pub ignored: u64,
    /// chosen / matches, refreshed on every update.
    pub score: f64,
    pub updated_at: DateTime<Utc>,
}

impl KeywordStat {
    /// Zero state for a keyword seen for the first time.
    pub fn new(category: &str, keyword: &str) -> Self {
        Self {
            category: category.to_string(),
            keyword: keyword.to_string(),
            matches: 0,
            chosen: 0,
            ignored: 0,
            score: 0.0,
            updated_at: Utc::now(),
        }
    }

    /// Rebuild from stored counters, rejecting structurally invalid records.
    pub fn from_stored(
        category: &str,
        keyword: &str,
        matches: i64,
        chosen: i64,
        ignored: i64,
        updated_at: &str,
    ) -> Result<Self> {
        let corrupt = |message: String| AdReplyError::DataCorruption {
            key: format!("{category}/{keyword}"),
            message,
        };

        if matches < 0 || chosen < 0 || ignored < 0 {
            return Err(corrupt(format!(
                "negative counter (matches={matches}, chosen={chosen}, ignored={ignored})"
            )));
        }
        if chosen > matches {
            return Err(corrupt(format!("chosen {chosen} exceeds matches {matches}")));
        }
        let updated_at = DateTime::parse_from_rfc3339(updated_at)
            .map_err(|e| corrupt(format!("bad timestamp '{updated_at}': {e}")))?
            .with_timezone(&Utc);

        let mut stat = Self {
            category: category.to_string(),
            keyword: keyword.to_string(),
            matches: matches as u64,
            chosen: chosen as u64,
            ignored: ignored as u64,
            score: 0.0,
            updated_at,
        };
        stat.recompute();
        Ok(stat)
    }

    /// chosen / matches; 0 when nothing has been matched yet.
    pub fn computed_score(&self) -> f64 {
        if self.matches == 0 {
            0.0
        } else {
            (self.chosen as f64 / self.matches as f64).clamp(0.0, 1.0)
        }
    }

    pub fn recompute(&mut self) {
        self.score = self.computed_score();
    }

    /// Apply one event and refresh the score.
    pub fn apply(&mut self, event: LearningEvent) {
        match event {
            LearningEvent::Match => self.matches += 1,
            LearningEvent::Selection => {
                if self.chosen < self.matches {
                    self.chosen += 1;
                } else {
                    tracing::debug!(
                        category = %self.category,
                        keyword = %self.keyword,
                        "Selection without a recorded match; chosen capped at matches"
                    );
                }
            }
            LearningEvent::Ignore => self.ignored += 1,
        }
        self.recompute();
        self.updated_at = Utc::now();
    }

    /// Score as a whole percentage for display.
    pub fn percent(&self) -> u32 {
        (self.score * 100.0).round() as u32
    }
}

/// Stats with at least `min_matches` matches and a score below `threshold`,
/// weakest first.
pub fn suggested_removals<'a, I>(stats: I, threshold: f64, min_matches: u64) -> Vec<KeywordStat>
where
    I: IntoIterator<Item = &'a KeywordStat>,
{
    let mut weak: Vec<KeywordStat> = stats
        .into_iter()
        .map(|s| {
            let mut s = s.clone();
            s.recompute();
            s
        })
        .filter(|s| s.matches >= min_matches && s.score < threshold)
        .collect();

    weak.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.keyword.cmp(&b.keyword))
    });
    weak
}
