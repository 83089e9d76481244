// src/matching/ranker.rs — Final ordering, tiering and rendering

use std::cmp::Ordering;
use std::collections::HashMap;

use uuid::Uuid;

use super::scorer::ScoredTemplate;
use super::types::{ConfidenceTier, Suggestion, VariantIndex};
use crate::infra::config::ConfidenceBands;

/// A candidate whose wording has been chosen but not yet rendered.
#[derive(Debug, Clone)]
pub struct ResolvedCandidate {
    pub scored: ScoredTemplate,
    pub variant: VariantIndex,
}

/// Score descending, then lower usage count, then template id.
pub fn ranking_order(a: &ScoredTemplate, b: &ScoredTemplate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.template.usage_count.cmp(&b.template.usage_count))
        .then_with(|| a.template.id.cmp(&b.template.id))
}

pub fn confidence_tier(score: f32, bands: &ConfidenceBands) -> ConfidenceTier {
    if score >= bands.high {
        ConfidenceTier::High
    } else if score >= bands.medium {
        ConfidenceTier::Medium
    } else if score >= bands.low {
        ConfidenceTier::Low
    } else {
        ConfidenceTier::VeryLow
    }
}

/// Replace `{name}` markers with configured values. Unknown markers stay.
pub fn substitute_placeholders(text: &str, values: &HashMap<String, String>) -> String {
    if values.is_empty() || !text.contains('{') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}');
        let name = close.map(|c| &after[..c]);
        match name.and_then(|n| values.get(n).map(|v| (n, v))) {
            Some((n, value)) => {
                out.push_str(value);
                rest = &after[n.len() + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Order, truncate, rank and render the final suggestion list.
pub fn rank_suggestions(
    mut candidates: Vec<ResolvedCandidate>,
    max_suggestions: usize,
    bands: &ConfidenceBands,
    placeholders: &HashMap<String, String>,
) -> Vec<Suggestion> {
    candidates.sort_by(|a, b| ranking_order(&a.scored, &b.scored));
    candidates.truncate(max_suggestions);

    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let template = &c.scored.template;
            let text = substitute_placeholders(template.text_for(c.variant), placeholders);
            Suggestion {
                suggestion_id: Uuid::new_v4().to_string(),
                template_id: template.id.clone(),
                variant: c.variant,
                text,
                score: c.scored.score,
                category: template.category(),
                matched_keywords: c.scored.matched_keywords,
                rank: i + 1,
                confidence: confidence_tier(c.scored.score, bands),
            }
        })
        .collect()
}
