// src/matching/diversity.rs — Near-duplicate suppression

use std::collections::BTreeSet;

use super::ranker::ranking_order;
use super::scorer::ScoredTemplate;

/// Jaccard coefficient of two keyword sets.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.union(b).count();

    if union == 0 {
        return 0.0;
    }

    intersection as f32 / union as f32
}

/// Collapse candidates whose keyword + vertical signature overlaps a
/// better-ranked, already kept candidate by `threshold` or more.
pub fn diversify(mut candidates: Vec<ScoredTemplate>, threshold: f32) -> Vec<ScoredTemplate> {
    candidates.sort_by(ranking_order);

    let mut kept: Vec<(ScoredTemplate, BTreeSet<String>)> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let signature = candidate.template.signature();
        let duplicate_of = kept
            .iter()
            .find(|(_, sig)| jaccard(sig, &signature) >= threshold)
            .map(|(k, _)| k.template.id.clone());

        match duplicate_of {
            Some(id) => {
                tracing::debug!(
                    template = %candidate.template.id,
                    similar_to = %id,
                    "Dropping near-duplicate candidate"
                );
            }
            None => kept.push((candidate, signature)),
        }
    }

    kept.into_iter().map(|(c, _)| c).collect()
}
