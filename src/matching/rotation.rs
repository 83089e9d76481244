// src/matching/rotation.rs — Anti-repetition within a conversation group

use super::scorer::ScoredTemplate;
use super::types::GroupHistory;
use super::variant::next_variant;

/// Drop the candidate that would repeat the group's last (template, variant)
/// pair verbatim. If that leaves nothing, repetition is allowed instead.
pub fn apply_rotation(
    candidates: Vec<ScoredTemplate>,
    history: Option<&GroupHistory>,
) -> Vec<ScoredTemplate> {
    let Some(history) = history else {
        return candidates;
    };

    let repeats = |c: &ScoredTemplate| {
        c.template.id == history.last_template_id
            && next_variant(&c.template, Some(history)) == history.last_variant
    };

    if !candidates.iter().any(repeats) {
        return candidates;
    }

    if candidates.iter().all(repeats) {
        tracing::debug!(
            group = %history.group_id,
            template = %history.last_template_id,
            "Only candidate repeats the last suggestion; allowing repetition"
        );
        return candidates;
    }

    candidates.into_iter().filter(|c| !repeats(c)).collect()
}
