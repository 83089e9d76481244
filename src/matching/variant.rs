// src/matching/variant.rs — Deterministic variant cycling

use super::types::{GroupHistory, Template, VariantIndex};

/// Pick the next wording of `template` for a group.
///
/// With N variants the rotation has N+1 slots, slot N being the base text:
/// `next = (last + 1) mod (N + 1)`. A group that has not used this template
/// yet, or whose stored index no longer exists, starts at the base text.
pub fn next_variant(template: &Template, history: Option<&GroupHistory>) -> VariantIndex {
    let n = template.variants.len();
    if n == 0 {
        return VariantIndex::Base;
    }

    let last_slot = history
        .filter(|h| h.last_template_id == template.id)
        .and_then(|h| match h.last_variant {
            VariantIndex::Base => Some(n),
            VariantIndex::Variant(i) if i < n => Some(i),
            VariantIndex::Variant(_) => None,
        });

    match last_slot {
        Some(slot) => {
            let next = (slot + 1) % (n + 1);
            if next == n {
                VariantIndex::Base
            } else {
                VariantIndex::Variant(next)
            }
        }
        None => VariantIndex::Base,
    }
}

/// Resolve the variant and its raw (not yet substituted) text.
pub fn select_variant<'a>(
    template: &'a Template,
    history: Option<&GroupHistory>,
) -> (VariantIndex, &'a str) {
    let variant = next_variant(template, history);
    (variant, template.text_for(variant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn history(template_id: &str, variant: VariantIndex) -> GroupHistory {
        GroupHistory {
            group_id: "g".into(),
            last_template_id: template_id.into(),
            last_variant: variant,
            last_used_at: Utc::now(),
            total_comments: 1,
        }
    }

    fn two_variant_template() -> Template {
        Template::new("t", "l", "base text")
            .with_keywords(["x"])
            .with_variants(["first variant", "second variant"])
    }

    #[test]
    fn test_no_variants_always_base() {
        let t = Template::new("t", "l", "base").with_keywords(["x"]);
        assert_eq!(next_variant(&t, None), VariantIndex::Base);
        let h = history("t", VariantIndex::Base);
        assert_eq!(next_variant(&t, Some(&h)), VariantIndex::Base);
    }

    #[test]
    fn test_cyclic_coverage_base_then_each_variant() {
        let t = two_variant_template();
        let mut h: Option<GroupHistory> = None;
        let mut seen = Vec::new();
        for _ in 0..3 {
            let v = next_variant(&t, h.as_ref());
            seen.push(v);
            h = Some(history("t", v));
        }
        assert_eq!(
            seen,
            vec![
                VariantIndex::Base,
                VariantIndex::Variant(0),
                VariantIndex::Variant(1)
            ]
        );
        // Fourth use wraps back to base.
        assert_eq!(next_variant(&t, h.as_ref()), VariantIndex::Base);
    }

    #[test]
    fn test_history_of_other_template_ignored() {
        let t = two_variant_template();
        let h = history("other", VariantIndex::Variant(0));
        assert_eq!(next_variant(&t, Some(&h)), VariantIndex::Base);
    }

    #[test]
    fn test_stale_index_treated_as_no_prior() {
        let t = two_variant_template();
        let h = history("t", VariantIndex::Variant(9));
        assert_eq!(next_variant(&t, Some(&h)), VariantIndex::Base);
    }

    #[test]
    fn test_select_variant_returns_text() {
        let t = two_variant_template();
        let h = history("t", VariantIndex::Base);
        let (v, text) = select_variant(&t, Some(&h));
        assert_eq!(v, VariantIndex::Variant(0));
        assert_eq!(text, "first variant");
    }
}
