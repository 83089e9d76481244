// src/matching/scorer.rs — Template relevance scoring

use std::collections::BTreeSet;

use super::extractor::{normalize_keyword, ExtractedKeywords};
use super::types::Template;
use crate::infra::config::ScoringConfig;

/// A template that survived scoring, with the evidence for its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTemplate {
    pub template: Template,
    pub score: f32,
    pub matched_keywords: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    /// A negative keyword was present; the template is not a candidate at all.
    Excluded { negative_keyword: String },
    Scored {
        score: f32,
        matched_keywords: BTreeSet<String>,
    },
}

/// Score one template against one extraction.
///
/// Each positive keyword hit adds `keyword_match_weight`, each vertical tag
/// found in the post adds `vertical_match_weight`. The sum is divided by
/// `keyword_match_weight * sqrt(declared keyword count)` so a template with a
/// long list of loosely related keywords does not outrank a tightly targeted
/// one, then clamped to [0, 1].
pub fn score_template(
    template: &Template,
    extracted: &ExtractedKeywords,
    config: &ScoringConfig,
) -> ScoreOutcome {
    for negative in &template.negative_keywords {
        let negative = normalize_keyword(negative);
        if extracted.contains_keyword(&negative) {
            return ScoreOutcome::Excluded {
                negative_keyword: negative,
            };
        }
    }

    let keywords: BTreeSet<String> = template
        .keywords
        .iter()
        .map(|k| normalize_keyword(k))
        .filter(|k| !k.is_empty())
        .collect();

    let mut matched = BTreeSet::new();
    let mut raw = 0.0_f32;

    for keyword in &keywords {
        if extracted.contains_keyword(keyword) {
            raw += config.keyword_match_weight;
            matched.insert(keyword.clone());
        }
    }

    for vertical in &template.verticals {
        let vertical = normalize_keyword(vertical);
        if !vertical.is_empty() && extracted.contains_keyword(&vertical) && matched.insert(vertical)
        {
            raw += config.vertical_match_weight;
        }
    }

    let normalizer = config.keyword_match_weight * (keywords.len().max(1) as f32).sqrt();
    let score = if normalizer > 0.0 {
        (raw / normalizer).clamp(0.0, 1.0)
    } else {
        0.0
    };

    ScoreOutcome::Scored {
        score,
        matched_keywords: matched,
    }
}

/// Score every template, dropping hard-excluded and non-relevant ones.
pub fn score_all(
    templates: &[Template],
    extracted: &ExtractedKeywords,
    config: &ScoringConfig,
) -> Vec<ScoredTemplate> {
    if extracted.is_empty() {
        return Vec::new();
    }

    let mut scored = Vec::new();
    for template in templates {
        match score_template(template, extracted, config) {
            ScoreOutcome::Excluded { negative_keyword } => {
                tracing::debug!(
                    template = %template.id,
                    negative_keyword = %negative_keyword,
                    "Template excluded by negative keyword"
                );
            }
            ScoreOutcome::Scored {
                score,
                matched_keywords,
            } => {
                if score > config.min_score && !matched_keywords.is_empty() {
                    scored.push(ScoredTemplate {
                        template: template.clone(),
                        score,
                        matched_keywords,
                    });
                }
            }
        }
    }
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::extractor::extract_keywords;

    fn motorcycle_post() -> ExtractedKeywords {
        extract_keywords(Some(
            "Just installed a new exhaust system on my motorcycle. \
             The performance gains are incredible!",
        ))
    }

    fn exhaust_template() -> Template {
        Template::new("exhaust", "Exhaust shop", "Upgrade at {site}").with_keywords([
            "exhaust",
            "garage",
            "fit",
            "performance",
            "custom",
        ])
    }

    fn score_of(outcome: ScoreOutcome) -> f32 {
        match outcome {
            ScoreOutcome::Scored { score, .. } => score,
            ScoreOutcome::Excluded { .. } => panic!("unexpected exclusion"),
        }
    }

    #[test]
    fn test_motorcycle_scenario_is_candidate() {
        let config = ScoringConfig::default();
        let outcome = score_template(&exhaust_template(), &motorcycle_post(), &config);
        match outcome {
            ScoreOutcome::Scored {
                score,
                matched_keywords,
            } => {
                assert!(score > 0.0);
                // 2 hits over sqrt(5)
                assert!((score - 2.0 / 5.0_f32.sqrt()).abs() < 1e-5);
                assert!(matched_keywords.contains("exhaust"));
                assert!(matched_keywords.contains("performance"));
            }
            ScoreOutcome::Excluded { .. } => panic!("should not be excluded"),
        }

        let all = score_all(&[exhaust_template()], &motorcycle_post(), &config);
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_negative_keyword_hard_excludes() {
        let t = exhaust_template().with_negative_keywords(["DIY"]);
        let post = extract_keywords(Some("DIY exhaust performance custom garage fit"));
        let outcome = score_template(&t, &post, &ScoringConfig::default());
        assert_eq!(
            outcome,
            ScoreOutcome::Excluded {
                negative_keyword: "diy".into()
            }
        );
        assert!(score_all(&[t], &post, &ScoringConfig::default()).is_empty());
    }

    #[test]
    fn test_no_overlap_scores_zero_and_is_dropped() {
        let post = extract_keywords(Some("Lovely weather for a picnic today"));
        let config = ScoringConfig::default();
        assert_eq!(score_of(score_template(&exhaust_template(), &post, &config)), 0.0);
        assert!(score_all(&[exhaust_template()], &post, &config).is_empty());
    }

    #[test]
    fn test_targeted_template_beats_broad_one() {
        let config = ScoringConfig::default();
        let post = extract_keywords(Some("need a new exhaust"));
        let tight = Template::new("tight", "t", "b").with_keywords(["exhaust"]);
        let broad = Template::new("broad", "b", "b").with_keywords([
            "exhaust", "tyres", "brakes", "oil", "chain", "seat", "mirror", "helmet",
        ]);
        let tight_score = score_of(score_template(&tight, &post, &config));
        let broad_score = score_of(score_template(&broad, &post, &config));
        assert!(tight_score > broad_score);
        assert!((tight_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_vertical_hits_add_weight_and_clamp() {
        let config = ScoringConfig::default();
        let t = Template::new("t", "l", "b")
            .with_keywords(["exhaust"])
            .with_verticals(["motorcycle"]);
        let outcome = score_template(&t, &motorcycle_post(), &config);
        match outcome {
            ScoreOutcome::Scored {
                score,
                matched_keywords,
            } => {
                assert!((score - 1.0).abs() < 1e-6);
                assert!(matched_keywords.contains("motorcycle"));
            }
            _ => panic!("should score"),
        }
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let config = ScoringConfig {
            keyword_match_weight: 1.0,
            vertical_match_weight: 10.0,
            min_score: 0.0,
        };
        let t = Template::new("t", "l", "b")
            .with_keywords(["a", "b", "c", "d"])
            .with_verticals(["e", "f"]);
        let post = extract_keywords(Some("a b c d e f"));
        let score = score_of(score_template(&t, &post, &config));
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_min_score_is_exclusive() {
        let config = ScoringConfig {
            min_score: 0.5,
            ..ScoringConfig::default()
        };
        let post = extract_keywords(Some("exhaust"));
        // 1 / sqrt(5) ≈ 0.447
        assert!(score_all(&[exhaust_template()], &post, &config).is_empty());
    }

    #[test]
    fn test_vertical_hit_alone_is_relevant() {
        let t = Template::new("t", "l", "b")
            .with_keywords(["muffler"])
            .with_verticals(["automotive"]);
        let post = extract_keywords(Some("automotive news roundup"));
        let scored = score_all(&[t], &post, &ScoringConfig::default());
        assert_eq!(scored.len(), 1);
        assert!((scored[0].score - 0.5).abs() < 1e-6);
        assert_eq!(
            scored[0].matched_keywords,
            BTreeSet::from(["automotive".to_string()])
        );
    }
}
