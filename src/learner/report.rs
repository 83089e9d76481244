// src/learner/report.rs — Keyword performance reporting

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::keyword_stats::{suggested_removals, KeywordStat};

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: String,
    pub keywords: usize,
    pub matches: u64,
    pub chosen: u64,
    pub ignored: u64,
    /// chosen / matches over the whole category.
    pub selection_rate: f64,
    pub top_keywords: Vec<KeywordStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    pub categories: Vec<CategoryReport>,
    pub total_matches: u64,
    pub total_chosen: u64,
    pub total_ignored: u64,
    pub overall_rate: f64,
    pub suggested_removals: Vec<KeywordStat>,
}

/// Options that shape a report.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub top_keywords: usize,
    pub removal_threshold: f64,
    pub removal_min_matches: u64,
}

fn rate(chosen: u64, matches: u64) -> f64 {
    if matches == 0 {
        0.0
    } else {
        chosen as f64 / matches as f64
    }
}

pub fn build_report(
    stats: &BTreeMap<String, HashMap<String, KeywordStat>>,
    options: ReportOptions,
) -> PerformanceReport {
    let mut categories = Vec::with_capacity(stats.len());

    for (category, keywords) in stats {
        let matches: u64 = keywords.values().map(|s| s.matches).sum();
        let chosen: u64 = keywords.values().map(|s| s.chosen).sum();
        let ignored: u64 = keywords.values().map(|s| s.ignored).sum();

        let mut ranked: Vec<KeywordStat> = keywords
            .values()
            .filter(|s| s.matches > 0)
            .cloned()
            .collect();
        ranked.sort_by(|a, b| {
            b.computed_score()
                .partial_cmp(&a.computed_score())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.matches.cmp(&a.matches))
                .then_with(|| a.keyword.cmp(&b.keyword))
        });
        ranked.truncate(options.top_keywords);

        categories.push(CategoryReport {
            category: category.clone(),
            keywords: keywords.len(),
            matches,
            chosen,
            ignored,
            selection_rate: rate(chosen, matches),
            top_keywords: ranked,
        });
    }

    let total_matches = categories.iter().map(|c| c.matches).sum();
    let total_chosen = categories.iter().map(|c| c.chosen).sum();
    let total_ignored = categories.iter().map(|c| c.ignored).sum();

    PerformanceReport {
        generated_at: Utc::now(),
        total_matches,
        total_chosen,
        total_ignored,
        overall_rate: rate(total_chosen, total_matches),
        suggested_removals: suggested_removals(
            stats.values().flat_map(|m| m.values()),
            options.removal_threshold,
            options.removal_min_matches,
        ),
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(category: &str, keyword: &str, matches: u64, chosen: u64, ignored: u64) -> KeywordStat {
        let mut s = KeywordStat::new(category, keyword);
        s.matches = matches;
        s.chosen = chosen;
        s.ignored = ignored;
        s.recompute();
        s
    }

    fn sample() -> BTreeMap<String, HashMap<String, KeywordStat>> {
        let mut stats = BTreeMap::new();
        stats.insert(
            "automotive".to_string(),
            HashMap::from([
                ("exhaust".to_string(), stat("automotive", "exhaust", 50, 35, 10)),
                ("garage".to_string(), stat("automotive", "garage", 30, 1, 25)),
                ("custom".to_string(), stat("automotive", "custom", 0, 0, 0)),
            ]),
        );
        stats.insert(
            "fitness".to_string(),
            HashMap::from([("gym".to_string(), stat("fitness", "gym", 20, 10, 5))]),
        );
        stats
    }

    #[test]
    fn test_report_totals_and_rates() {
        let report = build_report(
            &sample(),
            ReportOptions {
                top_keywords: 5,
                removal_threshold: 0.1,
                removal_min_matches: 20,
            },
        );
        assert_eq!(report.total_matches, 100);
        assert_eq!(report.total_chosen, 46);
        assert_eq!(report.total_ignored, 40);
        assert!((report.overall_rate - 0.46).abs() < 1e-9);

        let auto = &report.categories[0];
        assert_eq!(auto.category, "automotive");
        assert_eq!(auto.keywords, 3);
        assert!((auto.selection_rate - 36.0 / 80.0).abs() < 1e-9);
        // Unmatched keywords are not ranked.
        assert_eq!(auto.top_keywords.len(), 2);
        assert_eq!(auto.top_keywords[0].keyword, "exhaust");
    }

    #[test]
    fn test_report_lists_removals() {
        let report = build_report(
            &sample(),
            ReportOptions {
                top_keywords: 1,
                removal_threshold: 0.1,
                removal_min_matches: 20,
            },
        );
        let removals: Vec<&str> = report
            .suggested_removals
            .iter()
            .map(|s| s.keyword.as_str())
            .collect();
        assert_eq!(removals, vec!["garage"]);
        assert_eq!(report.categories[0].top_keywords.len(), 1);
    }

    #[test]
    fn test_empty_report() {
        let report = build_report(
            &BTreeMap::new(),
            ReportOptions {
                top_keywords: 5,
                removal_threshold: 0.1,
                removal_min_matches: 20,
            },
        );
        assert!(report.categories.is_empty());
        assert_eq!(report.overall_rate, 0.0);
    }
}
