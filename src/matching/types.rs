// src/matching/types.rs — Template, group history and suggestion types

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::infra::errors::{AdReplyError, Result};
use crate::matching::extractor::normalize_keyword;

/// Learning category for templates that carry no vertical tag.
pub const DEFAULT_CATEGORY: &str = "general";

/// A reusable suggested reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub label: String,
    /// Base text; may contain `{name}` placeholders.
    pub body: String,
    #[serde(default)]
    pub variants: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub negative_keywords: Vec<String>,
    /// Ordered tags; the first one is the learning category.
    #[serde(default)]
    pub verticals: Vec<String>,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn new(id: impl Into<String>, label: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            label: label.into(),
            body: body.into(),
            variants: Vec::new(),
            keywords: Vec::new(),
            negative_keywords: Vec::new(),
            verticals: Vec::new(),
            usage_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_negative_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.negative_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_verticals<I, S>(mut self, verticals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.verticals = verticals.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_variants<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variants = variants.into_iter().map(Into::into).collect();
        self
    }

    /// Category under which this template's keyword statistics are recorded.
    pub fn category(&self) -> String {
        self.verticals
            .iter()
            .map(|v| normalize_keyword(v))
            .find(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
    }

    /// Normalized positive keywords plus vertical tags, used for similarity.
    pub fn signature(&self) -> BTreeSet<String> {
        self.keywords
            .iter()
            .chain(self.verticals.iter())
            .map(|k| normalize_keyword(k))
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Text for a given variant; stale indices fall back to the base text.
    pub fn text_for(&self, variant: VariantIndex) -> &str {
        match variant {
            VariantIndex::Variant(i) => self.variants.get(i).map_or(self.body.as_str(), String::as_str),
            VariantIndex::Base => &self.body,
        }
    }

    /// Write-boundary validation.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AdReplyError::Validation("template id is empty".into()));
        }
        if self.body.trim().is_empty() {
            return Err(AdReplyError::Validation(format!(
                "template '{}' has an empty body",
                self.id
            )));
        }
        if self.keywords.is_empty() {
            return Err(AdReplyError::Validation(format!(
                "template '{}' declares no keywords",
                self.id
            )));
        }
        let lists = [
            ("keywords", &self.keywords),
            ("negative_keywords", &self.negative_keywords),
            ("verticals", &self.verticals),
        ];
        for (name, list) in lists {
            if list.iter().any(|k| normalize_keyword(k).is_empty()) {
                return Err(AdReplyError::Validation(format!(
                    "template '{}' has an empty entry in {}",
                    self.id, name
                )));
            }
        }
        if self.variants.iter().any(|v| v.trim().is_empty()) {
            return Err(AdReplyError::Validation(format!(
                "template '{}' has an empty variant",
                self.id
            )));
        }
        Ok(())
    }
}

/// Which wording of a template was (or will be) used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantIndex {
    Base,
    Variant(usize),
}

impl VariantIndex {
    /// Nullable storage form: NULL means base text.
    pub fn to_db(self) -> Option<i64> {
        match self {
            VariantIndex::Base => None,
            VariantIndex::Variant(i) => Some(i as i64),
        }
    }

    pub fn from_db(value: Option<i64>) -> Option<Self> {
        match value {
            None => Some(VariantIndex::Base),
            Some(i) if i >= 0 => Some(VariantIndex::Variant(i as usize)),
            Some(_) => None,
        }
    }
}

impl fmt::Display for VariantIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantIndex::Base => write!(f, "base"),
            VariantIndex::Variant(i) => write!(f, "{i}"),
        }
    }
}

/// Rotation state for one conversation group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupHistory {
    pub group_id: String,
    pub last_template_id: String,
    pub last_variant: VariantIndex,
    pub last_used_at: DateTime<Utc>,
    pub total_comments: u64,
}

/// Coarse human-readable bucket derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &str {
        match self {
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
            ConfidenceTier::VeryLow => "very_low",
        }
    }
}

/// A ranked, rendered suggestion. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Pairs a shown suggestion with its later selection or ignore timeout.
    pub suggestion_id: String,
    pub template_id: String,
    pub variant: VariantIndex,
    pub text: String,
    pub score: f32,
    pub matched_keywords: BTreeSet<String>,
    /// Learning category the matched keywords are recorded under.
    pub category: String,
    pub rank: usize,
    pub confidence: ConfidenceTier,
}

/// Per-call overrides for `get_suggestions`.
#[derive(Debug, Clone, Default)]
pub struct SuggestionOptions {
    pub max_suggestions: Option<usize>,
}

/// Optional narrowing for template reads.
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    pub vertical: Option<String>,
}

impl TemplateFilter {
    pub fn matches(&self, template: &Template) -> bool {
        match &self.vertical {
            Some(v) => {
                let wanted = normalize_keyword(v);
                template
                    .verticals
                    .iter()
                    .any(|t| normalize_keyword(t) == wanted)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exhaust_template() -> Template {
        Template::new("t-1", "Exhaust shop", "Check out {site}")
            .with_keywords(["exhaust", "garage"])
            .with_verticals(["Automotive", "motorcycles"])
    }

    #[test]
    fn test_category_is_first_vertical() {
        assert_eq!(exhaust_template().category(), "automotive");
    }

    #[test]
    fn test_category_defaults_without_verticals() {
        let t = Template::new("t-2", "x", "y").with_keywords(["a"]);
        assert_eq!(t.category(), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_signature_merges_keywords_and_verticals() {
        let sig = exhaust_template().signature();
        let expected: BTreeSet<String> = ["exhaust", "garage", "automotive", "motorcycles"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(sig, expected);
    }

    #[test]
    fn test_text_for_stale_variant_falls_back() {
        let t = exhaust_template().with_variants(["Variant A"]);
        assert_eq!(t.text_for(VariantIndex::Variant(0)), "Variant A");
        assert_eq!(t.text_for(VariantIndex::Variant(7)), "Check out {site}");
        assert_eq!(t.text_for(VariantIndex::Base), "Check out {site}");
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(exhaust_template().validate().is_ok());

        let no_id = Template::new(" ", "x", "body").with_keywords(["a"]);
        assert!(matches!(no_id.validate(), Err(AdReplyError::Validation(_))));

        let no_body = Template::new("t", "x", "").with_keywords(["a"]);
        assert!(no_body.validate().is_err());

        let no_keywords = Template::new("t", "x", "body");
        assert!(no_keywords.validate().is_err());

        let blank_keyword = Template::new("t", "x", "body").with_keywords(["a", "!!"]);
        assert!(blank_keyword.validate().is_err());
    }

    #[test]
    fn test_variant_index_db_form() {
        assert_eq!(VariantIndex::Base.to_db(), None);
        assert_eq!(VariantIndex::Variant(2).to_db(), Some(2));
        assert_eq!(VariantIndex::from_db(None), Some(VariantIndex::Base));
        assert_eq!(VariantIndex::from_db(Some(1)), Some(VariantIndex::Variant(1)));
        assert_eq!(VariantIndex::from_db(Some(-3)), None);
    }

    #[test]
    fn test_template_json_defaults() {
        let json = r#"{"id":"t","label":"L","body":"B","keywords":["x"]}"#;
        let t: Template = serde_json::from_str(json).unwrap();
        assert!(t.variants.is_empty());
        assert_eq!(t.usage_count, 0);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_filter_by_vertical() {
        let t = exhaust_template();
        let f = TemplateFilter {
            vertical: Some("automotive".into()),
        };
        assert!(f.matches(&t));
        let f = TemplateFilter {
            vertical: Some("fitness".into()),
        };
        assert!(!f.matches(&t));
        assert!(TemplateFilter::default().matches(&t));
    }
}
