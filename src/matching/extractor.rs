// src/matching/extractor.rs — Keyword extraction from free text

use std::collections::HashSet;

/// Normalized keywords found in a post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedKeywords {
    pub tokens: HashSet<String>,
    /// Token count before de-duplication.
    pub word_count: usize,
}

impl ExtractedKeywords {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// True when every token of a (possibly multi-word) keyword is present.
    pub fn contains_keyword(&self, keyword: &str) -> bool {
        let mut parts = keyword.split(' ').filter(|p| !p.is_empty()).peekable();
        if parts.peek().is_none() {
            return false;
        }
        parts.all(|p| self.tokens.contains(p))
    }
}

/// Split text into lowercase alphanumeric words. Apostrophes join.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if ch == '\'' || ch == '\u{2019}' {
            continue;
        } else if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// Extract the keyword set of a post. Absent or empty text yields an empty set.
pub fn extract_keywords(text: Option<&str>) -> ExtractedKeywords {
    let Some(text) = text else {
        return ExtractedKeywords::default();
    };

    let words = tokenize(text);
    ExtractedKeywords {
        word_count: words.len(),
        tokens: words.into_iter().collect(),
    }
}

/// Canonical form of a declared keyword or tag: its tokens joined by one space.
pub fn normalize_keyword(keyword: &str) -> String {
    tokenize(keyword).join(" ")
}
