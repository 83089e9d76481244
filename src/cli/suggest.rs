// src/cli/suggest.rs — `adreply suggest` and `adreply use`

use super::CliEngine;
use crate::infra::errors::AdReplyError;
use crate::matching::ranker::{confidence_tier, substitute_placeholders};
use crate::matching::types::{Suggestion, SuggestionOptions, VariantIndex};
use crate::matching::variant::next_variant;
use crate::memory::backend::SuggestionStore;

pub async fn run_suggest(
    engine: &CliEngine,
    group: &str,
    max: Option<usize>,
    text: &[String],
) -> anyhow::Result<()> {
    let post = text.join(" ");
    let suggestions = engine
        .get_suggestions(
            Some(&post),
            group,
            Some(SuggestionOptions {
                max_suggestions: max,
            }),
        )
        .await;

    if suggestions.is_empty() {
        println!("No matching templates.");
        return Ok(());
    }

    for s in &suggestions {
        let keywords: Vec<&str> = s.matched_keywords.iter().map(String::as_str).collect();
        println!(
            "  {}. {:<20} {:>5.2}  {:<8} variant: {}",
            s.rank,
            s.template_id,
            s.score,
            s.confidence.as_str(),
            s.variant,
        );
        println!("     {}", s.text);
        if !keywords.is_empty() {
            println!("     matched: {}", keywords.join(", "));
        }
    }
    Ok(())
}

/// Record a posted template. Without an explicit variant, the group's next
/// variant in rotation is assumed.
pub async fn run_use(
    engine: &CliEngine,
    group: &str,
    template_id: &str,
    variant: Option<usize>,
    base: bool,
) -> anyhow::Result<()> {
    let store = engine.store();
    let template = store
        .get_template(template_id)
        .await?
        .ok_or_else(|| AdReplyError::TemplateNotFound {
            id: template_id.to_string(),
        })?;

    let variant = match (variant, base) {
        (Some(i), _) if i >= template.variants.len() => {
            anyhow::bail!(
                "template '{}' has {} variant(s); index {} is out of range",
                template.id,
                template.variants.len(),
                i
            );
        }
        (Some(i), _) => VariantIndex::Variant(i),
        (None, true) => VariantIndex::Base,
        (None, false) => {
            let history = store.get_group_history(group).await?;
            next_variant(&template, history.as_ref())
        }
    };

    let config = engine.config();
    let suggestion = Suggestion {
        suggestion_id: uuid::Uuid::new_v4().to_string(),
        template_id: template.id.clone(),
        variant,
        text: substitute_placeholders(template.text_for(variant), &config.placeholders),
        score: 1.0,
        matched_keywords: Default::default(),
        category: template.category(),
        rank: 1,
        confidence: confidence_tier(1.0, &config.confidence),
    };

    engine.record_suggestion_usage(&suggestion, group).await?;
    println!(
        "Recorded {} (variant {}) in group {}.",
        template.id, variant, group
    );
    Ok(())
}
