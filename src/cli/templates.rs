// src/cli/templates.rs — Template library management

use std::path::Path;

use serde::Deserialize;

use super::{CliEngine, TemplateAction};
use crate::matching::types::{Template, TemplateFilter};
use crate::memory::backend::SuggestionStore;

/// A template file holds one template or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum TemplateFile {
    Many(Vec<Template>),
    One(Box<Template>),
}

impl TemplateFile {
    fn into_vec(self) -> Vec<Template> {
        match self {
            TemplateFile::Many(v) => v,
            TemplateFile::One(t) => vec![*t],
        }
    }
}

pub fn parse_template_file(content: &str) -> anyhow::Result<Vec<Template>> {
    let file: TemplateFile = serde_json::from_str(content)?;
    let templates = file.into_vec();
    for t in &templates {
        t.validate()?;
    }
    Ok(templates)
}

pub async fn run_templates(engine: &CliEngine, action: TemplateAction) -> anyhow::Result<()> {
    match action {
        TemplateAction::List { vertical } => list(engine, vertical).await,
        TemplateAction::Add { file } => add(engine, &file).await,
        TemplateAction::Remove { id } => {
            if engine.store().inner().delete_template(&id).await? {
                println!("Removed template {id}.");
            } else {
                println!("No template with id {id}.");
            }
            Ok(())
        }
    }
}

async fn list(engine: &CliEngine, vertical: Option<String>) -> anyhow::Result<()> {
    let filter = TemplateFilter { vertical };
    let templates = engine.store().get_templates(Some(&filter)).await?;
    if templates.is_empty() {
        println!("No templates stored.");
        return Ok(());
    }

    println!(
        "  {:<20} {:<28} {:>6} {:>8}  keywords",
        "id", "label", "uses", "variants"
    );
    for t in &templates {
        println!(
            "  {:<20} {:<28} {:>6} {:>8}  {}",
            t.id,
            t.label,
            t.usage_count,
            t.variants.len(),
            t.keywords.join(", ")
        );
    }
    Ok(())
}

async fn add(engine: &CliEngine, file: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(file).await?;
    let templates = parse_template_file(&content)?;
    let count = templates.len();
    for t in templates {
        engine.store().inner().upsert_template(t).await?;
    }
    println!("Stored {count} template(s) from {}.", file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_and_list() {
        let one = r#"{"id": "a", "label": "A", "body": "Hi", "keywords": ["exhaust"]}"#;
        assert_eq!(parse_template_file(one).unwrap().len(), 1);

        let many = r#"[
            {"id": "a", "label": "A", "body": "Hi", "keywords": ["exhaust"]},
            {"id": "b", "label": "B", "body": "Yo", "keywords": ["gym"], "verticals": ["fitness"]}
        ]"#;
        let parsed = parse_template_file(many).unwrap();
        assert_eq!(parsed[1].category(), "fitness");
        assert_eq!(parsed[1].usage_count, 0);
    }

    #[test]
    fn test_parse_rejects_template_without_keywords() {
        let bad = r#"{"id": "a", "label": "A", "body": "Hi", "keywords": []}"#;
        assert!(parse_template_file(bad).is_err());
    }
}
