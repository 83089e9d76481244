// src/memory/store.rs — SQLite operations

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::infra::errors::{AdReplyError, Result};
use crate::learner::keyword_stats::KeywordStat;
use crate::matching::types::{GroupHistory, Template, TemplateFilter, VariantIndex};

const TEMPLATE_COLUMNS: &str = "id, label, body, variants_json, keywords_json,
     negative_keywords_json, verticals_json, usage_count, created_at, updated_at";

/// Low-level SQLite operations for templates, group history and keyword stats.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    // -- Templates --

    /// Insert or update a template. Usage count and creation time survive updates.
    pub fn upsert_template(&self, template: &Template) -> Result<()> {
        template.validate()?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO templates (id, label, body, variants_json, keywords_json,
             negative_keywords_json, verticals_json, usage_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                label = excluded.label,
                body = excluded.body,
                variants_json = excluded.variants_json,
                keywords_json = excluded.keywords_json,
                negative_keywords_json = excluded.negative_keywords_json,
                verticals_json = excluded.verticals_json,
                updated_at = excluded.updated_at",
            params![
                template.id,
                template.label,
                template.body,
                serde_json::to_string(&template.variants)?,
                serde_json::to_string(&template.keywords)?,
                serde_json::to_string(&template.negative_keywords)?,
                serde_json::to_string(&template.verticals)?,
                template.usage_count as i64,
                template.created_at.to_rfc3339(),
                now
            ],
        )?;
        Ok(())
    }

    pub fn delete_template(&self, id: &str) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM templates WHERE id = ?1", params![id])?;
        Ok(count > 0)
    }

    /// All readable templates. Malformed rows are skipped, not fatal.
    pub fn query_templates(&self, filter: Option<&TemplateFilter>) -> Result<Vec<Template>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates ORDER BY id"
        ))?;

        let rows = stmt.query_map([], TemplateRow::from_row)?;

        let mut result = Vec::new();
        for row in rows {
            match row?.into_template() {
                Ok(t) if filter.map_or(true, |f| f.matches(&t)) => result.push(t),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping malformed template: {}", e),
            }
        }
        Ok(result)
    }

    pub fn query_template(&self, id: &str) -> Result<Option<Template>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1"),
                params![id],
                TemplateRow::from_row,
            )
            .optional()?;

        Ok(row.and_then(|r| match r.into_template() {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!("Skipping malformed template: {}", e);
                None
            }
        }))
    }

    pub fn increment_template_usage(&self, id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let count = self.conn.execute(
            "UPDATE templates SET usage_count = usage_count + 1, updated_at = ?1
             WHERE id = ?2",
            params![now, id],
        )?;
        if count == 0 {
            return Err(AdReplyError::TemplateNotFound { id: id.to_string() });
        }
        Ok(())
    }

    // -- Group History --

    /// Group history, or `None` when absent or structurally invalid.
    pub fn query_group_history(&self, group_id: &str) -> Result<Option<GroupHistory>> {
        let row = self
            .conn
            .query_row(
                "SELECT group_id, last_template_id, last_variant_index, last_used_at,
                 total_comments FROM group_history WHERE group_id = ?1",
                params![group_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((group_id, template_id, variant, used_at, total)) = row else {
            return Ok(None);
        };

        match parse_group_history(group_id, template_id, variant, &used_at, total) {
            Ok(h) => Ok(Some(h)),
            Err(e) => {
                tracing::warn!("Resetting corrupt group history: {}", e);
                Ok(None)
            }
        }
    }

    /// Record a use in a group; creates the row on first use.
    pub fn upsert_group_history(
        &self,
        group_id: &str,
        template_id: &str,
        variant: VariantIndex,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO group_history (group_id, last_template_id, last_variant_index,
             last_used_at, total_comments)
             VALUES (?1, ?2, ?3, ?4, 1)
             ON CONFLICT(group_id) DO UPDATE SET
                last_template_id = excluded.last_template_id,
                last_variant_index = excluded.last_variant_index,
                last_used_at = excluded.last_used_at,
                total_comments = MAX(total_comments, 0) + 1",
            params![group_id, template_id, variant.to_db(), now],
        )?;
        Ok(())
    }

    // -- Keyword Stats --

    /// Stats of one category. Corrupt rows come back in their zero state.
    pub fn query_keyword_stats(&self, category: &str) -> Result<HashMap<String, KeywordStat>> {
        let mut stmt = self.conn.prepare(
            "SELECT keyword, matches, chosen, ignored, updated_at
             FROM keyword_stats WHERE category = ?1",
        )?;

        let rows = stmt.query_map(params![category], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut result = HashMap::new();
        for row in rows {
            let (keyword, matches, chosen, ignored, updated_at) = row?;
            let stat = KeywordStat::from_stored(
                category,
                &keyword,
                matches,
                chosen,
                ignored,
                &updated_at,
            )
            .unwrap_or_else(|e| {
                tracing::warn!("Resetting corrupt keyword stat: {}", e);
                KeywordStat::new(category, &keyword)
            });
            result.insert(keyword, stat);
        }
        Ok(result)
    }

    /// Replace the stats of one category with `stats`.
    pub fn save_keyword_stats(
        &self,
        category: &str,
        stats: &HashMap<String, KeywordStat>,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM keyword_stats WHERE category = ?1",
            params![category],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO keyword_stats (category, keyword, matches, chosen, ignored,
                 score, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (keyword, stat) in stats {
                stmt.execute(params![
                    category,
                    keyword,
                    stat.matches as i64,
                    stat.chosen as i64,
                    stat.ignored as i64,
                    stat.score,
                    stat.updated_at.to_rfc3339()
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn query_keyword_categories(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT category FROM keyword_stats ORDER BY category")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn delete_keyword_category(&self, category: &str) -> Result<usize> {
        let count = self.conn.execute(
            "DELETE FROM keyword_stats WHERE category = ?1",
            params![category],
        )?;
        Ok(count)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn parse_group_history(
    group_id: String,
    last_template_id: String,
    variant: Option<i64>,
    used_at: &str,
    total_comments: i64,
) -> Result<GroupHistory> {
    let corrupt = |message: String| AdReplyError::DataCorruption {
        key: format!("group/{group_id}"),
        message,
    };

    let last_variant =
        VariantIndex::from_db(variant).ok_or_else(|| corrupt(format!("bad variant {variant:?}")))?;
    if total_comments < 0 {
        return Err(corrupt(format!("negative comment count {total_comments}")));
    }
    let last_used_at = DateTime::parse_from_rfc3339(used_at)
        .map_err(|e| corrupt(format!("bad timestamp '{used_at}': {e}")))?
        .with_timezone(&Utc);

    Ok(GroupHistory {
        group_id,
        last_template_id,
        last_variant,
        last_used_at,
        total_comments: total_comments as u64,
    })
}

// -- Row types --

#[derive(Debug, Clone)]
struct TemplateRow {
    id: String,
    label: String,
    body: String,
    variants_json: String,
    keywords_json: String,
    negative_keywords_json: String,
    verticals_json: String,
    usage_count: i64,
    created_at: String,
    updated_at: String,
}

impl TemplateRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            label: row.get(1)?,
            body: row.get(2)?,
            variants_json: row.get(3)?,
            keywords_json: row.get(4)?,
            negative_keywords_json: row.get(5)?,
            verticals_json: row.get(6)?,
            usage_count: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_template(self) -> Result<Template> {
        let corrupt = |message: String| AdReplyError::DataCorruption {
            key: format!("template/{}", self.id),
            message,
        };
        let list = |json: &str, field: &str| -> Result<Vec<String>> {
            serde_json::from_str(json).map_err(|e| corrupt(format!("{field}: {e}")))
        };
        let time = |s: &str| -> Result<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| corrupt(format!("timestamp '{s}': {e}")))
        };

        let template = Template {
            variants: list(&self.variants_json, "variants")?,
            keywords: list(&self.keywords_json, "keywords")?,
            negative_keywords: list(&self.negative_keywords_json, "negative_keywords")?,
            verticals: list(&self.verticals_json, "verticals")?,
            usage_count: self.usage_count.max(0) as u64,
            created_at: time(&self.created_at)?,
            updated_at: time(&self.updated_at)?,
            id: self.id.clone(),
            label: self.label.clone(),
            body: self.body.clone(),
        };
        template.validate()?;
        Ok(template)
    }
}
