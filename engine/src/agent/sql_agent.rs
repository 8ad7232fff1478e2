//! SQL agent
//!
//! Answers data questions in three steps: ask the model for a query grounded
//! in the real schema, run it read-only, and ask the model to phrase the rows
//! as an answer.

use crate::conductor::prompts;
use crate::db::Database;
use async_trait::async_trait;
use regex::Regex;
use sdk::capabilities::{DatabaseAgent, DatabaseAgentError, LanguageModel};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Default row cap for agent queries
pub const DEFAULT_MAX_ROWS: usize = 50;

pub struct SqlAgent {
    database: Arc<Database>,
    llm: Arc<dyn LanguageModel>,
    max_rows: usize,
}

impl SqlAgent {
    pub fn new(database: Arc<Database>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            database,
            llm,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }
}

#[async_trait]
impl DatabaseAgent for SqlAgent {
    async fn answer(&self, question: &str) -> Result<String, DatabaseAgentError> {
        let schema = self
            .database
            .schema_description()
            .await
            .map_err(|e| DatabaseAgentError::Query(format!("{:#}", e)))?;

        let reply = self
            .llm
            .generate(&prompts::render_sql_generation(&schema, question))
            .await?;

        let sql = extract_sql(&reply).ok_or_else(|| DatabaseAgentError::OutputParse {
            raw: reply.clone(),
        })?;
        info!("Generated SQL: {}", sql);

        let rows = self
            .database
            .run_read_query(&sql, self.max_rows)
            .await
            .map_err(|e| DatabaseAgentError::Query(format!("{:#}", e)))?;
        debug!("Query returned {} rows", rows.rows.len());

        let answer = self
            .llm
            .generate(&prompts::render_sql_answer(question, &sql, &rows.to_string()))
            .await?;
        Ok(answer)
    }
}

fn plain_sql_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?im)^\s*(?:SQL(?:Query)?:\s*)?((?:SELECT|WITH)\b[^;]*)")
            .expect("Invalid SQL pattern")
    })
}

/// Pull the query out of a model reply
///
/// A fenced code block wins; otherwise the first line starting with
/// `SELECT` or `WITH` is taken up to a `;` or a blank line. Returns `None`
/// when the reply holds no query.
pub fn extract_sql(reply: &str) -> Option<String> {
    if let Some(body) = extract_fenced_block(reply) {
        let sql = body.trim().trim_end_matches(';').trim();
        if !sql.is_empty() {
            return Some(sql.to_string());
        }
    }

    let captured = plain_sql_pattern().captures(reply)?.get(1)?.as_str();
    let sql = captured
        .split("\n\n")
        .next()
        .unwrap_or(captured)
        .trim();

    (!sql.is_empty()).then(|| sql.to_string())
}

/// Body of the first ``` fence, skipping the language tag line
fn extract_fenced_block(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    let body_start = fence_start + 3 + after_opening.find('\n')? + 1;
    let closing = content[body_start..].find("```")?;

    Some(&content[body_start..body_start + closing])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_sql_fence() {
        let reply = "Here you go:\n```sql\nSELECT name FROM users ORDER BY id DESC LIMIT 5;\n```\n";
        assert_eq!(
            extract_sql(reply).as_deref(),
            Some("SELECT name FROM users ORDER BY id DESC LIMIT 5")
        );
    }

    #[test]
    fn test_extract_from_untagged_fence() {
        let reply = "```\nSELECT 1\n```";
        assert_eq!(extract_sql(reply).as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn test_extract_plain_select() {
        let reply = "SELECT COUNT(*)\nFROM orders;\nThat counts the orders.";
        assert_eq!(extract_sql(reply).as_deref(), Some("SELECT COUNT(*)\nFROM orders"));
    }

    #[test]
    fn test_extract_with_prefix_and_trailing_prose() {
        let reply = "SQLQuery: WITH t AS (SELECT 1) SELECT * FROM t\n\nThis returns one row.";
        assert_eq!(
            extract_sql(reply).as_deref(),
            Some("WITH t AS (SELECT 1) SELECT * FROM t")
        );
    }

    #[test]
    fn test_prose_mentioning_select_is_not_sql() {
        assert_eq!(extract_sql("I would select the users table."), None);
        assert_eq!(extract_sql("I don't know how to answer that."), None);
    }

    #[test]
    fn test_empty_fence_falls_back_to_plain_text() {
        let reply = "```sql\n```\nSELECT 2";
        assert_eq!(extract_sql(reply).as_deref(), Some("SELECT 2"));
    }
}
