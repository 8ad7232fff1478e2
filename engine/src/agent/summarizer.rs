use crate::conductor::prompts;
use async_trait::async_trait;
use sdk::capabilities::{CapabilityError, LanguageModel, Summarizer};
use sdk::types::Turn;
use std::sync::Arc;

/// Summarizes a conversation with the answering model
pub struct LlmSummarizer {
    llm: Arc<dyn LanguageModel>,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, turns: &[Turn]) -> Result<String, CapabilityError> {
        if turns.is_empty() {
            return Ok(String::new());
        }

        let transcript = turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role(), turn.content()))
            .collect::<Vec<_>>()
            .join("\n");

        let summary = self.llm.generate(&prompts::render_summary(&transcript)).await?;
        Ok(summary.trim().to_string())
    }
}
