//! Conversation memory
//!
//! An append-only log of human and assistant turns plus an optional running
//! summary. Memory lives as long as the session that owns it.

use sdk::capabilities::{CapabilityError, Summarizer};
use sdk::types::Turn;

/// Returned by [`MemoryStore::search`] before anything has been said
pub const EMPTY_MEMORY: &str = "No previous conversation memory available.";

/// Text lookup over stored conversation
pub trait MemorySearch {
    /// Render what memory knows that is relevant to `query`
    fn search(&self, query: &str) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    turns: Vec<Turn>,
    summary: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn to the end of the log
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Rebuild the summary from the full log
    ///
    /// The new summary replaces the old one. On failure the previous summary
    /// is left in place.
    pub async fn summarize(&mut self, summarizer: &dyn Summarizer) -> Result<String, CapabilityError> {
        let summary = summarizer.summarize(&self.turns).await?;
        tracing::debug!("Conversation summary refreshed ({} chars)", summary.len());
        self.summary = Some(summary.clone());
        Ok(summary)
    }
}

impl MemorySearch for MemoryStore {
    /// Dumps every stored turn and the summary. The query is not used for
    /// ranking.
    fn search(&self, _query: &str) -> String {
        if self.turns.is_empty() {
            return EMPTY_MEMORY.to_string();
        }

        let mut result = String::from("Relevant information from conversation:\n");
        for turn in &self.turns {
            result.push_str(&format!("{}: {}\n\n", turn.role(), turn.content()));
        }
        if let Some(summary) = &self.summary {
            result.push_str(&format!("Conversation summary: {}\n\n", summary));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedSummarizer(Result<String, CapabilityError>);

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn summarize(&self, _turns: &[Turn]) -> Result<String, CapabilityError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_empty_search_returns_literal() {
        let memory = MemoryStore::new();
        assert_eq!(memory.search(""), EMPTY_MEMORY);
        assert_eq!(memory.search("what did you show me?"), EMPTY_MEMORY);
    }

    #[test]
    fn test_search_dumps_all_turns_in_order() {
        let mut memory = MemoryStore::new();
        memory.append(Turn::human("Show the last 5 users"));
        memory.append(Turn::assistant("Ada, Grace, Linus"));

        assert_eq!(
            memory.search("unrelated"),
            "Relevant information from conversation:\n\
             human: Show the last 5 users\n\n\
             assistant: Ada, Grace, Linus\n\n"
        );
        assert_eq!(memory.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_replaces_and_is_appended_to_search() {
        let mut memory = MemoryStore::new();
        memory.append(Turn::human("hi"));

        memory
            .summarize(&FixedSummarizer(Ok("first".into())))
            .await
            .unwrap();
        memory
            .summarize(&FixedSummarizer(Ok("second".into())))
            .await
            .unwrap();

        assert_eq!(memory.summary(), Some("second"));
        assert!(memory
            .search("")
            .ends_with("human: hi\n\nConversation summary: second\n\n"));
    }

    #[tokio::test]
    async fn test_failed_summary_keeps_previous() {
        let mut memory = MemoryStore::new();
        memory.append(Turn::human("hi"));
        memory
            .summarize(&FixedSummarizer(Ok("kept".into())))
            .await
            .unwrap();

        let result = memory
            .summarize(&FixedSummarizer(Err(CapabilityError::Timeout)))
            .await;

        assert_eq!(result, Err(CapabilityError::Timeout));
        assert_eq!(memory.summary(), Some("kept"));
    }
}
