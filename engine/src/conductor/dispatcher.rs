//! Dispatcher
//!
//! Asks the planner model which handler a question needs. The raw reply is
//! returned untouched; interpreting it is the job of [`super::decision`].

use super::prompts;
use sdk::capabilities::{CapabilityError, LanguageModel};
use std::sync::Arc;
use thiserror::Error;

/// The planner model could not be reached or refused the request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Dispatch failed: {0}")]
pub struct DispatchFailure(#[from] pub CapabilityError);

pub struct Dispatcher {
    planner: Arc<dyn LanguageModel>,
}

impl Dispatcher {
    pub fn new(planner: Arc<dyn LanguageModel>) -> Self {
        Self { planner }
    }

    /// Send the dispatch prompt for `question` and return the model output
    pub async fn decide(&self, question: &str) -> Result<String, DispatchFailure> {
        let prompt = prompts::render_dispatch(question);
        let raw = self.planner.generate(&prompt).await?;
        tracing::debug!("Planner output: {}", raw);
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingModel {
        reply: Result<String, CapabilityError>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn generate(&self, prompt: &str) -> Result<String, CapabilityError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn test_decide_returns_raw_output() {
        let model = Arc::new(RecordingModel {
            reply: Ok("  not json at all ".to_string()),
            prompts: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(model.clone());

        let raw = dispatcher.decide("How does this system work?").await.unwrap();
        assert_eq!(raw, "  not json at all ");

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("User question: How does this system work?"));
    }

    #[tokio::test]
    async fn test_model_failure_becomes_dispatch_failure() {
        let dispatcher = Dispatcher::new(Arc::new(RecordingModel {
            reply: Err(CapabilityError::Timeout),
            prompts: Mutex::new(Vec::new()),
        }));

        let err = dispatcher.decide("anything").await.unwrap_err();
        assert_eq!(err, DispatchFailure(CapabilityError::Timeout));
    }
}
