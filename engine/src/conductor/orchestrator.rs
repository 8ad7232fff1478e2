//! Orchestrator
//!
//! Runs one question through the conversation:
//!
//! ```text
//! Received -> Dispatched -> Parsed -> Routed -> Answered -> Committed
//! ```
//!
//! Only two things stop a question short of `Committed`: a session without
//! capabilities, and a planner model that cannot be reached. Every handler
//! failure after a decision is made becomes answer text and is committed like
//! any other answer, so the conversation always continues.

use super::decision::{self, Action, Decision};
use super::dispatcher::{DispatchFailure, Dispatcher};
use super::memory::MemorySearch;
use super::prompts;
use super::session::{Capabilities, SessionState};
use super::types::{Exchange, RequestState};
use crate::secrets::SecretManager;
use sdk::capabilities::DatabaseAgentError;
use sdk::types::Turn;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Shown in verbose mode when the planner reply needed a fallback parse
pub const FALLBACK_NOTICE: &str =
    "Note: Planner output was not formatted as valid JSON, but I was able to process it.";

/// Substituted for blank answers
pub const EMPTY_ANSWER: &str = "The assistant returned an empty response.";

#[derive(Debug, Error)]
pub enum ConductorError {
    #[error("Please configure and connect to the database first.")]
    NotInitialized,

    #[error(transparent)]
    Dispatch(#[from] DispatchFailure),
}

/// Receives progress reports in verbose mode. Both hooks default to no-ops.
pub trait ConversationObserver: Send + Sync {
    fn on_decision(&self, _decision: &Decision) {}

    fn on_notice(&self, _notice: &str) {}
}

/// Observer that ignores everything
pub struct SilentObserver;

impl ConversationObserver for SilentObserver {}

pub struct Orchestrator {
    observer: Arc<dyn ConversationObserver>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            observer: Arc::new(SilentObserver),
        }
    }

    pub fn with_observer(observer: Arc<dyn ConversationObserver>) -> Self {
        Self { observer }
    }

    /// Answer `question` and return only the answer text
    pub async fn handle_user_question(
        &self,
        session: &mut SessionState,
        question: &str,
        verbose: bool,
    ) -> Result<String, ConductorError> {
        Ok(self.process_question(session, question, verbose).await?.answer)
    }

    /// Answer `question`, returning the decision alongside the answer
    pub async fn process_question(
        &self,
        session: &mut SessionState,
        question: &str,
        verbose: bool,
    ) -> Result<Exchange, ConductorError> {
        let capabilities = session
            .capabilities()
            .cloned()
            .ok_or(ConductorError::NotInitialized)?;
        let mut state = RequestState::Received;
        debug!("Session {}: {}", session.id(), state);

        let raw = match Dispatcher::new(Arc::clone(&capabilities.planner))
            .decide(question)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                error!("Dispatch failed: {}", e);
                return Err(e.into());
            }
        };
        state = advance(state, RequestState::Dispatched);

        let decision = decision::parse(&raw);
        state = advance(state, RequestState::Parsed);
        debug!(
            "Decision: action={} source={:?}",
            decision.action, decision.source
        );
        if decision.source.is_fallback() {
            warn!("Planner output was not valid JSON; using {:?} strategy", decision.source);
        }
        if verbose {
            self.observer.on_decision(&decision);
            if decision.source.is_fallback() {
                self.observer.on_notice(FALLBACK_NOTICE);
            }
        }

        let answer = route(&capabilities, session, &decision, question).await;
        state = advance(state, RequestState::Routed);

        let answer = if answer.trim().is_empty() {
            EMPTY_ANSWER.to_string()
        } else {
            answer
        };
        state = advance(state, RequestState::Answered);

        commit(session, &capabilities, question, &answer).await;
        state = advance(state, RequestState::Committed);

        Ok(Exchange {
            decision,
            answer,
            state,
        })
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Answer `question` with no observer attached
pub async fn handle_user_question(
    session: &mut SessionState,
    question: &str,
    verbose: bool,
) -> Result<String, ConductorError> {
    Orchestrator::new()
        .handle_user_question(session, question, verbose)
        .await
}

fn advance(from: RequestState, to: RequestState) -> RequestState {
    debug!("{} -> {}", from, to);
    to
}

/// Run the handler chosen by `decision`. Failures come back as answer text.
async fn route(
    capabilities: &Capabilities,
    session: &SessionState,
    decision: &Decision,
    question: &str,
) -> String {
    match decision.action {
        Action::DatabaseQuery => match capabilities.database.answer(question).await {
            Ok(answer) => answer,
            Err(DatabaseAgentError::OutputParse { raw }) => {
                warn!("Database agent output could not be parsed");
                SecretManager::scrub(&format!(
                    "An error occurred while interpreting the response. \
                     Trying to extract the useful information:\n\n{}",
                    raw
                ))
            }
            Err(e) => {
                warn!("Database agent failed: {}", e);
                SecretManager::scrub(&format!("Query error: {}", e))
            }
        },
        Action::MemoryLookup => {
            let memory_result = session.memory().search(question);
            let prompt = prompts::render_memory_search(&memory_result, question);
            generate_or_explain(capabilities, &prompt).await
        }
        Action::DirectResponse => {
            let prompt = prompts::render_direct_response(question);
            generate_or_explain(capabilities, &prompt).await
        }
    }
}

async fn generate_or_explain(capabilities: &Capabilities, prompt: &str) -> String {
    match capabilities.llm.generate(prompt).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Answering model failed: {}", e);
            SecretManager::scrub(&format!("Error processing the query: {}", e))
        }
    }
}

/// Record both turns, then refresh the summary when enabled
async fn commit(
    session: &mut SessionState,
    capabilities: &Capabilities,
    question: &str,
    answer: &str,
) {
    let memory = session.memory_mut();
    memory.append(Turn::human(question));
    memory.append(Turn::assistant(answer));

    if !session.summary_mode() {
        return;
    }
    if let Some(summarizer) = &capabilities.summarizer {
        if let Err(e) = session.memory_mut().summarize(summarizer.as_ref()).await {
            warn!("Summary refresh failed, keeping previous summary: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uninitialized_session_is_refused() {
        let mut session = SessionState::new();
        let err = handle_user_question(&mut session, "Show the last 5 users", false)
            .await
            .unwrap_err();

        assert!(matches!(err, ConductorError::NotInitialized));
        assert_eq!(
            err.to_string(),
            "Please configure and connect to the database first."
        );
        assert!(session.memory().is_empty());
    }

    #[test]
    fn test_states_are_ordered() {
        assert!(RequestState::Received < RequestState::Dispatched);
        assert!(RequestState::Answered < RequestState::Committed);
    }
}
