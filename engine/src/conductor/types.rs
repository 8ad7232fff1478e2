//! Conductor Types

use super::decision::Decision;
use serde::Serialize;
use std::fmt;

/// Progress of one question through the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Received,
    Dispatched,
    Parsed,
    Routed,
    Answered,
    Committed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Received => "received",
            RequestState::Dispatched => "dispatched",
            RequestState::Parsed => "parsed",
            RequestState::Routed => "routed",
            RequestState::Answered => "answered",
            RequestState::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// Result of a processed question
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub decision: Decision,
    pub answer: String,
    /// Last state reached; `Committed` for every returned exchange
    pub state: RequestState,
}
