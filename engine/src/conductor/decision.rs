//! Decision parsing
//!
//! Turns the planner model's free text into a [`Decision`]. Models do not
//! reliably return clean JSON, so parsing is an ordered list of strategies:
//! a fenced JSON block, the whole text as JSON, a bare `"action": "..."`
//! pattern, and finally a fixed default. The first strategy that produces a
//! decision wins and [`parse`] never fails.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// Explanation attached to decisions recovered from non-JSON output
pub const NON_JSON_EXPLANATION: &str = "Content extracted from non-JSON response.";

/// Handler selected by the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    DatabaseQuery,
    MemoryLookup,
    DirectResponse,
}

impl Action {
    pub const ALL: [Action; 3] = [
        Action::DatabaseQuery,
        Action::MemoryLookup,
        Action::DirectResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::DatabaseQuery => "database_query",
            Action::MemoryLookup => "memory_lookup",
            Action::DirectResponse => "direct_response",
        }
    }

    /// Case-insensitive match on the wire name, ignoring surrounding whitespace
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which strategy produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    FencedJson,
    WholeJson,
    ActionPattern,
    Default,
}

impl DecisionSource {
    /// True for the strategies that did not find structured output
    pub fn is_fallback(&self) -> bool {
        matches!(self, DecisionSource::ActionPattern | DecisionSource::Default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub reasoning: String,
    pub action: Action,
    pub explanation: String,
    pub source: DecisionSource,
}

impl Decision {
    fn from_object(object: &Map<String, Value>, source: DecisionSource) -> Self {
        let action = object
            .get("action")
            .and_then(Value::as_str)
            .and_then(Action::from_name)
            .unwrap_or(Action::DatabaseQuery);

        Self {
            reasoning: text_field(object, "reasoning"),
            action,
            explanation: text_field(object, "explanation"),
            source,
        }
    }

    fn unstructured(raw: &str, action: Action, source: DecisionSource) -> Self {
        Self {
            reasoning: raw.to_string(),
            action,
            explanation: NON_JSON_EXPLANATION.to_string(),
            source,
        }
    }
}

type Strategy = fn(&str) -> Option<Decision>;

/// Tried in order; the first `Some` wins
const STRATEGIES: [Strategy; 3] = [from_fenced_json, from_whole_json, from_action_pattern];

/// Parse planner output into a decision
///
/// Total: any input yields a decision. Output with no recognizable action is
/// routed to `database_query`.
pub fn parse(raw: &str) -> Decision {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(raw))
        .unwrap_or_else(|| Decision::unstructured(raw, Action::DatabaseQuery, DecisionSource::Default))
}

fn fenced_json_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("Invalid fenced JSON pattern")
    })
}

fn action_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""action":\s*"(database_query|memory_lookup|direct_response)""#)
            .expect("Invalid action pattern")
    })
}

fn from_fenced_json(raw: &str) -> Option<Decision> {
    let captured = fenced_json_pattern().captures(raw)?.get(1)?;
    let object = parse_object(captured.as_str())?;
    Some(Decision::from_object(&object, DecisionSource::FencedJson))
}

fn from_whole_json(raw: &str) -> Option<Decision> {
    let object = parse_object(raw.trim())?;
    Some(Decision::from_object(&object, DecisionSource::WholeJson))
}

fn from_action_pattern(raw: &str) -> Option<Decision> {
    let name = action_pattern().captures(raw)?.get(1)?.as_str();
    let action = Action::from_name(name)?;
    Some(Decision::unstructured(raw, action, DecisionSource::ActionPattern))
}

/// Only JSON objects count; arrays and scalars fail the strategy
fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(object) => Some(object),
        _ => None,
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
