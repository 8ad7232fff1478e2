//! Conversation sessions
//!
//! A [`SessionState`] is everything one conversation owns: its memory, the
//! capabilities it talks to and whether summaries are kept. Sessions share
//! nothing, so several can run side by side.

use super::memory::MemoryStore;
use sdk::capabilities::{DatabaseAgent, LanguageModel, Summarizer};
use std::sync::Arc;

/// Services a session needs to answer questions
#[derive(Clone)]
pub struct Capabilities {
    /// Answering model for memory and direct responses
    pub llm: Arc<dyn LanguageModel>,
    /// Low-temperature model used by the dispatcher
    pub planner: Arc<dyn LanguageModel>,
    pub database: Arc<dyn DatabaseAgent>,
    /// Only needed in summary mode
    pub summarizer: Option<Arc<dyn Summarizer>>,
}

pub struct SessionState {
    id: String,
    memory: MemoryStore,
    capabilities: Option<Capabilities>,
    summary_mode: bool,
}

impl SessionState {
    /// A session with no capabilities yet; questions are refused until
    /// [`SessionState::initialize`] is called
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            memory: MemoryStore::new(),
            capabilities: None,
            summary_mode: false,
        }
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        let mut session = Self::new();
        session.initialize(capabilities);
        session
    }

    pub fn with_summary_mode(mut self, enabled: bool) -> Self {
        self.summary_mode = enabled;
        self
    }

    /// Attach capabilities, replacing any previous ones. Memory is kept.
    pub fn initialize(&mut self, capabilities: Capabilities) {
        tracing::info!("Session {} initialized", self.id);
        self.capabilities = Some(capabilities);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_initialized(&self) -> bool {
        self.capabilities.is_some()
    }

    pub fn summary_mode(&self) -> bool {
        self.summary_mode
    }

    pub fn set_summary_mode(&mut self, enabled: bool) {
        self.summary_mode = enabled;
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub(crate) fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut self.memory
    }

    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.capabilities.as_ref()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
