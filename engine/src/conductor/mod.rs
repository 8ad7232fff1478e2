//! Conductor System
//!
//! The conversation core: decides which handler a question needs, runs it,
//! and keeps the session's memory. It reaches models and databases only
//! through the sdk capability traits.

pub mod decision;
pub mod dispatcher;
pub mod memory;
pub mod orchestrator;
pub mod prompts;
pub mod session;
pub mod types;

pub use decision::{Action, Decision, DecisionSource};
pub use dispatcher::{DispatchFailure, Dispatcher};
pub use memory::{MemorySearch, MemoryStore};
pub use orchestrator::{
    handle_user_question, ConductorError, ConversationObserver, Orchestrator, SilentObserver,
};
pub use session::{Capabilities, SessionState};
pub use types::{Exchange, RequestState};
