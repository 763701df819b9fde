//! Domain types for archpilot
//!
//! Core domain types: Message, Transcript, Phase, Stage, Route, SessionState,
//! and the confirmation prompt catalog that ties the protocol together.

mod catalog;
mod message;
mod phase;
mod session;

pub use catalog::{
    ANALYSIS_COMPLETE_TEXT, CLARIFICATION_TEXT, CONFIRM_ARCHITECTURE_TEXT, CONFIRM_SOLUTION_TEXT, CONTROL_TOKENS,
    PromptKind, RESTART_TEXT, is_control_token, normalize,
};
pub use message::{Message, MessageId, MessageKind, Role, Transcript};
pub use phase::{Phase, Route, Stage};
pub use session::{SessionId, SessionState};
