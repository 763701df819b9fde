//! Confirmation prompt catalog and control tokens
//!
//! The five catalog texts are rendered verbatim to the user and are part of
//! the conversation protocol: changing a single byte changes what older
//! transcripts mean. Assistant messages created from the catalog carry a
//! [`PromptKind`] tag so the supervisor never has to substring-match them.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Asked after the solution worker finishes
pub const CONFIRM_SOLUTION_TEXT: &str = "I've outlined a step-by-step solution. Do you want to proceed to the **Architecture** phase? \
Reply `yes` to proceed, `no` to revise this solution, 'new' to start a new request, or 'end' to finish.";

/// Asked after the architecture worker finishes
pub const CONFIRM_ARCHITECTURE_TEXT: &str = "Here's the high-level technical architecture. Do you want to proceed to the **Analysis/Research** phase? \
Reply `yes` to proceed, `no` to revise this architecture, 'new' to start a new request, or 'end' to finish.";

/// Asked after the analysis worker finishes
pub const ANALYSIS_COMPLETE_TEXT: &str = "The analysis phase is complete with research insights. Do you have any other questions, \
or would you like to start a new request? Reply with your query, 'new' to start a new solution, or 'end' to finish.";

/// Asked when a confirmation reply could not be resolved
pub const CLARIFICATION_TEXT: &str = "I'm sorry, I didn't quite understand your last response. \
Please reply with 'yes' to proceed, 'no' to revise, 'new' to start a new solution, or 'end' to finish. \
If you have a different question, please state it clearly.";

/// Announced when the pipeline goes back to the start
pub const RESTART_TEXT: &str = "Okay, let's start fresh. What new solution or requirement do you have?";

/// Reserved single-word replies with protocol meaning
pub const CONTROL_TOKENS: [&str; 4] = ["yes", "no", "new", "end"];

/// Which catalog prompt an assistant message was created from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    ConfirmSolution,
    ConfirmArchitecture,
    AnalysisComplete,
    Clarification,
    Restart,
}

impl PromptKind {
    /// All catalog prompts, in catalog order
    pub const ALL: [PromptKind; 5] = [
        PromptKind::ConfirmSolution,
        PromptKind::ConfirmArchitecture,
        PromptKind::AnalysisComplete,
        PromptKind::Clarification,
        PromptKind::Restart,
    ];

    /// The exact text rendered to the user
    pub fn text(&self) -> &'static str {
        match self {
            PromptKind::ConfirmSolution => CONFIRM_SOLUTION_TEXT,
            PromptKind::ConfirmArchitecture => CONFIRM_ARCHITECTURE_TEXT,
            PromptKind::AnalysisComplete => ANALYSIS_COMPLETE_TEXT,
            PromptKind::Clarification => CLARIFICATION_TEXT,
            PromptKind::Restart => RESTART_TEXT,
        }
    }

    /// Whether a human message right after this prompt is a reply the
    /// supervisor must classify. The restart announcement asks for a fresh
    /// requirement instead, so it is not one of them.
    pub fn awaits_decision(&self) -> bool {
        debug!(?self, "PromptKind::awaits_decision: called");
        !matches!(self, PromptKind::Restart)
    }
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PromptKind::ConfirmSolution => "confirm-solution",
            PromptKind::ConfirmArchitecture => "confirm-architecture",
            PromptKind::AnalysisComplete => "analysis-complete",
            PromptKind::Clarification => "clarification",
            PromptKind::Restart => "restart",
        };
        write!(f, "{}", name)
    }
}

/// Lowercase and trim a reply for control-token comparison
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Check whether a reply is one of the reserved control tokens
pub fn is_control_token(text: &str) -> bool {
    let normalized = normalize(text);
    let result = CONTROL_TOKENS.contains(&normalized.as_str());
    debug!(%normalized, result, "is_control_token: called");
    result
}
