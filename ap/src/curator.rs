//! Message Log Curator
//!
//! Pure functions that pull signal out of a noisy transcript: the genuine
//! user ask, recent substantive worker output, the core requirement, and a
//! prior stage's document. Protocol chrome (catalog prompts, control tokens,
//! terse acknowledgements) is filtered out using the message kind tags.

use tracing::debug;

use crate::domain::{Message, is_control_token};

/// Human replies this short right after a catalog prompt are treated as
/// acknowledgements, not content
pub const SHORT_REPLY_MAX_CHARS: usize = 8;

/// Number of assistant documents kept by [`collect_recent_context`]
pub const RECENT_CONTEXT_MESSAGES: usize = 3;

/// Minimum word count for a human message to count as the core requirement
pub const CORE_REQUIREMENT_MIN_WORDS: usize = 5;

/// Default character budget for [`collect_recent_context`]
pub const DEFAULT_CONTEXT_MAX_CHARS: usize = 2000;

/// Marker the solution document opens with, used to find it again later
pub const SOLUTION_OUTPUT_MARKER: &str = "restatement of the requirement";

/// Find the most recent human message that carries real content
///
/// Scans backward, skipping control tokens and short replies that directly
/// follow a catalog prompt. Returns the trimmed text.
pub fn extract_real_query(messages: &[Message]) -> Option<String> {
    debug!(message_count = messages.len(), "extract_real_query: called");
    for (i, msg) in messages.iter().enumerate().rev() {
        if !msg.is_human() {
            continue;
        }
        let text = msg.text.trim();
        if is_control_token(text) {
            debug!(index = i, "extract_real_query: skipping control token");
            continue;
        }
        let follows_prompt = i > 0 && messages[i - 1].is_prompt();
        if follows_prompt && text.chars().count() <= SHORT_REPLY_MAX_CHARS {
            debug!(index = i, "extract_real_query: skipping short reply to prompt");
            continue;
        }
        debug!(index = i, "extract_real_query: found query");
        return Some(text.to_string());
    }
    debug!("extract_real_query: no query found");
    None
}

/// Join the last few substantive assistant messages, keeping at most
/// `max_chars` characters from the end
///
/// Catalog prompts are excluded. Truncation counts characters and may cut
/// mid-word.
pub fn collect_recent_context(messages: &[Message], max_chars: usize) -> String {
    debug!(message_count = messages.len(), max_chars, "collect_recent_context: called");
    let chunks: Vec<&str> = messages
        .iter()
        .filter(|m| m.is_assistant() && !m.is_prompt())
        .map(|m| m.text.as_str())
        .collect();

    let start = chunks.len().saturating_sub(RECENT_CONTEXT_MESSAGES);
    let joined = chunks[start..].join("\n\n");

    let total = joined.chars().count();
    if total <= max_chars {
        return joined;
    }
    debug!(total, max_chars, "collect_recent_context: truncating from the left");
    joined.chars().skip(total - max_chars).collect()
}

/// Find the requirement a request is about
///
/// Scans forward for the first human message that is not a control token
/// and has at least [`CORE_REQUIREMENT_MIN_WORDS`] words; otherwise falls back
/// to the most recent human message of any length.
pub fn find_core_requirement(messages: &[Message]) -> Option<String> {
    debug!(message_count = messages.len(), "find_core_requirement: called");
    let qualifying = messages.iter().filter(|m| m.is_human()).find(|m| {
        let text = m.text.trim();
        !text.is_empty() && !is_control_token(text) && text.split_whitespace().count() >= CORE_REQUIREMENT_MIN_WORDS
    });

    if let Some(msg) = qualifying {
        debug!(id = %msg.id, "find_core_requirement: found qualifying message");
        return Some(msg.text.clone());
    }

    debug!("find_core_requirement: falling back to latest human message");
    messages.iter().rev().find(|m| m.is_human()).map(|m| m.text.clone())
}

/// Find the last assistant message containing `marker` (case-insensitive)
pub fn find_prior_output(messages: &[Message], marker: &str) -> Option<String> {
    debug!(message_count = messages.len(), %marker, "find_prior_output: called");
    let marker = marker.to_lowercase();
    messages
        .iter()
        .rev()
        .filter(|m| m.is_assistant())
        .find(|m| m.text.to_lowercase().contains(&marker))
        .map(|m| m.text.clone())
}
