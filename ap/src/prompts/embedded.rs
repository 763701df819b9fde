//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Solution stage system prompt
pub const SOLUTION: &str = include_str!("../../prompts/solution.pmt");

/// Architecture stage system prompt
pub const ARCHITECT: &str = include_str!("../../prompts/architect.pmt");

/// Analysis stage system prompt
pub const ANALYSIS: &str = include_str!("../../prompts/analysis.pmt");

/// Requirement rewrite prompt used before the architecture stage
pub const SANITIZE: &str = include_str!("../../prompts/sanitize.pmt");

/// Intent classification prompt
pub const CLASSIFY: &str = include_str!("../../prompts/classify.pmt");

/// Names of every embedded template
pub const NAMES: [&str; 5] = ["solution", "architect", "analysis", "sanitize", "classify"];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "solution" => Some(SOLUTION),
        "architect" => Some(ARCHITECT),
        "analysis" => Some(ANALYSIS),
        "sanitize" => Some(SANITIZE),
        "classify" => Some(CLASSIFY),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
