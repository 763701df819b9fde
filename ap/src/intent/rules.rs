//! Keyword rules for confirmation replies

use async_trait::async_trait;
use tracing::debug;

use super::{Decision, IntentResolver, ResolveError};

/// Replies longer than this are left to a smarter backing
pub const MAX_RULE_WORDS: usize = 6;

const END_PHRASES: &[&str] = &[
    "end", "quit", "exit", "stop", "bye", "goodbye", "finish", "finished", "that's all", "thats all", "end session",
    "we're done", "i'm done",
];

const NEW_PHRASES: &[&str] = &[
    "new", "restart", "start over", "start again", "start fresh", "new request", "new query", "new question",
    "something else", "different requirement",
];

const REVISE_PHRASES: &[&str] = &[
    "no", "nope", "nah", "redo", "revise", "retry", "regenerate", "rework", "wrong", "again", "change it", "fix it",
    "not good", "not right", "try again", "don't proceed", "dont proceed",
];

const PROCEED_PHRASES: &[&str] = &[
    "yes", "y", "yeah", "yep", "yup", "sure", "ok", "okay", "proceed", "continue", "next", "go ahead", "go on",
    "looks good", "sounds good", "lgtm", "approve", "approved", "perfect", "great", "let's go", "lets go",
];

/// Proceed phrases that contain a revise word
const AFFIRMATIVE_NEGATIONS: &[&str] = &[
    "no problem", "no problems", "no changes", "no issues", "no complaints", "no objections", "nothing to change",
];

/// Phrases that reuse a keyword without meaning it
const NEUTRAL_PHRASES: &[&str] = &["end to end", "front end", "back end", "end user", "end users"];

/// Deterministic keyword classifier
///
/// Longer phrases are matched first and consume their words, so "no problem"
/// proceeds and "end to end" means nothing. A reply whose phrases point at
/// more than one decision ("yes, but use a new database") is left unplaced.
/// Anything unplaced is `clarify`.
#[derive(Debug, Clone, Default)]
pub struct RuleResolver;

impl RuleResolver {
    pub fn new() -> Self {
        Self
    }

    /// Match a reply against the rule table, `None` when no single decision applies
    pub fn match_rules(&self, text: &str) -> Option<Decision> {
        debug!(%text, "RuleResolver::match_rules: called");
        let words = tokenize(text);
        if words.is_empty() {
            debug!("RuleResolver::match_rules: empty reply");
            return None;
        }
        if words.len() > MAX_RULE_WORDS {
            debug!(word_count = words.len(), "RuleResolver::match_rules: too long for rules");
            return None;
        }

        let mut padded = format!(" {} ", words.join(" "));
        let mut matched: Vec<Decision> = Vec::new();
        for (phrase, decision) in phrase_table() {
            let needle = format!(" {} ", phrase);
            if !padded.contains(&needle) {
                continue;
            }
            padded = padded.replace(&needle, " | ");
            if let Some(decision) = decision
                && !matched.contains(&decision)
            {
                matched.push(decision);
            }
        }

        match matched.as_slice() {
            [] => {
                debug!("RuleResolver::match_rules: no rule matched");
                None
            }
            [decision] => {
                debug!(%decision, "RuleResolver::match_rules: matched");
                Some(*decision)
            }
            _ => {
                debug!(?matched, "RuleResolver::match_rules: conflicting phrases");
                None
            }
        }
    }
}

/// Every phrase with its decision (`None` for neutral phrases), longest first
fn phrase_table() -> Vec<(&'static str, Option<Decision>)> {
    let groups = [
        (NEUTRAL_PHRASES, None),
        (AFFIRMATIVE_NEGATIONS, Some(Decision::ProceedToNextPhase)),
        (END_PHRASES, Some(Decision::EndSession)),
        (NEW_PHRASES, Some(Decision::StartNewQuery)),
        (REVISE_PHRASES, Some(Decision::ReviseCurrentPhase)),
        (PROCEED_PHRASES, Some(Decision::ProceedToNextPhase)),
    ];
    let mut table: Vec<_> = groups
        .iter()
        .flat_map(|(phrases, decision)| phrases.iter().map(move |p| (*p, *decision)))
        .collect();
    table.sort_by_key(|(phrase, _)| std::cmp::Reverse(phrase.split(' ').count()));
    table
}

/// Lowercase words, keeping apostrophes inside words
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl IntentResolver for RuleResolver {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn classify(&self, text: &str) -> Result<Decision, ResolveError> {
        Ok(self.match_rules(text).unwrap_or(Decision::Clarify))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(text: &str) -> Option<Decision> {
        RuleResolver::new().match_rules(text)
    }

    #[test]
    fn test_control_tokens() {
        assert_eq!(rule("yes"), Some(Decision::ProceedToNextPhase));
        assert_eq!(rule("no"), Some(Decision::ReviseCurrentPhase));
        assert_eq!(rule("new"), Some(Decision::StartNewQuery));
        assert_eq!(rule("end"), Some(Decision::EndSession));
    }

    #[test]
    fn test_case_and_punctuation_are_ignored() {
        assert_eq!(rule("  YES!! "), Some(Decision::ProceedToNextPhase));
        assert_eq!(rule("End."), Some(Decision::EndSession));
    }

    #[test]
    fn test_several_revise_words() {
        assert_eq!(rule("looks wrong, redo"), Some(Decision::ReviseCurrentPhase));
    }

    #[test]
    fn test_conflicting_decisions_are_unplaced() {
        assert_eq!(rule("no, start over"), None);
        assert_eq!(rule("yes, but use a new database"), None);
        assert_eq!(rule("yes, end it"), None);
    }

    #[test]
    fn test_affirmative_negations_proceed() {
        assert_eq!(rule("no problem, go ahead"), Some(Decision::ProceedToNextPhase));
        assert_eq!(rule("ok, no changes needed"), Some(Decision::ProceedToNextPhase));
        assert_eq!(rule("no problem"), Some(Decision::ProceedToNextPhase));
    }

    #[test]
    fn test_neutral_phrases_do_not_count() {
        assert_eq!(rule("yes, end to end encryption please"), Some(Decision::ProceedToNextPhase));
        assert_eq!(rule("front end looks good"), Some(Decision::ProceedToNextPhase));
        assert_eq!(rule("end to end"), None);
    }

    #[tokio::test]
    async fn test_classify_conflict_is_clarify() {
        let resolver = RuleResolver::new();
        assert_eq!(resolver.classify("yes, but use a new database").await.unwrap(), Decision::Clarify);
    }

    #[test]
    fn test_phrases() {
        assert_eq!(rule("looks good to me"), Some(Decision::ProceedToNextPhase));
        assert_eq!(rule("go ahead"), Some(Decision::ProceedToNextPhase));
        assert_eq!(rule("that's all"), Some(Decision::EndSession));
        assert_eq!(rule("try again please"), Some(Decision::ReviseCurrentPhase));
    }

    #[test]
    fn test_words_inside_other_words_do_not_match() {
        assert_eq!(rule("backend"), None);
        assert_eq!(rule("newsletter"), None);
        assert_eq!(rule("yesterday"), None);
    }

    #[test]
    fn test_unmatched_and_long_replies() {
        assert_eq!(rule("blah"), None);
        assert_eq!(rule(""), None);
        assert_eq!(rule("what about the back end storage for this design then"), None);
    }

    #[tokio::test]
    async fn test_classify_defaults_to_clarify() {
        let resolver = RuleResolver::new();
        assert_eq!(resolver.classify("blah").await.unwrap(), Decision::Clarify);
        assert_eq!(resolver.classify("yes").await.unwrap(), Decision::ProceedToNextPhase);
    }
}
