//! Intent resolution for confirmation replies
//!
//! Maps a free-text reply to a pending confirmation prompt onto a closed set
//! of five decisions. Backings (rules, LLM, hybrid) sit behind the
//! [`IntentResolver`] trait; [`resolve_decision`] adds the retry-then-clarify
//! policy so callers always get a decision.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::LlmError;

mod hybrid;
mod llm;
mod rules;

pub use hybrid::HybridResolver;
pub use llm::LlmResolver;
pub use rules::RuleResolver;

/// What the user wants after a confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    ProceedToNextPhase,
    ReviseCurrentPhase,
    StartNewQuery,
    EndSession,
    Clarify,
}

impl Decision {
    pub const ALL: [Decision; 5] = [
        Decision::ProceedToNextPhase,
        Decision::ReviseCurrentPhase,
        Decision::StartNewQuery,
        Decision::EndSession,
        Decision::Clarify,
    ];

    /// Wire label
    pub fn label(&self) -> &'static str {
        match self {
            Decision::ProceedToNextPhase => "proceed_to_next_phase",
            Decision::ReviseCurrentPhase => "revise_current_phase",
            Decision::StartNewQuery => "start_new_query",
            Decision::EndSession => "end_session",
            Decision::Clarify => "clarify",
        }
    }

    /// One-line meaning shown to the classifier
    pub fn meaning(&self) -> &'static str {
        match self {
            Decision::ProceedToNextPhase => "the user accepts the current output and wants the next phase",
            Decision::ReviseCurrentPhase => "the user rejects the current output and wants it redone",
            Decision::StartNewQuery => "the user wants to drop this request and start a new one",
            Decision::EndSession => "the user wants to finish the conversation",
            Decision::Clarify => "the reply is ambiguous or unrelated",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Decision {
    type Err = ResolveError;

    /// Strict parse of a wire label (trimmed, case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_matches(|c| c == '`' || c == '"' || c == '\'').to_lowercase();
        Decision::ALL
            .into_iter()
            .find(|d| d.label() == wanted)
            .ok_or_else(|| ResolveError::OutOfDomain(s.to_string()))
    }
}

/// Which backing classifies replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Deterministic keyword rules only
    Rules,
    /// LLM classification for every reply
    Llm,
    /// Rules first, LLM for anything the rules can't place
    #[default]
    Hybrid,
}

impl Strategy {
    pub fn needs_llm(&self) -> bool {
        !matches!(self, Strategy::Rules)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Rules => "rules",
            Strategy::Llm => "llm",
            Strategy::Hybrid => "hybrid",
        };
        write!(f, "{}", name)
    }
}

/// Errors a resolver backing can report
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Label outside the decision set: '{0}'")]
    OutOfDomain(String),

    #[error("Classifier returned no decision")]
    EmptyResponse,

    #[error("Classification timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to render classification prompt: {0}")]
    Prompt(String),
}

impl ResolveError {
    /// Whether asking again could give a different answer
    pub fn is_retryable(&self) -> bool {
        match self {
            ResolveError::Llm(e) => e.is_retryable(),
            ResolveError::OutOfDomain(_) | ResolveError::EmptyResponse | ResolveError::Timeout(_) => true,
            ResolveError::Prompt(_) => false,
        }
    }
}

/// Classifies a reply into exactly one [`Decision`]
#[async_trait]
pub trait IntentResolver: Send + Sync {
    /// Short backing name for logs
    fn name(&self) -> &'static str;

    /// Classify `text`; failures are reported, never papered over here
    async fn classify(&self, text: &str) -> Result<Decision, ResolveError>;
}

/// Classify with a per-attempt timeout and up to `retries` extra attempts.
/// Errors that cannot clear on retry (a missing API key, a broken template)
/// stop early. Any remaining failure degrades to [`Decision::Clarify`].
pub async fn resolve_decision(resolver: &dyn IntentResolver, text: &str, retries: u32, timeout: Duration) -> Decision {
    debug!(resolver = resolver.name(), retries, ?timeout, "resolve_decision: called");
    for attempt in 0..=retries {
        let outcome = match tokio::time::timeout(timeout, resolver.classify(text)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout(timeout)),
        };
        match outcome {
            Ok(decision) => {
                debug!(attempt, %decision, "resolve_decision: resolved");
                return decision;
            }
            Err(e) => {
                warn!(resolver = resolver.name(), attempt, error = %e, "resolve_decision: classification failed");
                if !e.is_retryable() {
                    debug!("resolve_decision: error is not retryable");
                    break;
                }
            }
        }
    }
    warn!("resolve_decision: attempts exhausted, falling back to clarify");
    Decision::Clarify
}

/// Build the resolver for a strategy
///
/// `llm` is required for `Llm` and `Hybrid`; without it those strategies
/// degrade to rules.
pub fn build_resolver(
    strategy: Strategy,
    llm: Option<Arc<dyn crate::llm::LlmClient>>,
    prompts: Arc<crate::prompts::PromptLoader>,
) -> Arc<dyn IntentResolver> {
    debug!(%strategy, has_llm = llm.is_some(), "build_resolver: called");
    match (strategy, llm) {
        (Strategy::Rules, _) | (_, None) => Arc::new(RuleResolver::new()),
        (Strategy::Llm, Some(client)) => Arc::new(LlmResolver::new(client, prompts)),
        (Strategy::Hybrid, Some(client)) => Arc::new(HybridResolver::new(
            RuleResolver::new(),
            LlmResolver::new(client, prompts),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted outcomes, then keeps failing
    struct ScriptedResolver {
        outcomes: Mutex<Vec<Result<Decision, ResolveError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedResolver {
        fn new(mut outcomes: Vec<Result<Decision, ResolveError>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IntentResolver for ScriptedResolver {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn classify(&self, _text: &str) -> Result<Decision, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(ResolveError::EmptyResponse))
        }
    }

    struct SlowResolver;

    #[async_trait]
    impl IntentResolver for SlowResolver {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn classify(&self, _text: &str) -> Result<Decision, ResolveError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Decision::ProceedToNextPhase)
        }
    }

    #[test]
    fn test_decision_labels_round_trip() {
        for decision in Decision::ALL {
            assert_eq!(decision.label().parse::<Decision>().unwrap(), decision);
        }
    }

    #[test]
    fn test_decision_parse_is_lenient_on_case_and_quotes() {
        assert_eq!(" `End_Session` ".parse::<Decision>().unwrap(), Decision::EndSession);
        assert_eq!("\"clarify\"".parse::<Decision>().unwrap(), Decision::Clarify);
    }

    #[test]
    fn test_decision_parse_rejects_out_of_domain() {
        let err = "proceed".parse::<Decision>().unwrap_err();
        assert!(matches!(err, ResolveError::OutOfDomain(s) if s == "proceed"));
    }

    #[test]
    fn test_decision_serde_uses_labels() {
        let json = serde_json::to_string(&Decision::StartNewQuery).unwrap();
        assert_eq!(json, "\"start_new_query\"");
    }

    #[test]
    fn test_strategy_needs_llm() {
        assert!(!Strategy::Rules.needs_llm());
        assert!(Strategy::Llm.needs_llm());
        assert!(Strategy::Hybrid.needs_llm());
    }

    #[tokio::test]
    async fn test_resolve_decision_first_attempt() {
        let resolver = ScriptedResolver::new(vec![Ok(Decision::EndSession)]);
        let decision = resolve_decision(&resolver, "end", 1, Duration::from_secs(1)).await;
        assert_eq!(decision, Decision::EndSession);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_decision_retries_once() {
        let resolver = ScriptedResolver::new(vec![
            Err(ResolveError::OutOfDomain("maybe".to_string())),
            Ok(Decision::ProceedToNextPhase),
        ]);
        let decision = resolve_decision(&resolver, "sure", 1, Duration::from_secs(1)).await;
        assert_eq!(decision, Decision::ProceedToNextPhase);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_decision_falls_back_to_clarify() {
        let resolver = ScriptedResolver::new(vec![
            Err(ResolveError::EmptyResponse),
            Err(ResolveError::EmptyResponse),
            Ok(Decision::ProceedToNextPhase),
        ]);
        let decision = resolve_decision(&resolver, "??", 1, Duration::from_secs(1)).await;
        assert_eq!(decision, Decision::Clarify);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_decision_skips_retry_for_permanent_errors() {
        let resolver = ScriptedResolver::new(vec![
            Err(ResolveError::Llm(LlmError::MissingApiKey("ANTHROPIC_API_KEY".to_string()))),
            Ok(Decision::ProceedToNextPhase),
        ]);
        let decision = resolve_decision(&resolver, "sure", 1, Duration::from_secs(1)).await;
        assert_eq!(decision, Decision::Clarify);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_decision_retries_transient_llm_errors() {
        let resolver = ScriptedResolver::new(vec![
            Err(ResolveError::Llm(LlmError::ApiError {
                status: 503,
                message: "Unavailable".to_string(),
            })),
            Ok(Decision::EndSession),
        ]);
        let decision = resolve_decision(&resolver, "bye", 1, Duration::from_secs(1)).await;
        assert_eq!(decision, Decision::EndSession);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resolve_error_retryability() {
        assert!(ResolveError::EmptyResponse.is_retryable());
        assert!(ResolveError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!ResolveError::Prompt("bad template".to_string()).is_retryable());
        assert!(!ResolveError::Llm(LlmError::InvalidResponse("garbage".to_string())).is_retryable());
    }

    #[tokio::test]
    async fn test_resolve_decision_timeout_is_clarify() {
        let decision = resolve_decision(&SlowResolver, "yes", 1, Duration::from_millis(50)).await;
        assert_eq!(decision, Decision::Clarify);
    }

    #[test]
    fn test_build_resolver_without_llm_uses_rules() {
        let prompts = Arc::new(crate::prompts::PromptLoader::embedded_only());
        assert_eq!(build_resolver(Strategy::Hybrid, None, prompts.clone()).name(), "rules");
        assert_eq!(build_resolver(Strategy::Rules, None, prompts).name(), "rules");
    }
}
