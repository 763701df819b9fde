//! Rules first, LLM for the rest

use async_trait::async_trait;
use tracing::debug;

use super::{Decision, IntentResolver, LlmResolver, ResolveError, RuleResolver};

/// Cheap keyword rules for the common replies; anything they can't place
/// goes to the LLM
pub struct HybridResolver {
    rules: RuleResolver,
    fallback: LlmResolver,
}

impl HybridResolver {
    pub fn new(rules: RuleResolver, fallback: LlmResolver) -> Self {
        Self { rules, fallback }
    }
}

#[async_trait]
impl IntentResolver for HybridResolver {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    async fn classify(&self, text: &str) -> Result<Decision, ResolveError> {
        if let Some(decision) = self.rules.match_rules(text) {
            debug!(%decision, "HybridResolver::classify: rules matched");
            return Ok(decision);
        }
        debug!("HybridResolver::classify: deferring to LLM");
        self.fallback.classify(text).await
    }
}
