//! LLM-backed intent classification

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Decision, IntentResolver, ResolveError};
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, ToolDefinition};
use crate::prompts::{ClassifyContext, DecisionHint, PromptLoader};

/// Tool the model calls to report its decision
pub const ROUTE_DECISION_TOOL: &str = "route_decision";

const CLASSIFY_MAX_TOKENS: u32 = 256;

/// Classifies replies with a single tool-calling completion
pub struct LlmResolver {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
}

impl LlmResolver {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>) -> Self {
        Self { llm, prompts }
    }

    /// Tool whose only argument is an enum of the five labels
    pub fn route_decision_tool() -> ToolDefinition {
        let labels: Vec<&str> = Decision::ALL.iter().map(|d| d.label()).collect();
        ToolDefinition::new(
            ROUTE_DECISION_TOOL,
            "Record how the user's reply should be routed",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "decision": {
                        "type": "string",
                        "enum": labels,
                        "description": "One of the allowed decisions"
                    }
                },
                "required": ["decision"]
            }),
        )
    }

    fn system_prompt(&self) -> Result<String, ResolveError> {
        let ctx = ClassifyContext {
            decisions: Decision::ALL
                .iter()
                .map(|d| DecisionHint {
                    label: d.label(),
                    meaning: d.meaning(),
                })
                .collect(),
        };
        self.prompts
            .render("classify", &ctx)
            .map_err(|e| ResolveError::Prompt(e.to_string()))
    }

    /// Pull the decision out of a response: the tool call first, then the
    /// text reply as a bare label
    fn parse_decision(response: &CompletionResponse) -> Result<Decision, ResolveError> {
        if let Some(call) = response.tool_calls.iter().find(|c| c.name == ROUTE_DECISION_TOOL) {
            debug!("LlmResolver::parse_decision: found tool call");
            return match call.input.get("decision").and_then(|v| v.as_str()) {
                Some(label) => label.parse(),
                None => Err(ResolveError::OutOfDomain(call.input.to_string())),
            };
        }
        match response.content.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                debug!("LlmResolver::parse_decision: falling back to text reply");
                text.parse()
            }
            _ => Err(ResolveError::EmptyResponse),
        }
    }
}

#[async_trait]
impl IntentResolver for LlmResolver {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn classify(&self, text: &str) -> Result<Decision, ResolveError> {
        debug!(%text, "LlmResolver::classify: called");
        let request = CompletionRequest::single(self.system_prompt()?, format!("User reply: {}", text), CLASSIFY_MAX_TOKENS)
            .with_tools(vec![Self::route_decision_tool()])
            .with_temperature(Some(0.0));

        let response = self.llm.complete(request).await?;
        let decision = Self::parse_decision(&response)?;
        debug!(%decision, "LlmResolver::classify: classified");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;

    fn resolver(responses: Vec<CompletionResponse>) -> (LlmResolver, Arc<MockLlmClient>) {
        let mock = Arc::new(MockLlmClient::new(responses));
        let resolver = LlmResolver::new(mock.clone(), Arc::new(PromptLoader::embedded_only()));
        (resolver, mock)
    }

    #[test]
    fn test_tool_schema_enumerates_labels() {
        let tool = LlmResolver::route_decision_tool();
        let labels = tool.input_schema["properties"]["decision"]["enum"].as_array().unwrap();
        assert_eq!(labels.len(), 5);
        assert!(labels.iter().any(|l| l == "start_new_query"));
    }

    #[tokio::test]
    async fn test_classify_from_tool_call() {
        let (resolver, mock) = resolver(vec![CompletionResponse::tool_call(
            ROUTE_DECISION_TOOL,
            serde_json::json!({"decision": "revise_current_phase"}),
        )]);

        let decision = resolver.classify("looks wrong").await.unwrap();
        assert_eq!(decision, Decision::ReviseCurrentPhase);

        let requests = mock.requests();
        assert_eq!(requests[0].tools[0].name, ROUTE_DECISION_TOOL);
        assert!(requests[0].system_prompt.contains("proceed_to_next_phase"));
        assert!(requests[0].messages[0].content.contains("looks wrong"));
    }

    #[tokio::test]
    async fn test_classify_from_text_reply() {
        let (resolver, _) = resolver(vec![CompletionResponse::text("end_session")]);
        assert_eq!(resolver.classify("bye").await.unwrap(), Decision::EndSession);
    }

    #[tokio::test]
    async fn test_out_of_domain_label_is_error() {
        let (resolver, _) = resolver(vec![CompletionResponse::tool_call(
            ROUTE_DECISION_TOOL,
            serde_json::json!({"decision": "maybe_later"}),
        )]);
        let err = resolver.classify("hmm").await.unwrap_err();
        assert!(matches!(err, ResolveError::OutOfDomain(_)));
    }

    #[tokio::test]
    async fn test_empty_response_is_error() {
        let (resolver, _) = resolver(vec![CompletionResponse::text("   ")]);
        let err = resolver.classify("hmm").await.unwrap_err();
        assert!(matches!(err, ResolveError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_llm_failure_is_error() {
        let (resolver, _) = resolver(vec![]);
        let err = resolver.classify("yes").await.unwrap_err();
        assert!(matches!(err, ResolveError::Llm(_)));
    }
}
