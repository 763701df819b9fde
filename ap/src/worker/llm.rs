//! LLM-backed stage worker

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Worker, WorkerError, WorkerInput};
use crate::config::{LlmConfig, PipelineConfig};
use crate::domain::Stage;
use crate::llm::{CompletionRequest, LlmClient, StopReason};
use crate::prompts::{PromptLoader, StageContext};

/// Token budget for the requirement rewrite
const SANITIZE_MAX_TOKENS: u32 = 512;

/// Appended to a document the model stopped writing at its token limit
pub const TRUNCATED_NOTE: &str = "_(Output truncated at the token limit. Reply `no` to regenerate.)_";

/// Generates one stage's document with a single completion
pub struct LlmWorker {
    stage: Stage,
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
    temperature: Option<f32>,
    timeout: Duration,
    sanitize: bool,
}

impl LlmWorker {
    pub fn new(stage: Stage, llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>) -> Self {
        debug!(%stage, "LlmWorker::new: called");
        let defaults = LlmConfig::default();
        let pipeline = PipelineConfig::default();
        Self {
            stage,
            llm,
            prompts,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            timeout: Duration::from_millis(pipeline.worker_timeout_ms),
            sanitize: false,
        }
    }

    /// Worker configured from the loaded config; only the architecture
    /// stage sanitizes its requirement
    pub fn from_config(
        stage: Stage,
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLoader>,
        llm_config: &LlmConfig,
        pipeline: &PipelineConfig,
    ) -> Self {
        Self::new(stage, llm, prompts)
            .with_generation(llm_config.max_tokens, llm_config.temperature)
            .with_timeout(Duration::from_millis(pipeline.worker_timeout_ms))
            .with_sanitize(stage == Stage::Architect && pipeline.sanitize_requirements)
    }

    pub fn with_generation(mut self, max_tokens: u32, temperature: Option<f32>) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// One completion under the worker timeout
    async fn complete(&self, request: CompletionRequest) -> Result<(String, StopReason), WorkerError> {
        let response = tokio::time::timeout(self.timeout, self.llm.complete(request))
            .await
            .map_err(|_| WorkerError::Timeout(self.timeout))??;
        debug!(
            stop_reason = ?response.stop_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "LlmWorker::complete: response received"
        );
        match response.content.map(|c| c.trim().to_string()) {
            Some(text) if !text.is_empty() => Ok((text, response.stop_reason)),
            _ => Err(WorkerError::EmptyOutput),
        }
    }

    /// Rewrite the requirement into neutral technical language, keeping the
    /// raw requirement if the rewrite fails
    async fn sanitize_requirement(&self, requirement: &str) -> String {
        debug!("LlmWorker::sanitize_requirement: called");
        let system = match self.prompts.render("sanitize", &StageContext::default()) {
            Ok(system) => system,
            Err(e) => {
                warn!(error = %e, "LlmWorker: sanitize prompt unavailable, using raw requirement");
                return requirement.to_string();
            }
        };
        let request = CompletionRequest::single(system, requirement, SANITIZE_MAX_TOKENS).with_temperature(Some(0.0));
        match self.complete(request).await {
            Ok((clean, StopReason::MaxTokens)) => {
                warn!(clean_len = clean.len(), "LlmWorker: sanitized requirement was cut off, using raw requirement");
                requirement.to_string()
            }
            Ok((clean, _)) => clean,
            Err(e) => {
                warn!(error = %e, "LlmWorker: sanitize failed, using raw requirement");
                requirement.to_string()
            }
        }
    }

    async fn try_produce(&self, input: &WorkerInput) -> Result<String, WorkerError> {
        let requirement = if self.sanitize {
            self.sanitize_requirement(&input.requirement).await
        } else {
            input.requirement.clone()
        };

        let ctx = StageContext {
            requirement: requirement.clone(),
            context: input.context.clone(),
            follow_up: input.follow_up.clone(),
        };
        let system = self
            .prompts
            .render(self.stage.template_name(), &ctx)
            .map_err(|e| WorkerError::Prompt(e.to_string()))?;

        let request = CompletionRequest::single(system, format!("Requirement: {}", requirement), self.max_tokens)
            .with_temperature(self.temperature);
        match self.complete(request).await? {
            (doc, StopReason::MaxTokens) => {
                warn!(stage = %self.stage, max_tokens = self.max_tokens, "LlmWorker: document hit the token limit");
                Ok(format!("{}\n\n{}", doc, TRUNCATED_NOTE))
            }
            (doc, _) => Ok(doc),
        }
    }
}

#[async_trait]
impl Worker for LlmWorker {
    async fn produce(&self, input: &WorkerInput) -> String {
        debug!(stage = %self.stage, "LlmWorker::produce: called");
        match self.try_produce(input).await {
            Ok(doc) => {
                debug!(stage = %self.stage, doc_len = doc.len(), "LlmWorker::produce: done");
                doc
            }
            Err(e) => {
                warn!(stage = %self.stage, error = %e, "LlmWorker: generation failed");
                format!("{} Agent Error: {}", self.stage.label(), e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionResponse;
    use crate::llm::client::mock::MockLlmClient;

    fn input() -> WorkerInput {
        WorkerInput {
            requirement: "I need a URL shortener service design".to_string(),
            context: Some("## Restatement of the requirement\nshort links".to_string()),
            follow_up: None,
        }
    }

    fn worker(stage: Stage, mock: &Arc<MockLlmClient>) -> LlmWorker {
        LlmWorker::new(stage, mock.clone(), Arc::new(PromptLoader::embedded_only()))
    }

    #[tokio::test]
    async fn test_produce_returns_document() {
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse::text("  # Solution\nsteps  ")]));
        let doc = worker(Stage::Solution, &mock).produce(&input()).await;

        assert_eq!(doc, "# Solution\nsteps");
        let requests = mock.requests();
        assert!(requests[0].system_prompt.contains("Solution Architect Agent"));
        assert_eq!(
            requests[0].messages[0].content,
            "Requirement: I need a URL shortener service design"
        );
    }

    #[tokio::test]
    async fn test_architect_prompt_includes_solution_context() {
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse::text("arch")]));
        worker(Stage::Architect, &mock).produce(&input()).await;

        let requests = mock.requests();
        assert!(requests[0].system_prompt.contains("short links"));
    }

    #[tokio::test]
    async fn test_failure_becomes_error_text() {
        let mock = Arc::new(MockLlmClient::failing());
        let doc = worker(Stage::Analysis, &mock).produce(&input()).await;
        assert!(doc.starts_with("Analysis Agent Error: "));
        assert!(doc.contains("No more mock responses"));
    }

    #[tokio::test]
    async fn test_empty_output_becomes_error_text() {
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse::text("   ")]));
        let doc = worker(Stage::Solution, &mock).produce(&input()).await;
        assert_eq!(doc, "Solution Agent Error: the model returned an empty document");
    }

    fn cut_off(text: &str) -> CompletionResponse {
        CompletionResponse {
            stop_reason: StopReason::MaxTokens,
            ..CompletionResponse::text(text)
        }
    }

    #[tokio::test]
    async fn test_token_limit_marks_document() {
        let mock = Arc::new(MockLlmClient::new(vec![cut_off("# Solution\n1. first step")]));
        let doc = worker(Stage::Solution, &mock).produce(&input()).await;
        assert_eq!(doc, format!("# Solution\n1. first step\n\n{}", TRUNCATED_NOTE));
    }

    #[tokio::test]
    async fn test_cut_off_sanitize_keeps_raw_requirement() {
        let mock = Arc::new(MockLlmClient::new(vec![
            cut_off("A URL shortening"),
            CompletionResponse::text("arch doc"),
        ]));
        let doc = worker(Stage::Architect, &mock)
            .with_sanitize(true)
            .produce(&input())
            .await;

        assert_eq!(doc, "arch doc");
        assert_eq!(
            mock.requests()[1].messages[0].content,
            "Requirement: I need a URL shortener service design"
        );
    }

    #[tokio::test]
    async fn test_sanitize_rewrites_requirement() {
        let mock = Arc::new(MockLlmClient::new(vec![
            CompletionResponse::text("A URL shortening service."),
            CompletionResponse::text("arch doc"),
        ]));
        let doc = worker(Stage::Architect, &mock)
            .with_sanitize(true)
            .produce(&input())
            .await;

        assert_eq!(doc, "arch doc");
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].system_prompt.contains("neutral, technical requirement"));
        assert_eq!(requests[1].messages[0].content, "Requirement: A URL shortening service.");
    }

    #[tokio::test]
    async fn test_sanitize_failure_keeps_raw_requirement() {
        let mock = Arc::new(MockLlmClient::new(vec![
            CompletionResponse::text(""),
            CompletionResponse::text("arch doc"),
        ]));
        let doc = worker(Stage::Architect, &mock)
            .with_sanitize(true)
            .produce(&input())
            .await;

        assert_eq!(doc, "arch doc");
        assert_eq!(
            mock.requests()[1].messages[0].content,
            "Requirement: I need a URL shortener service design"
        );
    }

    #[test]
    fn test_from_config_sanitizes_only_architect() {
        let mock: Arc<MockLlmClient> = Arc::new(MockLlmClient::new(vec![]));
        let prompts = Arc::new(PromptLoader::embedded_only());
        let llm_config = LlmConfig::default();
        let pipeline = PipelineConfig::default();

        for stage in Stage::ALL {
            let w = LlmWorker::from_config(stage, mock.clone(), prompts.clone(), &llm_config, &pipeline);
            assert_eq!(w.sanitize, stage == Stage::Architect);
            assert_eq!(w.max_tokens, llm_config.max_tokens);
        }
    }
}
