//! Worker Dispatch Interface
//!
//! One content-producing capability per stage. `produce` never fails at the
//! trait boundary: backings turn their errors into explanatory text so the
//! supervisor's "worker finished, ask for confirmation" transition always
//! applies.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::curator::{
    DEFAULT_CONTEXT_MAX_CHARS, SOLUTION_OUTPUT_MARKER, collect_recent_context, extract_real_query,
    find_core_requirement, find_prior_output,
};
use crate::domain::{SessionState, Stage};
use crate::llm::LlmError;

mod llm;

pub use llm::{LlmWorker, TRUNCATED_NOTE};

/// What a worker gets to work with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerInput {
    /// The core requirement of the current request
    pub requirement: String,
    /// Grounding from earlier stages
    pub context: Option<String>,
    /// A substantive question asked after the last analysis
    pub follow_up: Option<String>,
}

impl WorkerInput {
    /// Curate the input for `stage` from the current request window
    pub fn for_stage(stage: Stage, state: &SessionState, context_max_chars: usize) -> Self {
        debug!(%stage, query_start = state.query_start, "WorkerInput::for_stage: called");
        let window = state.request_window();
        let requirement = find_core_requirement(window).unwrap_or_default().trim().to_string();

        let context = match stage {
            Stage::Solution => None,
            Stage::Architect => find_prior_output(window, SOLUTION_OUTPUT_MARKER),
            Stage::Analysis => Some(collect_recent_context(window, context_max_chars)),
        }
        .filter(|c| !c.trim().is_empty());

        let follow_up = match stage {
            Stage::Analysis => extract_real_query(window).filter(|q| *q != requirement),
            _ => None,
        };

        Self {
            requirement,
            context,
            follow_up,
        }
    }
}

/// Errors a worker backing hits internally before they become text
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("the model returned an empty document")]
    EmptyOutput,

    #[error("prompt rendering failed: {0}")]
    Prompt(String),
}

/// Produces a stage's document
#[async_trait]
pub trait Worker: Send + Sync {
    /// Return the document, or an explanatory text on failure
    async fn produce(&self, input: &WorkerInput) -> String;
}

/// Reply used when a request has no usable requirement
pub fn missing_requirement_text(stage: Stage) -> &'static str {
    match stage {
        Stage::Solution => "I need a clear requirement to provide a solution.",
        Stage::Architect => "I need a clear requirement to design an architecture.",
        Stage::Analysis => "I need a clear requirement to run an analysis.",
    }
}

/// The three stage workers plus the curation budget they share
#[derive(Clone)]
pub struct Workers {
    solution: Arc<dyn Worker>,
    architect: Arc<dyn Worker>,
    analysis: Arc<dyn Worker>,
    context_max_chars: usize,
}

impl Workers {
    pub fn new(solution: Arc<dyn Worker>, architect: Arc<dyn Worker>, analysis: Arc<dyn Worker>) -> Self {
        Self {
            solution,
            architect,
            analysis,
            context_max_chars: DEFAULT_CONTEXT_MAX_CHARS,
        }
    }

    pub fn with_context_max_chars(mut self, context_max_chars: usize) -> Self {
        self.context_max_chars = context_max_chars;
        self
    }

    pub fn for_stage(&self, stage: Stage) -> &Arc<dyn Worker> {
        match stage {
            Stage::Solution => &self.solution,
            Stage::Architect => &self.architect,
            Stage::Analysis => &self.analysis,
        }
    }

    /// Curate the input and run the stage's worker
    pub async fn dispatch(&self, stage: Stage, state: &SessionState) -> String {
        let input = WorkerInput::for_stage(stage, state, self.context_max_chars);
        if input.requirement.is_empty() {
            debug!(%stage, "Workers::dispatch: no requirement");
            return missing_requirement_text(stage).to_string();
        }
        info!(
            %stage,
            requirement_len = input.requirement.len(),
            has_context = input.context.is_some(),
            has_follow_up = input.follow_up.is_some(),
            "Workers: dispatching"
        );
        self.for_stage(stage).produce(&input).await
    }
}
