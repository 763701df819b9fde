//! Pipeline phases, worker stages and per-step routes

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::PromptKind;

/// Position of a session in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for a requirement
    #[default]
    Start,
    Solution,
    Architect,
    Analysis,
    /// Pipeline finished or ended by the user
    Done,
}

impl Phase {
    /// Worker stage that produces this phase's document
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Phase::Solution => Some(Stage::Solution),
            Phase::Architect => Some(Stage::Architect),
            Phase::Analysis => Some(Stage::Analysis),
            Phase::Start | Phase::Done => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == Phase::Done
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Start => "start",
            Phase::Solution => "solution",
            Phase::Architect => "architect",
            Phase::Analysis => "analysis",
            Phase::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// One of the three document-producing stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Solution,
    Architect,
    Analysis,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Solution, Stage::Architect, Stage::Analysis];

    /// Phase a session is in while this stage's output awaits confirmation
    pub fn phase(&self) -> Phase {
        match self {
            Stage::Solution => Phase::Solution,
            Stage::Architect => Phase::Architect,
            Stage::Analysis => Phase::Analysis,
        }
    }

    /// Stage that `proceed` moves to, `None` after analysis
    pub fn next(&self) -> Option<Stage> {
        debug!(?self, "Stage::next: called");
        match self {
            Stage::Solution => Some(Stage::Architect),
            Stage::Architect => Some(Stage::Analysis),
            Stage::Analysis => None,
        }
    }

    /// Confirmation prompt asked once this stage's worker has finished
    pub fn confirm_prompt(&self) -> PromptKind {
        match self {
            Stage::Solution => PromptKind::ConfirmSolution,
            Stage::Architect => PromptKind::ConfirmArchitecture,
            Stage::Analysis => PromptKind::AnalysisComplete,
        }
    }

    /// Human-facing label, also used in worker error texts
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Solution => "Solution",
            Stage::Architect => "Architect",
            Stage::Analysis => "Analysis",
        }
    }

    /// Prompt template name for this stage's worker
    pub fn template_name(&self) -> &'static str {
        match self {
            Stage::Solution => "solution",
            Stage::Architect => "architect",
            Stage::Analysis => "analysis",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.phase())
    }
}

/// Next hop chosen by the supervisor for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Invoke the worker for a stage, then step the supervisor again
    Dispatch(Stage),
    /// Yield to the user
    End,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Dispatch(stage) => write!(f, "{}_agent", stage),
            Route::End => write!(f, "END"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_next_walks_pipeline() {
        assert_eq!(Stage::Solution.next(), Some(Stage::Architect));
        assert_eq!(Stage::Architect.next(), Some(Stage::Analysis));
        assert_eq!(Stage::Analysis.next(), None);
    }

    #[test]
    fn test_phase_stage_mapping() {
        for stage in Stage::ALL {
            assert_eq!(stage.phase().stage(), Some(stage));
        }
        assert_eq!(Phase::Start.stage(), None);
        assert_eq!(Phase::Done.stage(), None);
    }

    #[test]
    fn test_route_display() {
        assert_eq!(Route::Dispatch(Stage::Solution).to_string(), "solution_agent");
        assert_eq!(Route::Dispatch(Stage::Architect).to_string(), "architect_agent");
        assert_eq!(Route::Dispatch(Stage::Analysis).to_string(), "analysis_agent");
        assert_eq!(Route::End.to_string(), "END");
    }

    #[test]
    fn test_confirm_prompt_per_stage() {
        assert_eq!(Stage::Solution.confirm_prompt(), PromptKind::ConfirmSolution);
        assert_eq!(Stage::Architect.confirm_prompt(), PromptKind::ConfirmArchitecture);
        assert_eq!(Stage::Analysis.confirm_prompt(), PromptKind::AnalysisComplete);
    }
}
