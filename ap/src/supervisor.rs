//! Phase Controller
//!
//! The finite state machine behind the pipeline. Each [`Supervisor::step`]
//! reads the session, applies exactly one row of the transition table and
//! returns the route the driver should take next. Catalog prompts are the
//! only messages the supervisor ever appends.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::domain::{Message, Phase, PromptKind, Route, SessionState, Stage, is_control_token};
use crate::intent::{Decision, IntentResolver, resolve_decision};

/// Default extra classification attempts before falling back to clarify
pub const DEFAULT_RESOLVER_RETRIES: u32 = 1;

/// Default per-attempt classification timeout
pub const DEFAULT_RESOLVER_TIMEOUT: Duration = Duration::from_secs(30);

/// Find the reply to the pending catalog prompt
///
/// The reply must be the human message immediately following the most
/// recent prompt that expects a decision. Replies to older prompts were
/// already applied and are never looked at again.
pub fn pending_reply(messages: &[Message]) -> Option<&Message> {
    debug!(message_count = messages.len(), "pending_reply: called");
    let prompt_idx = messages.iter().rposition(|m| m.awaits_decision())?;
    messages.get(prompt_idx + 1).filter(|m| m.is_human())
}

/// Drives phase transitions for one session at a time
pub struct Supervisor {
    resolver: Arc<dyn IntentResolver>,
    retries: u32,
    timeout: Duration,
}

impl Supervisor {
    pub fn new(resolver: Arc<dyn IntentResolver>) -> Self {
        debug!(resolver = resolver.name(), "Supervisor::new: called");
        Self {
            resolver,
            retries: DEFAULT_RESOLVER_RETRIES,
            timeout: DEFAULT_RESOLVER_TIMEOUT,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Apply one transition and record the chosen route on the state
    pub async fn step(&self, state: &mut SessionState) -> Route {
        debug!(phase = %state.phase, awaiting = state.awaiting_confirm, "Supervisor::step: called");
        let route = match (state.phase, state.awaiting_confirm) {
            (Phase::Start, false) => self.on_start(state),
            (phase, false) if phase.stage().is_some() => self.on_worker_finished(state),
            (phase, true) => match phase.stage() {
                Some(stage) => self.on_reply(state, stage).await,
                None => {
                    debug!(%phase, "Supervisor::step: awaiting outside a stage, halting");
                    Route::End
                }
            },
            _ => {
                debug!("Supervisor::step: no transition applies, halting");
                Route::End
            }
        };
        state.route = Some(route);
        debug!(%route, phase = %state.phase, awaiting = state.awaiting_confirm, "Supervisor::step: done");
        route
    }

    /// Row 1: a fresh request opens the solution stage
    fn on_start(&self, state: &mut SessionState) -> Route {
        let latest = state
            .messages()
            .iter()
            .rev()
            .find(|m| m.is_human())
            .filter(|m| !is_control_token(&m.text))
            .map(|m| m.id);

        match latest {
            Some(id) => {
                info!(%id, "Supervisor: new request, dispatching solution stage");
                state.phase = Phase::Solution;
                state.awaiting_confirm = false;
                state.query_start = id.0;
                Route::Dispatch(Stage::Solution)
            }
            None => {
                debug!("Supervisor::on_start: no usable request, asking for one");
                state.push_prompt(PromptKind::Restart);
                state.awaiting_confirm = false;
                Route::End
            }
        }
    }

    /// Row 2: a worker just produced output, ask for confirmation
    fn on_worker_finished(&self, state: &mut SessionState) -> Route {
        if let Some(stage) = state.phase.stage() {
            info!(%stage, "Supervisor: worker finished, asking for confirmation");
            state.push_prompt(stage.confirm_prompt());
            state.awaiting_confirm = true;
        }
        Route::End
    }

    /// Row 3: classify the reply to the pending prompt and apply it
    async fn on_reply(&self, state: &mut SessionState, stage: Stage) -> Route {
        let Some(reply) = pending_reply(state.messages()).map(|m| m.text.trim().to_string()) else {
            debug!("Supervisor::on_reply: no reply yet, idling");
            return Route::End;
        };

        let decision = resolve_decision(self.resolver.as_ref(), &reply, self.retries, self.timeout).await;
        info!(%reply, %decision, %stage, "Supervisor: reply interpreted");
        self.apply(state, stage, decision)
    }

    fn apply(&self, state: &mut SessionState, stage: Stage, decision: Decision) -> Route {
        match decision {
            Decision::ProceedToNextPhase => {
                state.awaiting_confirm = false;
                match stage.next() {
                    Some(next) => {
                        state.phase = next.phase();
                        Route::Dispatch(next)
                    }
                    None => {
                        state.phase = Phase::Done;
                        Route::End
                    }
                }
            }
            Decision::ReviseCurrentPhase => {
                state.awaiting_confirm = false;
                Route::Dispatch(stage)
            }
            Decision::StartNewQuery => {
                state.phase = Phase::Start;
                state.awaiting_confirm = false;
                state.push_prompt(PromptKind::Restart);
                Route::End
            }
            Decision::EndSession => {
                state.phase = Phase::Done;
                state.awaiting_confirm = false;
                Route::End
            }
            Decision::Clarify => {
                state.push_prompt(PromptKind::Clarification);
                state.awaiting_confirm = true;
                Route::End
            }
        }
    }
}
