//! Runtime Driver
//!
//! Turns one external human turn into a bounded chain of supervisor and
//! worker hops. A turn either settles (the supervisor routes to END) or
//! overflows the hop ceiling, in which case the session is put back exactly
//! as it was before the turn.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{Message, MessageId, Phase, Route, SessionId, SessionState, Stage};
use crate::intent::{Strategy, build_resolver};
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;
use crate::supervisor::Supervisor;
use crate::worker::{LlmWorker, Workers};

/// Default hop ceiling per turn
pub const DEFAULT_MAX_HOPS: usize = 25;

/// Shown when a turn overflows the hop ceiling
pub const PAUSED_NOTICE: &str = "⚠️ Paused: waiting for confirmation.";

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Hop limit of {0} exceeded")]
    HopLimitExceeded(usize),

    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),
}

/// A session plus the driver's record of what the user has already seen
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: SessionState,
    surfaced: HashSet<MessageId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> SessionId {
        self.state.id
    }

    /// Assistant messages not yet shown, marking them as shown
    fn take_unsurfaced(&mut self) -> Vec<Message> {
        let fresh: Vec<Message> = self
            .state
            .messages()
            .iter()
            .filter(|m| m.is_assistant() && !self.surfaced.contains(&m.id))
            .cloned()
            .collect();
        self.surfaced.extend(fresh.iter().map(|m| m.id));
        fresh
    }
}

/// Result of one processed turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Newly appended assistant messages, in order
    pub messages: Vec<Message>,
    pub phase: Phase,
    pub awaiting_confirm: bool,
    /// Hops taken (0 when the turn was rolled back)
    pub hops: usize,
    /// The turn overflowed and was rolled back
    pub paused: bool,
}

impl TurnOutcome {
    pub fn finished(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Notice to show the user, if any
    pub fn notice(&self) -> Option<&'static str> {
        self.paused.then_some(PAUSED_NOTICE)
    }
}

/// Executes turns against the supervisor and workers
pub struct Driver {
    supervisor: Supervisor,
    workers: Workers,
    max_hops: usize,
}

impl Driver {
    pub fn new(supervisor: Supervisor, workers: Workers) -> Self {
        Self {
            supervisor,
            workers,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Wire the LLM-backed pipeline described by `config`
    pub fn from_config(config: &Config, llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, strategy: Strategy) -> Self {
        debug!(%strategy, max_hops = config.pipeline.max_hops, "Driver::from_config: called");
        let resolver = build_resolver(strategy, Some(llm.clone()), prompts.clone());
        let supervisor = Supervisor::new(resolver)
            .with_retries(config.resolver.retries)
            .with_timeout(Duration::from_millis(config.resolver.timeout_ms));

        let worker = |stage: Stage| -> Arc<dyn crate::worker::Worker> {
            Arc::new(LlmWorker::from_config(
                stage,
                llm.clone(),
                prompts.clone(),
                &config.llm,
                &config.pipeline,
            ))
        };
        let workers = Workers::new(
            worker(Stage::Solution),
            worker(Stage::Architect),
            worker(Stage::Analysis),
        )
        .with_context_max_chars(config.pipeline.context_max_chars);

        Self::new(supervisor, workers).with_max_hops(config.pipeline.max_hops)
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Append a human message and run the step chain to completion
    pub async fn process_turn(&self, session: &mut Session, text: &str) -> TurnOutcome {
        debug!(session = %session.id(), "Driver::process_turn: called");
        self.advance(session, Some(text)).await
    }

    /// Run the step chain without new input
    pub async fn resume(&self, session: &mut Session) -> TurnOutcome {
        debug!(session = %session.id(), "Driver::resume: called");
        self.advance(session, None).await
    }

    /// The transcript only ever grows, except that an overflowing turn is
    /// rewound to before its human message so the session stays resumable.
    async fn advance(&self, session: &mut Session, text: Option<&str>) -> TurnOutcome {
        let checkpoint = session.state.clone();
        if let Some(text) = text {
            session.state.push_human(text);
        }

        match self.run_steps(&mut session.state).await {
            Ok(hops) => TurnOutcome {
                messages: session.take_unsurfaced(),
                phase: session.state.phase,
                awaiting_confirm: session.state.awaiting_confirm,
                hops,
                paused: false,
            },
            Err(e) => {
                warn!(session = %session.id(), error = %e, "Driver: turn overflowed, rolling back");
                session.state = checkpoint;
                TurnOutcome {
                    messages: vec![],
                    phase: session.state.phase,
                    awaiting_confirm: session.state.awaiting_confirm,
                    hops: 0,
                    paused: true,
                }
            }
        }
    }

    /// Step supervisor and workers until the supervisor yields
    ///
    /// Every supervisor step and every worker dispatch is one hop.
    pub async fn run_steps(&self, state: &mut SessionState) -> Result<usize, DriverError> {
        let mut hops = 0;
        loop {
            self.hop(&mut hops)?;
            debug!(
                hop = hops,
                phase = %state.phase,
                awaiting = state.awaiting_confirm,
                messages = state.messages().len(),
                "Driver: state before step"
            );
            let route = self.supervisor.step(state).await;
            debug!(
                hop = hops,
                %route,
                phase = %state.phase,
                awaiting = state.awaiting_confirm,
                messages = state.messages().len(),
                "Driver: state after step"
            );

            match route {
                Route::End => {
                    debug!(hops, "Driver::run_steps: settled");
                    return Ok(hops);
                }
                Route::Dispatch(stage) => {
                    self.hop(&mut hops)?;
                    info!(%stage, hop = hops, "Driver: invoking worker");
                    let doc = self.workers.dispatch(stage, state).await;
                    state.push_assistant(doc);
                }
            }
        }
    }

    fn hop(&self, hops: &mut usize) -> Result<(), DriverError> {
        *hops += 1;
        if *hops > self.max_hops {
            return Err(DriverError::HopLimitExceeded(self.max_hops));
        }
        Ok(())
    }
}
