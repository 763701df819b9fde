//! archpilot - Confirmation-Gated Design Pipeline
//!
//! archpilot walks a requirement through three stages (step-by-step
//! solution, technical architecture, analysis/research) and stops after each
//! one to ask the user whether to proceed, revise, start over or finish.
//!
//! # Core Concepts
//!
//! - **Supervisor**: a phase state machine that reacts to the latest
//!   transcript entry and never applies the same reply twice
//! - **Curator**: pure queries over the transcript that decide what each
//!   worker sees
//! - **Intent resolution**: free-text replies map onto five decisions, with
//!   clarification as the fallback
//! - **Bounded turns**: each human turn runs a hop-limited chain of steps and
//!   rolls back cleanly on overflow
//!
//! # Modules
//!
//! - [`domain`] - Transcript, phases and the prompt catalog
//! - [`curator`] - Transcript queries
//! - [`intent`] - Reply classification
//! - [`supervisor`] - Phase controller
//! - [`worker`] - Stage workers
//! - [`driver`] - Turn execution
//! - [`hub`] - Concurrent session partition
//! - [`llm`] - LLM client trait and providers
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod curator;
pub mod domain;
pub mod driver;
pub mod hub;
pub mod intent;
pub mod llm;
pub mod prompts;
pub mod repl;
pub mod supervisor;
pub mod worker;

// Re-export commonly used types
pub use config::{Config, LlmConfig, PipelineConfig, ResolverConfig};
pub use domain::{Message, MessageId, Phase, PromptKind, Role, Route, SessionId, SessionState, Stage};
pub use driver::{DEFAULT_MAX_HOPS, Driver, DriverError, PAUSED_NOTICE, Session, TurnOutcome};
pub use hub::SessionHub;
pub use intent::{Decision, IntentResolver, ResolveError, RuleResolver, Strategy, build_resolver, resolve_decision};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient, create_client};
pub use supervisor::Supervisor;
pub use worker::{LlmWorker, Worker, WorkerError, WorkerInput, Workers};
