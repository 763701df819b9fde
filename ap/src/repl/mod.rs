//! Interactive REPL for archpilot
//!
//! One line of input is one human turn; newly produced assistant messages
//! are printed after each turn until the pipeline reaches `done`.

mod session;

pub use session::{ChatSession, FAREWELL, GREETING};

use std::sync::Arc;

use eyre::{Context, Result};

use crate::config::Config;
use crate::driver::Driver;
use crate::intent::Strategy;
use crate::llm::create_client;
use crate::prompts::PromptLoader;

/// Run the interactive session
///
/// This is the main entry point for `ap chat`.
pub async fn run_interactive(config: &Config, requirement: Option<String>, strategy: Strategy) -> Result<()> {
    config.validate()?;

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let root = std::env::current_dir()?;
    let prompts = Arc::new(PromptLoader::new(root));

    let driver = Driver::from_config(config, llm, prompts, strategy);
    let mut session = ChatSession::new(driver);
    session.run(requirement).await
}
