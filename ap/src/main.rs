//! archpilot - confirmation-gated design assistant
//!
//! CLI entry point for the interactive pipeline and its helper commands.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use archpilot::cli::{Cli, Command, get_log_dir, get_log_path};
use archpilot::config::Config;
use archpilot::domain::PromptKind;
use archpilot::intent::{Strategy, build_resolver, resolve_decision};
use archpilot::llm::create_client;
use archpilot::prompts::PromptLoader;
use archpilot::repl;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = get_log_dir();
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(get_log_path()).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    if let Some(max_hops) = cli.max_hops {
        debug!(max_hops, "main: overriding pipeline.max-hops");
        config.pipeline.max_hops = max_hops;
    }

    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        max_hops = config.pipeline.max_hops,
        "archpilot loaded config"
    );

    match cli.command {
        Some(Command::Chat { requirement, strategy }) => {
            debug!(?strategy, "main: matched Chat command");
            let strategy = strategy.unwrap_or(config.resolver.strategy);
            repl::run_interactive(&config, requirement, strategy).await
        }
        Some(Command::Classify { text, strategy }) => {
            debug!(?strategy, "main: matched Classify command");
            let strategy = strategy.unwrap_or(config.resolver.strategy);
            cmd_classify(&config, &text, strategy).await
        }
        Some(Command::Prompts) => {
            debug!("main: matched Prompts command");
            cmd_prompts();
            Ok(())
        }
        None => {
            debug!("main: no command, starting chat");
            repl::run_interactive(&config, None, config.resolver.strategy).await
        }
    }
}

async fn cmd_classify(config: &Config, text: &str, strategy: Strategy) -> Result<()> {
    debug!(%strategy, "cmd_classify: called");
    let llm = if strategy.needs_llm() {
        Some(create_client(&config.llm).context("Failed to create LLM client")?)
    } else {
        None
    };
    let prompts = Arc::new(PromptLoader::new(std::env::current_dir()?));
    let resolver = build_resolver(strategy, llm, prompts);

    let decision = resolve_decision(
        resolver.as_ref(),
        text,
        config.resolver.retries,
        Duration::from_millis(config.resolver.timeout_ms),
    )
    .await;

    println!("{}", decision);
    Ok(())
}

fn cmd_prompts() {
    for kind in PromptKind::ALL {
        println!("{}:", kind);
        println!("  {}", kind.text());
        println!();
    }
}
