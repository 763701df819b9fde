//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::intent::Strategy;

/// archpilot - step-by-step solution, architecture and analysis assistant
#[derive(Parser)]
#[command(
    name = "ap",
    about = "Guides a requirement through solution, architecture and analysis with a confirmation after each stage",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/archpilot/logs/archpilot.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, help = "Log level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,

    /// Hop ceiling per turn (overrides pipeline.max-hops)
    #[arg(long, global = true, value_name = "N")]
    pub max_hops: Option<usize>,

    /// Subcommand to execute (defaults to `chat`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Start an interactive session
    Chat {
        /// First requirement, processed before the prompt appears
        #[arg(value_name = "REQUIREMENT")]
        requirement: Option<String>,

        /// Intent resolver backing (overrides resolver.strategy)
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,
    },

    /// Classify a confirmation reply and print the decision label
    Classify {
        /// The reply text
        text: String,

        /// Intent resolver backing (overrides resolver.strategy)
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,
    },

    /// Print the confirmation prompt catalog
    Prompts,
}

/// Path of the log file written by the binary
pub fn get_log_path() -> PathBuf {
    get_log_dir().join("archpilot.log")
}

/// Directory holding the log file
pub fn get_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("archpilot")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_chat() {
        let cli = Cli::try_parse_from(["ap"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_chat_with_requirement_and_strategy() {
        let cli = Cli::try_parse_from(["ap", "chat", "Build a rate limiter", "--strategy", "rules"]).unwrap();
        match cli.command {
            Some(Command::Chat { requirement, strategy }) => {
                assert_eq!(requirement.as_deref(), Some("Build a rate limiter"));
                assert_eq!(strategy, Some(Strategy::Rules));
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ap", "classify", "yes", "--max-hops", "5", "-l", "debug"]).unwrap();
        assert_eq!(cli.max_hops, Some(5));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Some(Command::Classify { ref text, .. }) if text == "yes"));
    }

    #[test]
    fn test_invalid_strategy_rejected() {
        assert!(Cli::try_parse_from(["ap", "classify", "yes", "--strategy", "magic"]).is_err());
    }

    #[test]
    fn test_log_path_ends_with_file_name() {
        let path = get_log_path();
        assert!(path.ends_with("archpilot/logs/archpilot.log"));
    }
}
