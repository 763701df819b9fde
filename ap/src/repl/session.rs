//! REPL session management

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info};

use crate::domain::{Message, PromptKind, Role};
use crate::driver::{Driver, Session, TurnOutcome};

/// Greeting shown when a session opens
pub const GREETING: &str = "Hello! I'm here to help you with step by step guide for everything. What's your requirement?";

/// Shown once the pipeline reaches `done`
pub const FAREWELL: &str = "✅ Flow complete. Thank you for using the chatbot!";

const PROMPT_AWAITING: &str = "User (reply to confirmation): ";
const PROMPT_DEFAULT: &str = "User: ";

/// Width of transcript previews in `/history`
const PREVIEW_CHARS: usize = 60;

/// Interactive chat session over one pipeline session
pub struct ChatSession {
    driver: Driver,
    session: Session,
}

impl ChatSession {
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            session: Session::new(),
        }
    }

    /// Input prompt label for the current state
    pub fn prompt_label(&self) -> &'static str {
        if self.session.state.awaiting_confirm {
            PROMPT_AWAITING
        } else {
            PROMPT_DEFAULT
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self, initial_requirement: Option<String>) -> Result<()> {
        info!(session = %self.session.id(), "ChatSession: started");
        println!();
        println!("{} {}", "Assistant:".bright_blue().bold(), GREETING);
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();

        if let Some(requirement) = initial_requirement {
            println!("{}{}", PROMPT_DEFAULT.bright_green(), requirement);
            if self.process_user_input(&requirement).await {
                return Ok(());
            }
        }

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&self.prompt_label().bright_green().to_string());

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input) {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else if self.process_user_input(input).await {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        info!(session = %self.session.id(), phase = %self.session.state.phase, "ChatSession: ended");
        Ok(())
    }

    /// Run one turn and print what it produced; true once the flow is done
    async fn process_user_input(&mut self, input: &str) -> bool {
        debug!("ChatSession::process_user_input: called");
        let outcome = self.driver.process_turn(&mut self.session, input).await;
        self.print_outcome(&outcome);
        if outcome.finished() {
            println!();
            println!("{}", FAREWELL.bright_green());
            return true;
        }
        false
    }

    fn print_outcome(&self, outcome: &TurnOutcome) {
        for msg in &outcome.messages {
            print_assistant(msg);
        }
        if let Some(notice) = outcome.notice() {
            println!("{}", notice.yellow().bold());
        }
    }

    /// Handle slash commands
    fn handle_slash_command(&self, input: &str) -> SlashResult {
        let cmd = input.split_whitespace().next().unwrap_or("");

        match cmd {
            "/help" | "/h" => {
                print_help();
                SlashResult::Continue
            }
            "/quit" | "/q" | "/exit" => SlashResult::Quit,
            "/state" | "/s" => {
                self.print_state();
                SlashResult::Continue
            }
            "/history" => {
                self.print_history();
                SlashResult::Continue
            }
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
                SlashResult::Continue
            }
        }
    }

    fn print_state(&self) {
        let state = &self.session.state;
        println!();
        println!("{}", "Session State:".bright_cyan());
        println!("  {:18} {}", "id".yellow(), state.id);
        println!("  {:18} {}", "phase".yellow(), state.phase);
        println!("  {:18} {}", "awaiting_confirm".yellow(), state.awaiting_confirm);
        println!("  {:18} {}", "messages".yellow(), state.messages().len());
        if let Some(last) = state.transcript().last() {
            println!("  {:18} {}", "last".yellow(), preview(&last.text));
        }
        println!();
    }

    fn print_history(&self) {
        let messages = self.session.state.messages();
        if messages.is_empty() {
            println!("{}", "No conversation history.".dimmed());
            return;
        }

        println!();
        println!("{}", "Conversation History:".bright_cyan());
        for msg in messages {
            let role = match (msg.role, msg.prompt_kind()) {
                (Role::Human, _) => "User".bright_green(),
                (Role::Assistant, Some(_)) => "Prompt".yellow(),
                (Role::Assistant, None) => "Assistant".bright_blue(),
            };
            println!("  {}. {}: {}", msg.id.0 + 1, role, preview(&msg.text));
        }
        println!();
    }
}

/// First line of a message, clipped for `/history`
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    let clipped: String = line.chars().take(PREVIEW_CHARS).collect();
    if clipped.len() < text.len() {
        format!("{}...", clipped)
    } else {
        clipped
    }
}

fn print_assistant(msg: &Message) {
    println!();
    match msg.prompt_kind() {
        Some(PromptKind::Clarification) | Some(PromptKind::Restart) => {
            println!("{} {}", "Assistant:".bright_blue().bold(), msg.text.yellow());
        }
        Some(_) => {
            println!("{} {}", "Assistant:".bright_blue().bold(), msg.text.bright_cyan());
        }
        None => {
            println!("{}", "Assistant:".bright_blue().bold());
            println!("{}", msg.text);
        }
    }
    println!();
}

fn print_help() {
    println!();
    println!("{}", "Available Commands:".bright_cyan());
    println!("  {:14} Show this help", "/help".yellow());
    println!("  {:14} Show phase and confirmation state", "/state".yellow());
    println!("  {:14} Show conversation history", "/history".yellow());
    println!("  {:14} Exit", "/quit".yellow());
    println!();
    println!("{}", "Replies to a confirmation:".bright_cyan());
    println!("  {:14} Proceed to the next phase", "yes".yellow());
    println!("  {:14} Revise the current phase", "no".yellow());
    println!("  {:14} Start a new request", "new".yellow());
    println!("  {:14} Finish", "end".yellow());
    println!();
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::RuleResolver;
    use crate::supervisor::Supervisor;
    use crate::worker::{Worker, WorkerInput, Workers};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl Worker for Echo {
        async fn produce(&self, _input: &WorkerInput) -> String {
            "doc".to_string()
        }
    }

    fn chat() -> ChatSession {
        let workers = Workers::new(Arc::new(Echo), Arc::new(Echo), Arc::new(Echo));
        ChatSession::new(Driver::new(Supervisor::new(Arc::new(RuleResolver::new())), workers))
    }

    #[tokio::test]
    async fn test_prompt_label_follows_awaiting_flag() {
        let mut chat = chat();
        assert_eq!(chat.prompt_label(), "User: ");

        assert!(!chat.process_user_input("I need a URL shortener service design").await);
        assert_eq!(chat.prompt_label(), "User (reply to confirmation): ");
    }

    #[tokio::test]
    async fn test_end_reply_finishes() {
        let mut chat = chat();
        chat.process_user_input("I need a URL shortener service design").await;
        assert!(chat.process_user_input("end").await);
    }

    #[test]
    fn test_slash_commands() {
        let chat = chat();
        assert!(matches!(chat.handle_slash_command("/quit"), SlashResult::Quit));
        assert!(matches!(chat.handle_slash_command("/state"), SlashResult::Continue));
        assert!(matches!(chat.handle_slash_command("/bogus"), SlashResult::Continue));
    }

    #[test]
    fn test_preview_clips_long_text() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(100);
        assert_eq!(preview(&long), format!("{}...", "x".repeat(PREVIEW_CHARS)));
        assert_eq!(preview("line one\nline two"), "line one...");
    }
}
