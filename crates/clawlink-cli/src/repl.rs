//! Interactive read-eval-print loop.
//!
//! Provides `clawlink chat`: rustyline line editing over one gateway session.

use crate::context;
use crate::render;
use clawlink_gateway::GatewayClient;
use rustyline::error::ReadlineError;
use rustyline::highlight::MatchingBracketHighlighter;
use rustyline::hint::HistoryHinter;
use rustyline::{CompletionType, Config, EditMode, Editor};
use rustyline_derive::{Helper, Highlighter, Hinter, Validator};
use std::path::PathBuf;

/// Slash commands offered for completion.
const COMMANDS: [&str; 5] = ["/help", "/reset", "/status", "/quit", "/exit"];

/// REPL configuration.
pub struct ReplConfig {
    /// Path to history file. `None` disables history.
    pub history_file: Option<PathBuf>,
    /// Render replies as markdown.
    pub markdown_output: bool,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            history_file: clawlink_core::paths::history_file().ok(),
            markdown_output: true,
        }
    }
}

/// Tab-completion helper for slash commands.
#[derive(Helper, Highlighter, Hinter, Validator)]
struct ReplHelper {
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
    #[rustyline(Highlighter)]
    highlighter: MatchingBracketHighlighter,
}

impl rustyline::completion::Completer for ReplHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok((0, complete_command(&line[..pos])))
    }
}

fn complete_command(prefix: &str) -> Vec<String> {
    if !prefix.starts_with('/') {
        return Vec::new();
    }
    COMMANDS
        .iter()
        .filter(|c| c.starts_with(prefix))
        .map(|c| c.to_string())
        .collect()
}

/// What a line of input asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Message(&'a str),
    Help,
    Reset,
    Status,
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    if !trimmed.starts_with('/') {
        return Input::Message(trimmed);
    }
    match trimmed.split_whitespace().next().unwrap_or("") {
        "/help" => Input::Help,
        "/reset" => Input::Reset,
        "/status" => Input::Status,
        "/quit" | "/exit" => Input::Quit,
        _ => Input::Unknown(trimmed),
    }
}

/// The interactive REPL.
pub struct Repl {
    client: GatewayClient,
    url: String,
    config: ReplConfig,
}

impl Repl {
    /// Create a new REPL instance.
    pub fn new(client: GatewayClient, url: String, config: ReplConfig) -> Self {
        Self {
            client,
            url,
            config,
        }
    }

    /// Run the REPL loop.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        render::render_welcome(&self.url, self.client.session_key());

        let rl_config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .build();

        let helper = ReplHelper {
            hinter: HistoryHinter::new(),
            highlighter: MatchingBracketHighlighter::new(),
        };

        let mut rl: Editor<ReplHelper, rustyline::history::FileHistory> =
            Editor::with_config(rl_config)?;
        rl.set_helper(Some(helper));

        if let Some(path) = &self.config.history_file {
            let _ = rl.load_history(path);
        }

        loop {
            let prompt = console::style("> ").green().bold().to_string();
            match rl.readline(&prompt) {
                Ok(line) => {
                    let input = parse_input(&line);
                    if input != Input::Empty {
                        let _ = rl.add_history_entry(line.trim());
                    }
                    match input {
                        Input::Empty => {}
                        Input::Message(text) => self.send_message(text).await,
                        Input::Help => render::render_help(),
                        Input::Reset => self.reset().await,
                        Input::Status => self.status(),
                        Input::Quit => break,
                        Input::Unknown(cmd) => {
                            eprintln!("{}: {}", console::style("Unknown command").red(), cmd);
                            render::render_help();
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl-C: cancel current input, not exit
                    eprintln!("{}", console::style("^C (type /quit to exit)").dim());
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    render::render_error(&err);
                    break;
                }
            }
        }

        if let Some(path) = &self.config.history_file {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.save_history(path);
        }

        eprintln!("{}", console::style("Goodbye!").dim());
        Ok(())
    }

    /// Send a message and display the reply.
    async fn send_message(&self, message: &str) {
        let waiting = render::waiting();
        let result = context::wait_for_reply(&self.client, self.client.chat(message)).await;
        render::done_waiting(waiting);

        match result {
            Ok(reply) => {
                eprintln!();
                render::render_reply(&reply, self.config.markdown_output);
                eprintln!();
            }
            Err(e) => render::render_error(&e),
        }
    }

    async fn reset(&self) {
        match context::wait_for_reply(&self.client, self.client.reset()).await {
            Ok(confirmation) => eprintln!("{}", console::style(confirmation).dim()),
            Err(e) => render::render_error(&e),
        }
    }

    fn status(&self) {
        eprintln!("  {} {}", console::style("gateway:").dim(), self.url);
        eprintln!("  {} {}", console::style("state:").dim(), self.client.state());
        eprintln!("  {} {}", console::style("session:").dim(), self.client.session_key());
        eprintln!("  {} {}", console::style("paired:").dim(), self.client.is_paired());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(parse_input("  hola  "), Input::Message("hola"));
        assert_eq!(parse_input("/reset"), Input::Reset);
        assert_eq!(parse_input("/exit"), Input::Quit);
        assert_eq!(parse_input("/status now"), Input::Status);
        assert_eq!(parse_input("/nope"), Input::Unknown("/nope"));
    }

    #[test]
    fn test_complete_command() {
        assert_eq!(complete_command("/re"), vec!["/reset".to_string()]);
        assert_eq!(complete_command("/"), COMMANDS.map(String::from).to_vec());
        assert!(complete_command("hello").is_empty());
    }
}
