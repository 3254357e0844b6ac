//! Terminal rendering utilities.

use console::{style, Term};

/// Print an agent reply, as markdown when `markdown` is set and stdout is a
/// terminal.
pub fn render_reply(text: &str, markdown: bool) {
    if markdown && Term::stdout().is_term() {
        let skin = termimad::MadSkin::default();
        skin.print_text(text);
    } else {
        println!("{}", text);
    }
}

/// Show a waiting indicator on stderr. Returns whether one was drawn.
pub fn waiting() -> bool {
    let term = Term::stderr();
    if !term.is_term() {
        return false;
    }
    let _ = term.write_str(&style("thinking...").dim().to_string());
    true
}

/// Clear the indicator drawn by [`waiting`].
pub fn done_waiting(drawn: bool) {
    if drawn {
        let _ = Term::stderr().clear_line();
    }
}

/// Print an error line.
pub fn render_error(error: &dyn std::fmt::Display) {
    eprintln!("{}: {}", style("Error").red(), error);
}

/// Print the welcome banner for the REPL.
pub fn render_welcome(url: &str, session_key: &str) {
    eprintln!(
        "{} {} {}",
        style("clawlink").bold().cyan(),
        style("chat").dim(),
        style(format!("({})", url)).dim(),
    );
    eprintln!("{} {}", style("session:").dim(), session_key);
    eprintln!(
        "{}",
        style("Type /help for commands, /quit to exit.").dim()
    );
    eprintln!();
}

/// Print the help message.
pub fn render_help() {
    eprintln!("{}", style("Available commands:").bold());
    eprintln!("  {}   - Show this help", style("/help").cyan());
    eprintln!("  {}  - Start a fresh conversation", style("/reset").cyan());
    eprintln!("  {} - Show connection status", style("/status").cyan());
    eprintln!("  {}   - Exit", style("/quit").cyan());
    eprintln!();
}
