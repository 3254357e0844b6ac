//! clawlink command-line interface.

pub mod commands;
pub mod context;
pub mod render;
pub mod repl;

use clap::{Parser, Subcommand};
use context::GlobalArgs;

/// clawlink - talk to an agent gateway from the terminal
#[derive(Parser)]
#[command(name = "clawlink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Send one message and print the reply
    Send(commands::send::SendArgs),

    /// Start a fresh conversation under the same session key
    Reset,

    /// Interactive chat
    Chat(commands::chat::ChatArgs),

    /// Show this device's identity
    Identity(commands::identity::IdentityArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Send(args) => commands::send::run(&cli.global, args).await,
        Commands::Reset => commands::reset::run(&cli.global).await,
        Commands::Chat(args) => commands::chat::run(&cli.global, args).await,
        Commands::Identity(args) => commands::identity::run(&cli.global, args),
        Commands::Config(args) => commands::config::run(&cli.global, args),
        Commands::Version => {
            println!("clawlink {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn log_filter(cli: &Cli) -> String {
    match cli.verbose {
        0 => cli
            .global
            .load_config_unchecked()
            .map(|config| config.logging.level)
            .unwrap_or_else(|_| "clawlink=info".to_string()),
        1 => "clawlink=debug".to_string(),
        _ => "clawlink=trace".to_string(),
    }
}
