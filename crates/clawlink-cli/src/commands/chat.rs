//! Interactive chat.

use clap::Args;

use crate::context::{self, GlobalArgs};
use crate::repl::{Repl, ReplConfig};

/// Chat command arguments.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Print replies as-is instead of rendering markdown
    #[arg(long)]
    pub raw: bool,

    /// Do not read or write the line history file
    #[arg(long)]
    pub no_history: bool,
}

/// Run the interactive chat.
pub async fn run(global: &GlobalArgs, args: ChatArgs) -> anyhow::Result<()> {
    let config = global.load_config()?;
    let client = context::connect(&config)?;

    let defaults = ReplConfig::default();
    let repl_config = ReplConfig {
        history_file: defaults.history_file.filter(|_| !args.no_history),
        markdown_output: !args.raw,
    };

    let result = Repl::new(client.clone(), config.gateway.normalized_url()?, repl_config)
        .run()
        .await;
    client.disconnect();
    result
}
