//! One-shot message.

use clap::Args;

use crate::context::{self, GlobalArgs};
use crate::render;

/// Send command arguments.
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Message text. Multiple words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,

    /// Print the reply as-is instead of rendering markdown
    #[arg(long)]
    pub raw: bool,
}

impl SendArgs {
    pub fn message(&self) -> String {
        self.text.join(" ")
    }
}

/// Run the send command.
pub async fn run(global: &GlobalArgs, args: SendArgs) -> anyhow::Result<()> {
    let config = global.load_config()?;
    let client = context::connect(&config)?;

    let waiting = render::waiting();
    let result = context::wait_for_reply(&client, client.chat(args.message())).await;
    render::done_waiting(waiting);
    client.disconnect();

    render::render_reply(&result?, !args.raw);
    Ok(())
}
