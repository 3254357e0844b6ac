//! Session reset.

use crate::context::{self, GlobalArgs};

/// Run the reset command.
pub async fn run(global: &GlobalArgs) -> anyhow::Result<()> {
    let config = global.load_config()?;
    let client = context::connect(&config)?;

    let result = context::wait_for_reply(&client, client.reset()).await;
    client.disconnect();

    println!("{}", result?);
    Ok(())
}
