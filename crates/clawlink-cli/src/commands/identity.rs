//! Device identity inspection.

use clap::Args;
use console::style;

use crate::context::{self, GlobalArgs};

/// Identity command arguments.
#[derive(Args, Debug)]
pub struct IdentityArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show the device id and public key, creating the identity if needed.
pub fn run(global: &GlobalArgs, args: IdentityArgs) -> anyhow::Result<()> {
    let config = global.load_config_unchecked()?;
    let dir = config.identity.resolve_dir()?;
    let identity = context::load_identity(&config)?;

    if args.json {
        let value = serde_json::json!({
            "deviceId": identity.device_id(),
            "publicKey": identity.public_key_base64url(),
            "path": dir,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{} {}", style("device id: ").dim(), identity.device_id());
        println!("{} {}", style("public key:").dim(), identity.public_key_base64url());
        println!("{} {}", style("stored in: ").dim(), dir.display());
    }
    Ok(())
}
