//! Configuration management commands.

use clap::Args;
use clawlink_core::config::Config;
use clawlink_core::paths;

use crate::context::GlobalArgs;

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (token redacted)
    Show,

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,

    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// Run the config command.
pub fn run(global: &GlobalArgs, args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = global.load_config_unchecked()?;
            println!("{}", serde_json::to_string_pretty(&redacted(&config)?)?);
        }

        ConfigCommand::Path => {
            println!("{}", config_path(global)?.display());
        }

        ConfigCommand::Validate => {
            let config = global.load_config_unchecked()?;
            match config.validate() {
                Ok(()) => println!("Configuration is valid"),
                Err(e) => anyhow::bail!("Configuration error: {}", e),
            }
        }

        ConfigCommand::Init { force } => {
            let path = config_path(global)?;

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {:?}. Use --force to overwrite.",
                    path
                );
            }

            Config::default().save(&path)?;
            println!("Created config file: {:?}", path);
        }
    }

    Ok(())
}

fn config_path(global: &GlobalArgs) -> anyhow::Result<std::path::PathBuf> {
    match &global.config {
        Some(path) => Ok(path.clone()),
        None => Ok(paths::config_file()?),
    }
}

/// The configuration as JSON with the token replaced by a description.
fn redacted(config: &Config) -> anyhow::Result<serde_json::Value> {
    let mut json = serde_json::to_value(config)?;
    json["gateway"]["token"] = serde_json::Value::String(config.gateway.token.describe());
    Ok(json)
}
