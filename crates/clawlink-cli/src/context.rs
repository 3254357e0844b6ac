//! Shared setup for commands: configuration, identity and the gateway client.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Args;
use clawlink_core::Config;
use clawlink_gateway::{ClientError, ClientOptions, GatewayClient, SessionState};
use clawlink_identity::{DeviceIdentity, FileKeyStore};
use tokio::sync::watch;
use tracing::debug;

/// How long a reply may still arrive after the connection dropped.
const CLOSE_GRACE: Duration = Duration::from_millis(200);

/// Options accepted by every command.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Path to config file
    #[arg(short, long, env = "CLAWLINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Gateway URL (http(s):// is rewritten to ws(s)://)
    #[arg(long, env = "CLAWLINK_GATEWAY_URL", global = true)]
    pub url: Option<String>,

    /// Gateway auth token
    #[arg(long, env = "CLAWLINK_AUTH_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,
}

impl GlobalArgs {
    /// Load the config file, apply environment and flag overrides, and
    /// validate the result.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let config = self.load_config_unchecked()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load_config`](Self::load_config) without validation.
    pub fn load_config_unchecked(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_or_default(self.config.as_deref())?;
        config.apply_env();
        if let Some(url) = &self.url {
            config.gateway.url = url.clone();
        }
        if let Some(token) = &self.token {
            config.gateway.token = token.as_str().into();
        }
        Ok(config)
    }
}

/// Load this device's identity, creating it on first use.
pub fn load_identity(config: &Config) -> anyhow::Result<DeviceIdentity> {
    let dir = config.identity.resolve_dir()?;
    let store = FileKeyStore::new(dir);
    DeviceIdentity::ensure(&store).context("failed to load device identity")
}

/// Build a gateway client from configuration.
pub fn connect(config: &Config) -> anyhow::Result<GatewayClient> {
    let options = ClientOptions::from_config(config)?;
    let identity = load_identity(config)?;
    debug!(url = %options.url, device_id = identity.short_id(), "creating gateway client");
    Ok(GatewayClient::new(options, Arc::new(identity)))
}

/// Wait for `reply`, giving up if the gateway closes the connection first.
pub async fn wait_for_reply<F>(client: &GatewayClient, reply: F) -> anyhow::Result<String>
where
    F: Future<Output = Result<String, ClientError>>,
{
    let mut states = client.state_changes();
    let mut reply = std::pin::pin!(reply);

    tokio::select! {
        biased;
        result = &mut reply => return Ok(result?),
        _ = connection_lost(&mut states) => {}
    }

    match tokio::time::timeout(CLOSE_GRACE, reply).await {
        Ok(result) => Ok(result?),
        Err(_) => anyhow::bail!("gateway closed the connection before replying"),
    }
}

/// Resolves once the session has left `Disconnected` and then returned to it.
async fn connection_lost(states: &mut watch::Receiver<SessionState>) {
    let opened = states
        .wait_for(|state| *state != SessionState::Disconnected)
        .await
        .is_ok();
    if !opened
        || states
            .wait_for(|state| *state == SessionState::Disconnected)
            .await
            .is_err()
    {
        std::future::pending::<()>().await;
    }
}
