pub mod account;
pub mod bet;
pub mod config;
pub mod status;

pub use account::{handle_init, handle_withdraw};
pub use bet::handle_bet;
pub use config::handle_config;
pub use status::handle_status;

use crate::config::CliConfig;
use anyhow::Context as _;
use moonbets_core::{
    ClientConfig, Keypair, MoonbetsClient, MoonbetsError, RpcAuthority, WagerSigner,
};
use std::sync::Arc;

/// Resolved settings shared by every command.
pub struct Context {
    pub cli: CliConfig,
    pub config: ClientConfig,
}

impl Context {
    pub fn keypair(&self) -> anyhow::Result<Keypair> {
        Keypair::read_from_file(&self.cli.keypair_path)
            .map_err(MoonbetsError::from)
            .with_context(|| format!("Failed to load keypair {}", self.cli.keypair_path.display()))
    }

    pub fn client(&self) -> anyhow::Result<MoonbetsClient<RpcAuthority>> {
        let signer: Arc<dyn WagerSigner> = Arc::new(self.keypair()?);
        Ok(MoonbetsClient::connect(self.config.clone(), signer)?)
    }
}
