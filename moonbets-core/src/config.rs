use crate::error::{MoonbetsError, Result};
use crate::program;
use crate::types::{base58, Pubkey};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    Devnet,
    Localnet,
    Mainnet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

/// Durations as whole seconds, so the config file reads `"timeout_secs": 60`.
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(rename = "timeout_secs", with = "secs")]
    pub timeout: Duration,
    #[serde(rename = "poll_interval_secs", with = "secs")]
    pub poll_interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub cluster: Cluster,
    pub rpc_url: String,
    pub ws_url: String,
    pub commitment: Commitment,
    #[serde(with = "base58")]
    pub program_id: Pubkey,
    #[serde(with = "base58")]
    pub oracle_queue: Pubkey,
    #[serde(with = "base58")]
    pub vrf_program: Pubkey,
    /// Derived from the program id when unset.
    #[serde(default, with = "base58::option")]
    pub platform_vault: Option<Pubkey>,
    #[serde(default, with = "base58::option")]
    pub platform_stats: Option<Pubkey>,
    pub resolver: ResolverConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::Devnet,
            rpc_url: "https://api.devnet.solana.com".to_string(),
            ws_url: "wss://api.devnet.solana.com".to_string(),
            commitment: Commitment::Confirmed,
            program_id: program::DEFAULT_PROGRAM_ID,
            oracle_queue: program::DEFAULT_ORACLE_QUEUE,
            vrf_program: program::VRF_PROGRAM_ID,
            platform_vault: None,
            platform_stats: None,
            resolver: ResolverConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(cluster: Cluster) -> Self {
        let mut config = Self::default();
        config.cluster = cluster;

        match cluster {
            Cluster::Devnet => {
                // keep defaults for devnet
            }
            Cluster::Localnet => {
                config.rpc_url = "http://127.0.0.1:8899".to_string();
                config.ws_url = "ws://127.0.0.1:8900".to_string();
            }
            Cluster::Mainnet => {
                config.rpc_url = "https://api.mainnet-beta.solana.com".to_string();
                config.ws_url = "wss://api.mainnet-beta.solana.com".to_string();
                config.commitment = Commitment::Finalized;
            }
        }

        config
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_url(&self.rpc_url, "RPC URL", &["http", "https"])?;
        check_url(&self.ws_url, "WebSocket URL", &["ws", "wss"])?;

        if self.resolver.poll_interval.is_zero() {
            return Err(MoonbetsError::config("Poll interval must be greater than 0"));
        }

        if self.resolver.poll_interval >= self.resolver.timeout {
            return Err(MoonbetsError::config(
                "Poll interval must be shorter than the resolution timeout",
            ));
        }

        Ok(())
    }
}

fn check_url(raw: &str, what: &str, schemes: &[&str]) -> Result<()> {
    if raw.is_empty() {
        return Err(MoonbetsError::config(format!("{} cannot be empty", what)));
    }

    let url = Url::parse(raw)
        .map_err(|e| MoonbetsError::config(format!("Invalid {} {:?}: {}", what, raw, e)))?;

    if !schemes.contains(&url.scheme()) {
        return Err(MoonbetsError::config(format!(
            "Invalid {} scheme {:?} (expected {})",
            what,
            url.scheme(),
            schemes.join(" or ")
        )));
    }

    Ok(())
}
