use anyhow::Context;
use clap::ValueEnum;
use moonbets_core::{ClientConfig, Cluster};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ClusterArg {
    Devnet,
    Localnet,
    Mainnet,
}

impl From<ClusterArg> for Cluster {
    fn from(arg: ClusterArg) -> Self {
        match arg {
            ClusterArg::Devnet => Cluster::Devnet,
            ClusterArg::Localnet => Cluster::Localnet,
            ClusterArg::Mainnet => Cluster::Mainnet,
        }
    }
}

/// Where the CLI looks for its files.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub config_path: PathBuf,
    pub keypair_path: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            config_path: dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("moonbets")
                .join("config.json"),
            keypair_path: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
                .join("solana")
                .join("id.json"),
        }
    }
}

impl CliConfig {
    pub fn new(config_path: Option<PathBuf>, keypair_path: Option<PathBuf>) -> Self {
        let defaults = Self::default();
        Self {
            config_path: config_path.unwrap_or(defaults.config_path),
            keypair_path: keypair_path.unwrap_or(defaults.keypair_path),
        }
    }

    /// The config file wins when it exists; otherwise the cluster preset.
    /// An explicit cluster flag always overrides the file.
    pub fn client_config(&self, cluster: Option<ClusterArg>) -> anyhow::Result<ClientConfig> {
        if let Some(cluster) = cluster {
            return Ok(ClientConfig::new(cluster.into()));
        }

        if self.config_path.exists() {
            let config = ClientConfig::load(&self.config_path).with_context(|| {
                format!("Failed to load config from {}", self.config_path.display())
            })?;
            tracing::debug!(path = %self.config_path.display(), "Loaded config file");
            return Ok(config);
        }

        Ok(ClientConfig::default())
    }
}

pub fn write_config(path: &Path, config: &ClientConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
