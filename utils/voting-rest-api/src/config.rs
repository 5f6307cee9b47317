use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use voting_ledger_bridge::{from_toml_path, BridgeConfig, BridgeConfigFile};

const DEFAULT_BIND_PORT: u16 = 3000;

/// Settings of the HTTP listener.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HttpConfig {
    /// Interface to listen on.
    #[serde(default = "default_bind_host")]
    pub bind_host: IpAddr,
    /// Port to listen on.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
    /// Sign with the deployment record's key when a vote carries none.
    #[serde(default)]
    pub use_default_credential: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            bind_port: DEFAULT_BIND_PORT,
            use_default_credential: false,
        }
    }
}

impl HttpConfig {
    /// Address the server binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.bind_port)
    }
}

fn default_bind_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_bind_port() -> u16 {
    DEFAULT_BIND_PORT
}

/// The service's config file: bridge settings plus an `[http]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestApiConfigFile {
    /// Everything the bridge reads.
    #[serde(flatten)]
    pub bridge: BridgeConfigFile,
    /// Listener settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Command line of the `voting-rest-api` binary.
#[derive(Debug, Parser)]
#[clap(about = "REST bridge to a deployed Votacion contract")]
pub struct Config {
    /// Path to the TOML config file.
    #[clap(long, env = "VOTING_API_CONFIG", default_value = "voting_api_config.toml")]
    pub config: PathBuf,
    /// Overrides `http.bind_port`.
    #[clap(long, env = "PORT")]
    pub port: Option<u16>,
    /// Overrides `node.endpoint`.
    #[clap(long, env = "NODE_ENDPOINT")]
    pub node_endpoint: Option<String>,
}

impl Config {
    /// Reads the config file, applies command line overrides and validates
    /// the result. The deployment record path is resolved relative to the
    /// config file.
    pub fn load(&self) -> anyhow::Result<(BridgeConfig, HttpConfig)> {
        let mut file: RestApiConfigFile = from_toml_path(&self.config)
            .with_context(|| format!("Failed to read configuration {:?}", self.config))?;

        if let Some(port) = self.port {
            file.http.bind_port = port;
        }
        if let Some(endpoint) = &self.node_endpoint {
            file.bridge.node.endpoint = endpoint.clone();
        }

        let base_dir = self.config.parent().unwrap_or_else(|| Path::new("."));
        let bridge = file
            .bridge
            .validate(base_dir)
            .context("Invalid bridge configuration")?;
        Ok((bridge, file.http))
    }
}
