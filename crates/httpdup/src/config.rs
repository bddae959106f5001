//! Configuration types and loading logic.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use httpdup_tracing::TracingConfig;
use serde::Deserialize;

use crate::cli::Cli;
use crate::destination::{Destination, MirrorTarget};
use crate::error::DuplicateError;

/// Top-level duplicator configuration. Built once at startup and shared
/// read-only afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DuplicatorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub primary: PrimaryConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,

    /// Sticky connections. Accepted for compatibility, no behavior attached.
    #[serde(default)]
    pub sticky: bool,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Largest inbound body buffered for duplication.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// The server whose responses are relayed to clients.
#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryConfig {
    #[serde(default = "default_primary_address")]
    pub address: String,

    #[serde(default = "default_primary_timeout")]
    pub timeout_secs: u64,
}

/// Servers that receive copies of every request.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub addresses: Vec<String>,

    #[serde(default = "default_mirror_timeout")]
    pub timeout_secs: u64,

    /// Cap on concurrently running mirror calls. Unset means unbounded.
    #[serde(default)]
    pub max_in_flight: Option<usize>,

    /// How long shutdown waits for running mirror calls.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_secs: u64,
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_primary_address() -> String {
    "127.0.0.1:80".to_string()
}

fn default_primary_timeout() -> u64 {
    300
}

fn default_mirror_timeout() -> u64 {
    120
}

fn default_drain_timeout() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            address: default_primary_address(),
            timeout_secs: default_primary_timeout(),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            timeout_secs: default_mirror_timeout(),
            max_in_flight: None,
            drain_timeout_secs: default_drain_timeout(),
        }
    }
}

/// Parsed primary and mirror destinations.
#[derive(Debug, Clone)]
pub struct Destinations {
    pub primary: Destination,
    pub mirrors: Vec<MirrorTarget>,
}

impl DuplicatorConfig {
    /// Load configuration from defaults, a TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (HTTPDUP_ prefix, __ for nesting)
    /// 2. TOML config file (skipped when missing)
    /// 3. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        Ok(Self::figment(config_path).extract()?)
    }

    fn figment(config_path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("HTTPDUP_").split("__"))
    }

    /// Apply command-line overrides, which take precedence over everything.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.server.listen_address = listen.clone();
        }
        if let Some(server) = &cli.server {
            self.primary.address = server.clone();
        }
        let mirrors = cli.mirror_addresses();
        if !mirrors.is_empty() {
            self.mirror.addresses = mirrors;
        }
        self.sticky |= cli.sticky;
        self.verbose |= cli.verbose;
        if self.verbose {
            self.tracing.enable_verbose();
        }
    }

    /// Parse every configured address. Only a malformed primary is an
    /// error; malformed mirrors are kept as failing targets.
    pub fn destinations(&self) -> Result<Destinations, DuplicateError> {
        Ok(Destinations {
            primary: Destination::parse(&self.primary.address)?,
            mirrors: self
                .mirror
                .addresses
                .iter()
                .map(|a| MirrorTarget::parse(a))
                .collect(),
        })
    }
}
