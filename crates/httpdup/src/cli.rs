//! Command-line flags.
//!
//! Flags override values from the config file and `HTTPDUP_` environment
//! variables; anything left unset keeps those values (or the defaults).

use clap::{ArgAction, Parser};

/// Default config file, read if present.
pub const DEFAULT_CONFIG_PATH: &str = "httpdup.toml";

#[derive(Debug, Default, Parser)]
#[command(
    name = "httpdup",
    version,
    about = "Duplicate HTTP traffic: relay the primary server's answers and mirror every request to shadow servers"
)]
pub struct Cli {
    /// Address to listen for connections [default: 0.0.0.0:8080]
    #[arg(short = 'l', value_name = "ADDR")]
    pub listen: Option<String>,

    /// Address of the server whose traffic will be duplicated [default: 127.0.0.1:80]
    #[arg(short = 's', value_name = "ADDR")]
    pub server: Option<String>,

    /// Sticky connections (accepted but not implemented)
    #[arg(short = 'S')]
    pub sticky: bool,

    /// Comma-separated list of mirror server addresses; may be repeated
    #[arg(short = 'r', value_name = "ADDRS", value_delimiter = ',', action = ArgAction::Append)]
    pub remotes: Vec<String>,

    /// Log every outbound call with its status and latency
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Config file path (also `HTTPDUP_CONFIG`) [default: httpdup.toml]
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<String>,
}

impl Cli {
    /// Config file path: flag, then `HTTPDUP_CONFIG`, then the default.
    pub fn config_path(&self) -> String {
        self.config
            .clone()
            .or_else(|| std::env::var("HTTPDUP_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Mirror addresses from every `-r`, in order, with blank entries dropped.
    pub fn mirror_addresses(&self) -> Vec<String> {
        self.remotes
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }
}
