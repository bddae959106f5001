//! Tracing configuration types.

use serde::Deserialize;

/// Filter used when `-v` is given on the command line.
pub const VERBOSE_LOG_LEVEL: &str = "httpdup=debug,info";

/// Configuration for logging and optional OTLP export.
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// The service name reported to the OTLP collector.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// OTLP collector endpoint (e.g. "http://collector:4317").
    /// When `None`, only fmt logging to stderr is set up.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Transport protocol for OTLP export.
    #[serde(default)]
    pub protocol: OtlpProtocol,

    /// `EnvFilter` directives (e.g. "info", "httpdup=debug,info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// OTLP transport protocol.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

fn default_service_name() -> String {
    "httpdup".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TracingConfig {
    /// Switch the filter to per-call debug output.
    pub fn enable_verbose(&mut self) {
        self.log_level = VERBOSE_LOG_LEVEL.to_string();
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            otlp_endpoint: None,
            protocol: OtlpProtocol::default(),
            log_level: default_log_level(),
        }
    }
}
