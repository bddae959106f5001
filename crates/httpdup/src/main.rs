//! httpdup binary: parse flags, load configuration, start the duplicator.

use std::sync::Arc;

use clap::Parser;

use httpdup::cli::Cli;
use httpdup::config::{Destinations, DuplicatorConfig};
use httpdup::destination::MirrorTarget;
use httpdup::proxy::dispatcher::DuplicationDispatcher;
use httpdup::server::{self, AppState};
use httpdup::stats::DuplicatorStats;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path();

    let mut config = DuplicatorConfig::load(&config_path)?;
    config.apply_cli(&cli);

    // A malformed primary address is fatal before anything binds.
    let destinations = config.destinations()?;

    // The gRPC exporter needs a reactor, so the runtime comes before tracing.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let tracing_guard = httpdup_tracing::init_tracing(&config.tracing);
        log_banner(&config, &config_path, &destinations, tracing_guard.otlp_enabled());
        run(config, destinations).await
    })
}

fn log_banner(
    config: &DuplicatorConfig,
    config_path: &str,
    destinations: &Destinations,
    otlp_enabled: bool,
) {
    tracing::info!(
        version = httpdup::VERSION,
        otlp = otlp_enabled,
        config_path = %config_path,
        server = %destinations.primary,
        listening = %config.server.listen_address,
        "Starting httpdup"
    );
    tracing::info!(
        count = destinations.mirrors.len(),
        "Duplicating connections to {} servers",
        destinations.mirrors.len()
    );
    for mirror in &destinations.mirrors {
        match mirror {
            MirrorTarget::Valid(_) => tracing::info!(mirror = %mirror, "Duplicating to {mirror}"),
            MirrorTarget::Invalid { reason, .. } => tracing::warn!(
                mirror = %mirror,
                reason = %reason,
                "Invalid mirror address; every copy to it will fail"
            ),
        }
    }
    if config.sticky {
        tracing::warn!("Sticky connections requested but not implemented; option ignored");
    }
    if let Some(limit) = config.mirror.max_in_flight {
        tracing::info!(max_in_flight = limit, "Mirror requests are bounded");
    }
}

async fn run(config: DuplicatorConfig, destinations: Destinations) -> anyhow::Result<()> {
    let stats = DuplicatorStats::new();
    let dispatcher = DuplicationDispatcher::from_config(&config, destinations, stats.clone())?;

    let state = AppState {
        config: Arc::new(config),
        dispatcher,
        stats,
    };

    server::run(state).await
}
