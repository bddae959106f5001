//! Per-request orchestration: one awaited primary call plus one spawned call
//! per mirror.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use super::client::DispatchClient;
use super::inbound::InboundRequest;
use super::mirror::MirrorTasks;
use crate::config::{Destinations, DuplicatorConfig};
use crate::error::DuplicateError;
use crate::stats::DuplicatorStats;

/// Duplicates inbound requests. Cheap to clone.
#[derive(Clone)]
pub struct DuplicationDispatcher {
    destinations: Arc<Destinations>,
    primary: DispatchClient,
    mirror: DispatchClient,
    tasks: MirrorTasks,
}

impl DuplicationDispatcher {
    pub fn new(
        destinations: Destinations,
        primary: DispatchClient,
        mirror: DispatchClient,
        tasks: MirrorTasks,
    ) -> Self {
        Self {
            destinations: Arc::new(destinations),
            primary,
            mirror,
            tasks,
        }
    }

    /// Build the dispatcher and its two clients (each with its own timeout)
    /// from validated destinations.
    pub fn from_config(
        config: &DuplicatorConfig,
        destinations: Destinations,
        stats: DuplicatorStats,
    ) -> anyhow::Result<Self> {
        let primary = DispatchClient::new(Duration::from_secs(config.primary.timeout_secs))?;
        let mirror = DispatchClient::new(Duration::from_secs(config.mirror.timeout_secs))?;
        let tasks = MirrorTasks::new(config.mirror.max_in_flight, stats);
        Ok(Self::new(destinations, primary, mirror, tasks))
    }

    pub fn mirror_tasks(&self) -> &MirrorTasks {
        &self.tasks
    }

    /// Duplicate `inbound` and return the primary's response.
    ///
    /// Mirror copies are handed to the task group first and whatever
    /// happens on the primary leg, so mirrors see the same traffic the
    /// primary does. Only primary errors are returned.
    pub async fn handle(
        &self,
        inbound: InboundRequest,
        correlation_id: &str,
    ) -> Result<reqwest::Response, DuplicateError> {
        let inbound = Arc::new(inbound);

        let dispatched = self.dispatch_mirrors(&inbound, correlation_id);
        tracing::Span::current().record("mirrors", dispatched);

        let primary = &self.destinations.primary;
        let span = httpdup_tracing::primary_forward_span!(correlation_id, primary);
        self.primary
            .clone_and_send(primary, &inbound)
            .instrument(span)
            .await
    }

    /// Spawn one mirror call per configured mirror. Returns how many were
    /// accepted by the task group.
    fn dispatch_mirrors(&self, inbound: &Arc<InboundRequest>, correlation_id: &str) -> usize {
        let mut dispatched = 0;
        for mirror in &self.destinations.mirrors {
            let client = self.mirror.clone();
            let target = mirror.clone();
            let inbound = inbound.clone();
            let span = httpdup_tracing::mirror_request_span!(correlation_id, mirror);

            let call = async move {
                let target = target.destination()?;
                let mut response = client.clone_and_send(target, &inbound).await?;
                let status = response.status().as_u16();

                // Drain and discard so the destination sees a complete exchange.
                let mut drained: u64 = 0;
                while let Some(chunk) = response
                    .chunk()
                    .await
                    .map_err(|e| DuplicateError::from_transport(target.address(), e))?
                {
                    drained += chunk.len() as u64;
                }
                tracing::Span::current().record("drained_bytes", drained);
                tracing::info!(mirror = %target, status, drained_bytes = drained, "Mirror request complete");
                Ok::<(), DuplicateError>(())
            }
            .instrument(span);

            if self.tasks.spawn(mirror.address(), call) {
                dispatched += 1;
            }
        }
        dispatched
    }
}
