//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Connection orchestration: reservation, commit, provisioning,
//! release and termination, fanned out in parallel across segment
//! providers with compensating abort on partial failure.
//!
//! The hold timer is built on [`nsid_utils::task::TimeoutTask`], the
//! same wrapper `holo-isis` uses to drive its SPF-delay scheduling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use futures::future::join_all;
use nsid_pathfinder::find_paths;
use nsid_provider::{Provider, ProviderError, ProviderRegistry, ReserveRequest, SegmentState};
use nsid_topology::{LinkVector, Topology};
use nsid_utils::task::TimeoutTask;
use nsid_utils::Stp;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::state::{Connection, ConnectionEventLog, ConnectionState, Segment};
use crate::store::ConnectionStore;
use crate::AggregatorError;

/// How long a held-but-uncommitted reservation is kept before it's
/// automatically compensated (spec §5 hold timer).
pub const DEFAULT_HOLD_TIMEOUT: Duration = Duration::from_secs(120);

const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_FACTOR: u32 = 2;
const RETRY_CAP: Duration = Duration::from_secs(60);
const RETRY_MAX_ATTEMPTS: u32 = 5;

/// Which provider method a fanned-out segment call should invoke.
#[derive(Clone, Copy)]
enum SegOp {
    ReserveCommit,
    Provision,
    Release,
    Terminate,
}

async fn call_segment(
    provider: Arc<dyn Provider>,
    connection_id: String,
    op: SegOp,
) -> Result<(), ProviderError> {
    match op {
        SegOp::ReserveCommit => provider.reserve_commit(&connection_id).await,
        SegOp::Provision => provider.provision(&connection_id).await,
        SegOp::Release => provider.release(&connection_id).await,
        SegOp::Terminate => provider.terminate(&connection_id).await,
    }
}

/// Drives the connection lifecycle for every connection known to this
/// instance: the topology/registry it reads, the durable store it
/// mirrors state into, and the in-flight hold timers it owns.
pub struct Aggregator {
    topology: ArcSwap<Topology>,
    link_vector: SyncMutex<LinkVector>,
    registry: Mutex<ProviderRegistry>,
    store: Arc<dyn ConnectionStore>,
    connections: Mutex<HashMap<String, Connection>>,
    events: SyncMutex<ConnectionEventLog>,
    hold_timers: SyncMutex<HashMap<String, TimeoutTask>>,
    hold_timeout: Duration,
}

impl Aggregator {
    pub fn new(
        topology: Topology,
        registry: ProviderRegistry,
        store: Arc<dyn ConnectionStore>,
        hold_timeout: Duration,
    ) -> Arc<Aggregator> {
        Arc::new(Aggregator {
            topology: ArcSwap::from_pointee(topology),
            link_vector: SyncMutex::new(LinkVector::new()),
            registry: Mutex::new(registry),
            store,
            connections: Mutex::new(HashMap::new()),
            events: SyncMutex::new(ConnectionEventLog::new()),
            hold_timers: SyncMutex::new(HashMap::new()),
            hold_timeout,
        })
    }

    /// The current topology snapshot. Cheap: it's an `Arc` clone, not
    /// a deep copy.
    pub fn topology(&self) -> Arc<Topology> {
        self.topology.load_full()
    }

    /// Replaces the topology snapshot wholesale, e.g. after a fetch
    /// cycle. Readers already holding the previous `Arc` (via
    /// [`ArcSwap::load`]) keep seeing a consistent, unchanging view.
    pub fn update_topology(&self, topology: Topology) {
        self.topology.store(Arc::new(topology));
    }

    pub async fn registry(&self) -> tokio::sync::MutexGuard<'_, ProviderRegistry> {
        self.registry.lock().await
    }

    pub fn link_vector(&self) -> std::sync::MutexGuard<'_, LinkVector> {
        self.link_vector.lock().unwrap()
    }

    fn record_transition(&self, connection: &mut Connection, to: ConnectionState) {
        let from = connection.state;
        connection.state = to;
        self.events
            .lock()
            .unwrap()
            .record(&connection.connection_id, from, to, Utc::now());
        self.store.put(connection);
    }

    pub async fn query(&self, connection_id: &str) -> Result<Connection, AggregatorError> {
        self.connections
            .lock()
            .await
            .get(connection_id)
            .cloned()
            .ok_or_else(|| AggregatorError::UnknownConnection {
                connection_id: connection_id.to_owned(),
            })
    }

    /// RESERVE: finds a path, fans a reserve-request out to every
    /// segment's provider in parallel, and compensates (aborts the
    /// segments that succeeded) if any segment fails. On success the
    /// connection enters `RESERVE_HELD` and a hold timer starts.
    pub async fn reserve(
        self: &Arc<Self>,
        connection_id: impl Into<String>,
        requester_nsa: impl Into<String>,
        src: Stp,
        dst: Stp,
        bandwidth_mbps: u64,
    ) -> Result<Connection, AggregatorError> {
        let connection_id = connection_id.into();
        let mut connection = Connection::new(
            connection_id.clone(),
            requester_nsa,
            src.clone(),
            dst.clone(),
            bandwidth_mbps,
            Utc::now(),
        );
        self.record_transition(&mut connection, ConnectionState::ReserveChecking);

        let topology = self.topology.load_full();
        let candidates = match find_paths(&topology, &src, &dst, bandwidth_mbps) {
            Ok(candidates) => candidates,
            Err(err) => {
                self.record_transition(&mut connection, ConnectionState::ReserveFailed);
                return Err(err.into());
            }
        };

        // Try each candidate path in order, compensating and moving on
        // to the next on any segment failure; only the last candidate's
        // failure is surfaced if every one of them fails.
        let mut last_err = None;
        let mut reserved = None;
        for candidate in candidates {
            let segments = match self.build_segments(&candidate).await {
                Ok(segments) => segments,
                Err(err) => {
                    last_err = Some(err);
                    continue;
                }
            };

            let providers = self.resolve_providers(&segments).await;
            let futs = segments.iter().zip(providers.into_iter()).map(|(segment, provider)| {
                let connection_id = connection_id.clone();
                let network_id = segment.network_id.clone();
                let request = ReserveRequest {
                    connection_id: connection_id.clone(),
                    src: segment.src.clone(),
                    dst: segment.dst.clone(),
                    bandwidth_mbps,
                };
                async move {
                    let provider = provider?;
                    provider
                        .reserve(&request)
                        .await
                        .map_err(|source| AggregatorError::SegmentFailed { network_id, source })
                }
            });
            let results = join_all(futs).await;

            if let Some(err) = results.into_iter().find_map(Result::err) {
                warn!(connection_id = %connection_id, error = %err, "candidate path failed, compensating");
                self.compensate(&connection_id, &segments).await;
                last_err = Some(err);
                continue;
            }

            reserved = Some(segments);
            break;
        }

        let Some(segments) = reserved else {
            let err = last_err.expect("find_paths never returns an empty Ok");
            self.record_transition(&mut connection, ConnectionState::ReserveFailed);
            return Err(err);
        };

        connection.segments = segments;
        self.record_transition(&mut connection, ConnectionState::ReserveHeld);
        self.connections
            .lock()
            .await
            .insert(connection_id.clone(), connection.clone());
        self.arm_hold_timer(connection_id);

        Ok(connection)
    }

    /// Resolves a candidate path's provider urns and builds its
    /// `Segment`s, without yet attempting any reservation.
    async fn build_segments(
        &self,
        candidate: &[nsid_pathfinder::Link],
    ) -> Result<Vec<Segment>, AggregatorError> {
        let mut segments = Vec::with_capacity(candidate.len());
        let registry = self.registry.lock().await;
        for link in candidate {
            let urn = registry.get_provider_by_network(&link.network_id)?;
            segments.push(Segment {
                network_id: link.network_id.clone(),
                provider_urn: urn,
                src: Stp::new(
                    link.network_id.clone(),
                    link.ingress_port.clone(),
                    link.src_label.clone(),
                ),
                dst: Stp::new(
                    link.network_id.clone(),
                    link.egress_port.clone(),
                    link.dst_label.clone(),
                ),
                state: SegmentState::Reserved,
            });
        }
        Ok(segments)
    }

    fn arm_hold_timer(self: &Arc<Self>, connection_id: String) {
        let aggregator = self.clone();
        let key = connection_id.clone();
        let task = TimeoutTask::new(self.hold_timeout, move || {
            let aggregator = aggregator.clone();
            async move {
                aggregator.expire_hold(&connection_id).await;
            }
        });
        self.hold_timers.lock().unwrap().insert(key, task);
    }

    async fn expire_hold(self: &Arc<Self>, connection_id: &str) {
        let mut connections = self.connections.lock().await;
        let Some(connection) = connections.get_mut(connection_id) else {
            return;
        };
        if connection.state != ConnectionState::ReserveHeld {
            return;
        }
        warn!(connection_id, "hold timer expired, compensating");
        let segments = connection.segments.clone();
        self.compensate(connection_id, &segments).await;
        self.record_transition(connection, ConnectionState::ReserveFailed);
    }

    async fn resolve_providers(
        &self,
        segments: &[Segment],
    ) -> Vec<Result<Arc<dyn Provider>, AggregatorError>> {
        let registry = self.registry.lock().await;
        segments
            .iter()
            .map(|segment| {
                registry
                    .get_provider(&segment.provider_urn)
                    .map_err(AggregatorError::from)
            })
            .collect()
    }

    /// Calls `reserve_abort` on every segment, logging (never
    /// propagating) failures: compensation is best-effort once a
    /// reservation has already failed.
    async fn compensate(&self, connection_id: &str, segments: &[Segment]) {
        let providers = self.resolve_providers(segments).await;
        let aborts = providers.into_iter().map(|provider| {
            let connection_id = connection_id.to_owned();
            async move {
                let Ok(provider) = provider else { return };
                if let Err(err) = provider.reserve_abort(&connection_id).await {
                    err.log();
                }
            }
        });
        join_all(aborts).await;
    }

    /// Fans `op` out to every segment's provider in parallel,
    /// retrying each with bounded exponential backoff when `retried`
    /// is set.
    async fn run_segments(
        &self,
        connection_id: &str,
        segments: &[Segment],
        op: SegOp,
        retried: bool,
    ) -> Result<(), AggregatorError> {
        let providers = self.resolve_providers(segments).await;
        let futs = segments.iter().zip(providers.into_iter()).map(|(segment, provider)| {
            let connection_id = connection_id.to_owned();
            let network_id = segment.network_id.clone();
            async move {
                let provider = provider?;
                let result = if retried {
                    retry_with_backoff(|| {
                        let provider = provider.clone();
                        let connection_id = connection_id.clone();
                        async move { call_segment(provider, connection_id, op).await }
                    })
                    .await
                } else {
                    call_segment(provider, connection_id.clone(), op).await
                };
                result.map_err(|source| AggregatorError::SegmentFailed { network_id, source })
            }
        });
        let results = join_all(futs).await;
        results.into_iter().collect::<Result<Vec<()>, _>>()?;
        Ok(())
    }

    /// RESERVE COMMIT: `RESERVE_HELD -> RESERVE_COMMITTING -> RESERVED`.
    pub async fn commit(&self, connection_id: &str) -> Result<(), AggregatorError> {
        self.cancel_hold_timer(connection_id);
        self.drive(
            connection_id,
            ConnectionState::ReserveHeld,
            ConnectionState::ReserveCommitting,
            ConnectionState::Reserved,
            "reserveCommit",
            SegOp::ReserveCommit,
            false,
        )
        .await
    }

    /// PROVISION: `RESERVED -> PROVISIONING -> PROVISIONED`, retried
    /// per segment with bounded exponential backoff.
    pub async fn provision(&self, connection_id: &str) -> Result<(), AggregatorError> {
        self.drive(
            connection_id,
            ConnectionState::Reserved,
            ConnectionState::Provisioning,
            ConnectionState::Provisioned,
            "provision",
            SegOp::Provision,
            true,
        )
        .await
    }

    /// RELEASE: `PROVISIONED -> RELEASING -> RESERVED`, retried per
    /// segment with the same backoff as provision.
    pub async fn release(&self, connection_id: &str) -> Result<(), AggregatorError> {
        self.drive(
            connection_id,
            ConnectionState::Provisioned,
            ConnectionState::Releasing,
            ConnectionState::Reserved,
            "release",
            SegOp::Release,
            true,
        )
        .await
    }

    /// TERMINATE: valid from any non-terminal state; idempotent once
    /// already `TERMINATED`.
    pub async fn terminate(&self, connection_id: &str) -> Result<(), AggregatorError> {
        self.cancel_hold_timer(connection_id);
        let mut connections = self.connections.lock().await;
        let connection = connections
            .get_mut(connection_id)
            .ok_or_else(|| AggregatorError::UnknownConnection {
                connection_id: connection_id.to_owned(),
            })?;
        if connection.state == ConnectionState::Terminated {
            return Ok(());
        }

        self.record_transition(connection, ConnectionState::Terminating);
        let segments = connection.segments.clone();
        drop(connections);

        self.best_effort_terminate(connection_id, &segments).await;

        let mut connections = self.connections.lock().await;
        let connection = connections.get_mut(connection_id).unwrap();
        self.record_transition(connection, ConnectionState::Terminated);
        info!(connection_id, "connection terminated");
        Ok(())
    }

    /// Calls `terminate` on every segment, logging (never propagating)
    /// failures: a provider that's already gone shouldn't block the
    /// connection from reaching TERMINATED locally.
    async fn best_effort_terminate(&self, connection_id: &str, segments: &[Segment]) {
        let providers = self.resolve_providers(segments).await;
        let terminates = providers.into_iter().map(|provider| {
            let connection_id = connection_id.to_owned();
            async move {
                let Ok(provider) = provider else { return };
                if let Err(err) = provider.terminate(&connection_id).await {
                    err.log();
                }
            }
        });
        join_all(terminates).await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn drive(
        &self,
        connection_id: &str,
        from: ConnectionState,
        transient: ConnectionState,
        to: ConnectionState,
        operation: &'static str,
        op: SegOp,
        retried: bool,
    ) -> Result<(), AggregatorError> {
        let segments = {
            let mut connections = self.connections.lock().await;
            let connection = connections
                .get_mut(connection_id)
                .ok_or_else(|| AggregatorError::UnknownConnection {
                    connection_id: connection_id.to_owned(),
                })?;
            if connection.state != from {
                return Err(AggregatorError::InvalidTransition {
                    connection_id: connection_id.to_owned(),
                    from: connection.state.as_str(),
                    operation,
                });
            }
            self.record_transition(connection, transient);
            connection.segments.clone()
        };

        let outcome = self.run_segments(connection_id, &segments, op, retried).await;

        match outcome {
            Ok(()) => {
                let mut connections = self.connections.lock().await;
                let connection = connections.get_mut(connection_id).unwrap();
                self.record_transition(connection, to);
                Ok(())
            }
            Err(err) => {
                // Retry exhaustion is fatal: the connection can't stay
                // in a transient state, so it moves through TERMINATING
                // the same way an explicit terminate() would.
                let terminating_segments = {
                    let mut connections = self.connections.lock().await;
                    let connection = connections.get_mut(connection_id).unwrap();
                    self.record_transition(connection, ConnectionState::Terminating);
                    connection.segments.clone()
                };
                self.best_effort_terminate(connection_id, &terminating_segments).await;

                let mut connections = self.connections.lock().await;
                let connection = connections.get_mut(connection_id).unwrap();
                self.record_transition(connection, ConnectionState::Terminated);
                Err(err)
            }
        }
    }

    fn cancel_hold_timer(&self, connection_id: &str) {
        self.hold_timers.lock().unwrap().remove(connection_id);
    }
}

/// Bounded exponential backoff: base 1s, factor 2, capped at 60s, up
/// to 5 attempts total, matching the provision/release retry policy.
async fn retry_with_backoff<F, Fut>(mut operation: F) -> Result<(), ProviderError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<(), ProviderError>>,
{
    let mut delay = RETRY_BASE;
    let mut last_err = None;
    for attempt in 0..RETRY_MAX_ATTEMPTS {
        match operation().await {
            Ok(()) => return Ok(()),
            Err(err) => {
                err.log();
                last_err = Some(err);
                if attempt + 1 < RETRY_MAX_ATTEMPTS {
                    tokio::time::sleep(delay).await;
                    delay = (delay * RETRY_FACTOR).min(RETRY_CAP);
                }
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}
