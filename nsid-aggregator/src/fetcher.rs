//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Periodic peer discovery (spec §4.7): pulls each configured peer's
//! discovery document and folds it into the topology, link-vector
//! table and provider registry. The only component allowed to mutate
//! those three after startup.
//!
//! Structured after `holo-protocol`'s instance/event-loop split: the
//! transport is a trait the caller supplies (`nsid-daemon` wires in
//! the SOAP/HTTP client), and this module owns only the scheduling
//! and merge logic.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex as SyncMutex;
use std::time::Duration;

use async_trait::async_trait;
use nsid_topology::{Network, Port};
use nsid_utils::task::IntervalTask;
use nsid_utils::{NsiAgent, Urn};
use tracing::{info, warn};

use crate::Aggregator;

/// Default fetch period (spec §4.7: "Periodically (default 60s)").
pub const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_secs(60);

/// One inter-domain port this peer advertises: the local port name,
/// the remote network it faces, and the peer-reported reachability
/// costs beyond it.
#[derive(Clone, Debug)]
pub struct AdvertisedPort {
    pub local_port: String,
    pub remote_network: Option<String>,
    pub reachable: Vec<(String, u32)>,
}

/// A peer's discovery document, reduced to what the fetcher needs:
/// its identity, the networks it serves, and each network's ports.
#[derive(Clone, Debug)]
pub struct PeerDiscovery {
    pub agent: NsiAgent,
    pub networks: Vec<(String, Vec<AdvertisedPort>)>,
}

/// Raised when a peer can't be reached or its discovery document
/// can't be parsed. Non-fatal to the fetch cycle: other peers are
/// still processed.
#[derive(Debug)]
pub struct FetchError {
    pub peer: Urn,
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "discovery fetch from '{}' failed: {}", self.peer, self.source)
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// The peer-transport seam: `nsid-daemon` implements this over
/// SOAP/HTTP (spec §4.8); tests supply an in-memory double.
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    async fn fetch(&self, peer: &NsiAgent) -> Result<PeerDiscovery, FetchError>;
}

/// Drives one fetch cycle (manually or on an [`IntervalTask`]) against
/// a fixed set of configured peers.
pub struct Fetcher {
    aggregator: Arc<Aggregator>,
    client: Arc<dyn DiscoveryClient>,
    peers: Vec<NsiAgent>,
    known: SyncMutex<HashSet<Urn>>,
}

impl Fetcher {
    pub fn new(
        aggregator: Arc<Aggregator>,
        client: Arc<dyn DiscoveryClient>,
        peers: Vec<NsiAgent>,
    ) -> Fetcher {
        Fetcher {
            aggregator,
            client,
            peers,
            known: SyncMutex::new(HashSet::new()),
        }
    }

    /// Starts the periodic fetch cycle. Dropping the returned handle
    /// cancels it.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> IntervalTask {
        IntervalTask::new(interval, true, move || {
            let fetcher = self.clone();
            async move {
                fetcher.run_once().await;
            }
        })
    }

    /// Runs one discovery cycle: fetches every configured peer, folds
    /// successful results into topology/link-vector/registry, and
    /// purges peers that no longer respond from the "known" set so
    /// their vectors don't linger forever on a single failed poll
    /// (removal proper, item 3, only fires once a peer is dropped
    /// from configuration — see [`Fetcher::remove_peer`]).
    pub async fn run_once(&self) {
        for peer in &self.peers {
            match self.client.fetch(peer).await {
                Ok(discovery) => self.apply(discovery).await,
                Err(err) => warn!(error = %err, "discovery fetch failed"),
            }
        }
    }

    async fn apply(&self, discovery: PeerDiscovery) {
        let network_ids: BTreeSet<String> = discovery
            .networks
            .iter()
            .map(|(id, _)| id.clone())
            .collect();

        let mut topology = (*self.aggregator.topology()).clone();
        for (network_id, ports) in &discovery.networks {
            let mut network = topology
                .get(network_id)
                .cloned()
                .unwrap_or_else(|| Network::new(network_id.clone()));
            for advertised in ports {
                network.add_port(Port::new(
                    advertised.local_port.clone(),
                    advertised.remote_network.clone(),
                ));
            }
            topology.add_network(network, discovery.agent.clone());
        }
        self.aggregator.update_topology(topology);

        {
            let mut link_vector = self.aggregator.link_vector();
            for (_, ports) in &discovery.networks {
                for advertised in ports {
                    if advertised.reachable.is_empty() {
                        continue;
                    }
                    let costs = advertised
                        .reachable
                        .iter()
                        .map(|(network, cost)| (network.clone(), cost + 1))
                        .collect();
                    link_vector.update(&advertised.local_port, costs);
                }
            }
        }

        self.known.lock().unwrap().insert(discovery.agent.urn.clone());
        let spawned = self
            .aggregator
            .registry()
            .await
            .spawn_provider(&discovery.agent, network_ids);
        match spawned {
            Ok(_) => info!(urn = %discovery.agent.urn, "refreshed peer discovery"),
            Err(err) => warn!(urn = %discovery.agent.urn, error = %err, "provider spawn failed"),
        }
    }

    /// Drops a peer from configuration: purges its provider, its
    /// topology networks and every link-vector entry sourced from a
    /// port of theirs (spec §4.7 item 3).
    pub async fn remove_peer(&self, urn: &Urn) {
        if !self.known.lock().unwrap().remove(urn) {
            return;
        }

        let owned_networks: Vec<String> = {
            let registry = self.aggregator.registry().await;
            registry
                .network_ids_for(urn)
                .map(|ids| ids.iter().cloned().collect())
                .unwrap_or_default()
        };

        let mut topology = (*self.aggregator.topology()).clone();
        let mut removed_ports = Vec::new();
        for network_id in &owned_networks {
            if let Some(network) = topology.remove_network(network_id) {
                removed_ports.extend(network.ports.into_keys());
            }
        }
        self.aggregator.update_topology(topology);

        let mut link_vector = self.aggregator.link_vector();
        for port in removed_ports {
            link_vector.remove_port(&port);
        }
        drop(link_vector);

        self.aggregator.registry().await.remove(urn);
        info!(urn = %urn, "removed peer");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use nsid_provider::ProviderRegistry;
    use nsid_topology::Topology;
    use nsid_utils::NsiAgentRole;

    use super::*;
    use crate::store::InMemoryConnectionStore;

    fn peer(id: &str) -> NsiAgent {
        NsiAgent::new(
            format!("urn:{id}:nsa"),
            format!("https://{id}.example/nsa"),
            "application/vnd.ogf.nsi.cs.v2+soap",
            NsiAgentRole::Peer,
        )
    }

    struct StaticClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DiscoveryClient for StaticClient {
        async fn fetch(&self, peer: &NsiAgent) -> Result<PeerDiscovery, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PeerDiscovery {
                agent: peer.clone(),
                networks: vec![(
                    "bonaire".to_owned(),
                    vec![AdvertisedPort {
                        local_port: "bonaire-curacao".to_owned(),
                        remote_network: Some("curacao".to_owned()),
                        reachable: vec![("curacao".to_owned(), 0)],
                    }],
                )],
            })
        }
    }

    fn aggregator() -> Arc<Aggregator> {
        let mut registry = ProviderRegistry::new();
        registry.register_factory("application/vnd.ogf.nsi.cs.v2+soap", |_| {
            unimplemented!("fetcher tests never dispatch a reserve")
        });
        Aggregator::new(
            Topology::new(),
            registry,
            Arc::new(InMemoryConnectionStore::new()),
            Duration::from_secs(120),
        )
    }

    #[tokio::test]
    async fn run_once_populates_topology_and_link_vector() {
        let aggregator = aggregator();
        let client = Arc::new(StaticClient {
            calls: AtomicUsize::new(0),
        });
        let fetcher = Fetcher::new(aggregator.clone(), client.clone(), vec![peer("bonaire")]);

        fetcher.run_once().await;

        assert!(aggregator.topology().contains("bonaire"));
        assert_eq!(
            aggregator.link_vector().vector("curacao"),
            vec![("bonaire-curacao".to_owned(), 1)]
        );
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }
}
