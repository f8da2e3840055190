//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

mod config;
mod discovery;
mod error;
mod provider;
mod rest;
mod store;
mod transport;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use clap::{App, Arg};
use config::Config;
use discovery::HttpDiscoveryClient;
use nsid_aggregator::{Aggregator, Fetcher, DEFAULT_FETCH_INTERVAL};
use nsid_provider::ProviderRegistry;
use nsid_topology::{Network, Topology};
use nsid_utils::{NsiAgent, NsiAgentRole};
use provider::{NoopProvider, PeerProvider};
use rest::InProcessRestApi;
use store::PickleDbConnectionStore;
use tracing::info;
use transport::ReqwestTransport;

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("nsid=debug".parse().unwrap())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Builds the initial topology: just the locally-configured network,
/// with no ports. Populating ports from `nrm-map-file` is a named
/// extension point (spec §6's NRM map is an out-of-scope file format).
fn local_topology(config: &Config) -> Topology {
    let mut topology = Topology::new();
    let network = Network::new(config.network_name.clone());
    let agent = NsiAgent::new(
        config.network_name.clone(),
        format!("{}:{}", config.host, config.port),
        "application/vnd.ogf.nsi.cs.v2+soap",
        NsiAgentRole::Local,
    );
    topology.add_network(network, agent);
    topology
}

/// Wires a provider registry: one factory per distinct peer service
/// type (so the fetcher can `spawn_provider` any peer it discovers),
/// plus the local network's own backend selected by `plugin.name`.
fn build_registry(config: &Config, transport: Arc<ReqwestTransport>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    let mut service_types = HashSet::new();
    for peer in &config.peers {
        service_types.insert(peer.service_type.clone());
    }
    for service_type in service_types {
        let transport = transport.clone();
        registry.register_factory(service_type, move |agent: &NsiAgent| {
            Arc::new(PeerProvider::new(
                agent.urn.clone(),
                agent.endpoint.clone(),
                transport.clone(),
            )) as Arc<dyn nsid_provider::Provider>
        });
    }

    if config.plugin.name == "noop" {
        registry.add_provider(
            format!("{}:local-provider", config.network_name),
            Arc::new(NoopProvider),
            BTreeSet::from([config.network_name.clone()]),
        );
    }

    registry
}

fn main() {
    let matches = App::new("NSI Connection Service daemon")
        .version(clap::crate_version!())
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .get_matches();

    let config = Config::load(matches.value_of("config"));
    if let Err(error) = config.validate() {
        eprintln!("invalid configuration: {error}");
        std::process::exit(1);
    }

    init_tracing();

    let store = match PickleDbConnectionStore::open(&config.database) {
        Ok(store) => Arc::new(store),
        Err(error) => {
            eprintln!("failed to open connection store '{}': {error}", config.database);
            std::process::exit(1);
        }
    };

    let transport = Arc::new(ReqwestTransport::new(config.verify_cert));
    let registry = build_registry(&config, transport.clone());
    let topology = local_topology(&config);
    let aggregator = Aggregator::new(topology, registry, store.clone(), nsid_aggregator::DEFAULT_HOLD_TIMEOUT);

    let peers: Vec<NsiAgent> = config
        .peers
        .iter()
        .map(|peer| NsiAgent::new(peer.urn.clone(), peer.endpoint.clone(), peer.service_type.clone(), NsiAgentRole::Peer))
        .collect();
    let discovery_client = Arc::new(HttpDiscoveryClient::new(transport));
    let fetcher = Arc::new(Fetcher::new(aggregator.clone(), discovery_client, peers));

    let _rest_api: Arc<dyn rest::RestApi> = Arc::new(InProcessRestApi::new(
        aggregator.clone(),
        store,
        config.service_id_start,
    ));
    // Wiring `_rest_api` to a real HTTP server (e.g. the address in
    // `config.rest`) is a named extension point; see DESIGN.md.

    info!(network = %config.network_name, "starting up");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(async move {
            let _fetch_task = fetcher.spawn(DEFAULT_FETCH_INTERVAL);
            if config.rest.enabled {
                info!(address = %config.rest.address, "REST surface enabled but no HTTP listener is wired up");
            }
            std::future::pending::<()>().await;
        });
}
