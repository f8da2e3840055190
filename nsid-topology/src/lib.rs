//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! The topology graph (networks, ports, induced adjacency) and the
//! link-vector reachability table.

pub mod linkvector;
pub mod network;

pub use linkvector::LinkVector;
pub use network::{Network, Port};

use std::collections::{BTreeMap, BTreeSet};

use nsid_utils::NsiAgent;

/// The set of known networks plus the induced bidirectional adjacency
/// graph.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    networks: BTreeMap<String, Network>,
}

impl Topology {
    pub fn new() -> Topology {
        Topology::default()
    }

    /// Inserts (or replaces) a network. Adjacency is derived on demand
    /// from the ports' `remote_network` fields, so insertion order
    /// doesn't matter.
    pub fn add_network(&mut self, network: Network, agent: NsiAgent) {
        let mut network = network;
        network.agent = agent;
        self.networks.insert(network.id.clone(), network);
    }

    pub fn remove_network(&mut self, network_id: &str) -> Option<Network> {
        self.networks.remove(network_id)
    }

    pub fn get(&self, network_id: &str) -> Option<&Network> {
        self.networks.get(network_id)
    }

    pub fn get_mut(&mut self, network_id: &str) -> Option<&mut Network> {
        self.networks.get_mut(network_id)
    }

    pub fn contains(&self, network_id: &str) -> bool {
        self.networks.contains_key(network_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }

    /// The direct graph neighbors of `network_id`: networks for which a
    /// symmetric inter-domain port pair exists on both sides.
    pub fn neighbors(&self, network_id: &str) -> BTreeSet<String> {
        let Some(network) = self.networks.get(network_id) else {
            return BTreeSet::new();
        };
        network
            .ports
            .values()
            .filter_map(|port| port.remote_network.as_ref())
            .filter(|remote| self.has_symmetric_link(network_id, remote))
            .cloned()
            .collect()
    }

    /// The local port on `a` that faces `b`, or `None` if no symmetric
    /// link exists between the two networks.
    pub fn port_between(&self, a: &str, b: &str) -> Option<&Port> {
        if !self.has_symmetric_link(a, b) {
            return None;
        }
        self.networks
            .get(a)?
            .ports
            .values()
            .find(|port| port.remote_network.as_deref() == Some(b))
    }

    fn has_symmetric_link(&self, a: &str, b: &str) -> bool {
        let a_to_b = self.networks.get(a).is_some_and(|network| {
            network
                .ports
                .values()
                .any(|port| port.remote_network.as_deref() == Some(b))
        });
        let b_to_a = self.networks.get(b).is_some_and(|network| {
            network
                .ports
                .values()
                .any(|port| port.remote_network.as_deref() == Some(a))
        });
        a_to_b && b_to_a
    }
}

#[cfg(test)]
mod tests {
    use nsid_utils::nsa::NsiAgentRole;

    use super::*;

    fn agent(id: &str) -> NsiAgent {
        NsiAgent::new(
            format!("urn:{id}:nsa"),
            format!("https://{id}.example/nsa"),
            "application/vnd.ogf.nsi.cs.v2+soap",
            NsiAgentRole::Peer,
        )
    }

    #[test]
    fn neighbors_require_symmetric_ports() {
        let mut topo = Topology::new();
        let mut a = Network::new("a");
        a.add_port(Port::new("a-b", Some("b".to_owned())));
        topo.add_network(a, agent("a"));

        // "b" doesn't yet have a port back towards "a".
        let b = Network::new("b");
        topo.add_network(b, agent("b"));
        assert!(topo.neighbors("a").is_empty());

        let mut b = Network::new("b");
        b.add_port(Port::new("b-a", Some("a".to_owned())));
        topo.add_network(b, agent("b"));
        assert_eq!(
            topo.neighbors("a"),
            BTreeSet::from(["b".to_owned()])
        );
        assert!(topo.port_between("a", "b").is_some());
    }
}
