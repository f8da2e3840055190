//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Network and port data model.

use std::collections::HashMap;

use derive_new::new;
use nsid_utils::{Label, NsiAgent};

/// A port: either a user-facing port (`remote_network = None`) or an
/// inter-domain link port toward `remote_network`.
#[derive(Clone, Debug, new)]
pub struct Port {
    #[new(into)]
    pub name: String,
    pub remote_network: Option<String>,
    /// Advertised reachability costs, keyed by destination network id.
    /// Seeded at configuration time; refined at runtime by the fetcher
    /// via [`crate::LinkVector::update`].
    #[new(default)]
    pub static_vectors: HashMap<String, u32>,
    /// The label ranges this port can carry, keyed by label type (e.g.
    /// `ethernet-vlan`). A port with no entry for a requested type
    /// cannot be used for that type by the pathfinder.
    #[new(default)]
    pub advertised_labels: HashMap<String, Label>,
    /// Link capacity in Mbps. `None` means unrestricted.
    #[new(default)]
    pub capacity_mbps: Option<u64>,
}

impl Port {
    pub fn is_user_port(&self) -> bool {
        self.remote_network.is_none()
    }

    pub fn with_advertised_label(mut self, label: Label) -> Port {
        self.advertised_labels
            .insert(label.label_type.clone(), label);
        self
    }

    pub fn with_capacity_mbps(mut self, capacity_mbps: u64) -> Port {
        self.capacity_mbps = Some(capacity_mbps);
        self
    }
}

/// A network domain: its ports and its label-swapping capability.
#[derive(Clone, Debug)]
pub struct Network {
    pub id: String,
    pub agent: NsiAgent,
    pub ports: HashMap<String, Port>,
    /// Default swap capability applied to any label type without an
    /// explicit override. Corresponds to `swap-label-for-type` in the
    /// data model; see [`Network::set_can_swap_label`] for the
    /// per-type override used by tests (REDESIGN FLAGS "Dynamic
    /// attribute on networks").
    default_swap: bool,
    swap_overrides: HashMap<String, bool>,
}

impl Network {
    /// Creates a network with no ports and no swap capability
    /// (matching OpenNSA's NML default, where label swapping must be
    /// explicitly enabled per network).
    pub fn new(id: impl Into<String>) -> Network {
        Network {
            id: id.into(),
            agent: NsiAgent::new(
                "",
                "",
                "",
                nsid_utils::nsa::NsiAgentRole::Peer,
            ),
            ports: HashMap::new(),
            default_swap: false,
            swap_overrides: HashMap::new(),
        }
    }

    pub fn add_port(&mut self, port: Port) {
        self.ports.insert(port.name.clone(), port);
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.get(name)
    }

    /// Answers "can this network rewrite a label of `label_type`
    /// between ingress and egress?"
    pub fn can_swap_label(&self, label_type: &str) -> bool {
        self.swap_overrides
            .get(label_type)
            .copied()
            .unwrap_or(self.default_swap)
    }

    /// Sets the swap capability for a specific label type. Passing
    /// `None` sets the default applied to every type without its own
    /// override, matching the test pattern
    /// `nw.canSwapLabel = lambda _: True`.
    pub fn set_can_swap_label(
        &mut self,
        label_type: Option<&str>,
        can_swap: bool,
    ) {
        match label_type {
            Some(label_type) => {
                self.swap_overrides
                    .insert(label_type.to_owned(), can_swap);
            }
            None => self.default_swap = can_swap,
        }
    }
}
