//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! STP (Service Termination Point): the endpoint of a connection
//! segment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::label::Label;

/// A Service Termination Point: (network-id, port-id, label).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Stp {
    pub network_id: String,
    pub port_id: String,
    pub label: Label,
}

impl Stp {
    pub fn new(
        network_id: impl Into<String>,
        port_id: impl Into<String>,
        label: Label,
    ) -> Stp {
        Stp {
            network_id: network_id.into(),
            port_id: port_id.into(),
            label,
        }
    }
}

impl fmt::Display for Stp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}?vlan={}", self.network_id, self.port_id, self.label)
    }
}
