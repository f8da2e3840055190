//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! NSA (Network Service Agent) identity: the immutable peer identity
//! used throughout the registry and aggregator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An NSI agent URN, e.g. `urn:ogf:network:aruba.example:2021:nsa`.
pub type Urn = String;

/// The role an NSA plays towards the local instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NsiAgentRole {
    /// The local instance's own identity.
    Local,
    /// A peer reachable as an upstream aggregator/provider.
    Peer,
}

/// An immutable peer identity: URN, endpoint URL, service type and
/// role.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NsiAgent {
    pub urn: Urn,
    pub endpoint: String,
    pub service_type: String,
    pub role: NsiAgentRole,
}

impl NsiAgent {
    pub fn new(
        urn: impl Into<Urn>,
        endpoint: impl Into<String>,
        service_type: impl Into<String>,
        role: NsiAgentRole,
    ) -> NsiAgent {
        NsiAgent {
            urn: urn.into(),
            endpoint: endpoint.into(),
            service_type: service_type.into(),
            role,
        }
    }
}

impl fmt::Display for NsiAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.urn)
    }
}
