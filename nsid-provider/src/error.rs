//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

use std::fmt;

use nsid_utils::with_source_dyn;

/// Failure modes of provider lookup, spawning, and dispatch.
#[derive(Debug)]
pub enum ProviderError {
    /// No factory is registered for the NSA's advertised service type.
    NoFactory { service_type: String },
    /// A URN or network id couldn't be resolved to a provider.
    StpResolution { what: String },
    /// The backend itself rejected the call (transport error, SOAP
    /// fault, or a rejection reported by the remote NSA).
    Backend {
        network_id: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NoFactory { service_type } => {
                write!(f, "no provider factory registered for service type '{service_type}'")
            }
            ProviderError::StpResolution { what } => {
                write!(f, "could not resolve a provider for {what}")
            }
            ProviderError::Backend { network_id, source } => {
                write!(f, "provider call to '{network_id}' failed: {}", with_source_dyn(source.as_ref()))
            }
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Backend { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl ProviderError {
    pub fn log(&self) {
        tracing::warn!(error = %self, "provider call failed");
    }
}
