//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

use std::fmt;

use nsid_pathfinder::PathfinderError;
use nsid_provider::ProviderError;

/// Failure modes of connection orchestration.
#[derive(Debug)]
pub enum AggregatorError {
    /// No connection with this id is known to this instance.
    UnknownConnection { connection_id: String },
    /// The requested operation isn't valid from the connection's
    /// current state (spec §5's state machine).
    InvalidTransition {
        connection_id: String,
        from: &'static str,
        operation: &'static str,
    },
    /// Pathfinding failed; the reservation never reaches
    /// `RESERVE_HELD`.
    NoPath(PathfinderError),
    /// At least one segment provider rejected the call; the
    /// connection has already been compensated (aborted/released) by
    /// the time this is returned.
    SegmentFailed {
        network_id: String,
        source: ProviderError,
    },
    /// A segment's provider couldn't be resolved from the registry
    /// (unknown urn, or its network id was dropped by the fetcher
    /// mid-flight).
    ProviderUnavailable(ProviderError),
}

impl fmt::Display for AggregatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregatorError::UnknownConnection { connection_id } => {
                write!(f, "unknown connection '{connection_id}'")
            }
            AggregatorError::InvalidTransition {
                connection_id,
                from,
                operation,
            } => write!(
                f,
                "connection '{connection_id}' cannot accept '{operation}' while in state '{from}'"
            ),
            AggregatorError::NoPath(inner) => write!(f, "{inner}"),
            AggregatorError::SegmentFailed { network_id, source } => {
                write!(f, "segment on '{network_id}' failed: {source}")
            }
            AggregatorError::ProviderUnavailable(inner) => write!(f, "{inner}"),
        }
    }
}

impl std::error::Error for AggregatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AggregatorError::NoPath(inner) => Some(inner),
            AggregatorError::SegmentFailed { source, .. } => Some(source),
            AggregatorError::ProviderUnavailable(inner) => Some(inner),
            _ => None,
        }
    }
}

impl AggregatorError {
    pub fn log(&self) {
        tracing::warn!(error = %self, "connection operation failed");
    }
}

impl From<PathfinderError> for AggregatorError {
    fn from(value: PathfinderError) -> Self {
        AggregatorError::NoPath(value)
    }
}

impl From<ProviderError> for AggregatorError {
    fn from(value: ProviderError) -> Self {
        AggregatorError::ProviderUnavailable(value)
    }
}
