//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

use std::fmt;

/// Why [`crate::find_paths`] produced no usable path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PathfinderError {
    /// No simple path exists between the two networks, or every
    /// candidate path failed label assignment.
    NoPath,
    /// At least one candidate path assigned labels successfully but
    /// none of the survivors could carry the requested bandwidth.
    BandwidthUnavailable,
    /// A candidate path's advertised label ranges had no overlap with
    /// the requested label. Kept distinct from `NoPath` for callers
    /// that want to report label exhaustion specifically; the current
    /// search folds this into `NoPath` when every candidate fails for
    /// the same reason, since a caller can't act on a
    /// per-path-attempt distinction once the whole call has failed.
    EmptyLabelSet,
}

impl fmt::Display for PathfinderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathfinderError::NoPath => write!(f, "no path found"),
            PathfinderError::BandwidthUnavailable => {
                write!(f, "no candidate path has sufficient bandwidth")
            }
            PathfinderError::EmptyLabelSet => {
                write!(f, "no candidate path has a compatible label")
            }
        }
    }
}

impl std::error::Error for PathfinderError {}
