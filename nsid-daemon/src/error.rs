//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

use std::fmt;

/// Fatal startup misconfiguration (spec §7: `ConfigurationError` is
/// fatal at startup, unlike every other error kind in this crate).
#[derive(Debug)]
pub enum ConfigurationError {
    /// `tls = true` without one of `key`/`certificate`/`certificate-dir`.
    IncompleteTls { missing: &'static str },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::IncompleteTls { missing } => {
                write!(f, "tls is enabled but '{missing}' is not set")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}
