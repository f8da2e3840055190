//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Error-chaining helper shared by every crate's `error` module.
//!
//! Error kinds themselves aren't centralized here: each crate defines
//! its own enum (`Error`) with a `log()` method, the same way every
//! protocol crate in the teacher workspace does. Centralizing them
//! would create a dependency every leaf crate needs just to report one
//! failure mode.

/// Flattens an error's `source()` chain into a single human-readable
/// string, e.g. `"failed to call peer (connection refused)"`.
pub fn with_source<E: std::error::Error + 'static>(error: E) -> String {
    with_source_dyn(&error)
}

/// Same as [`with_source`], for callers that only hold a boxed trait
/// object (e.g. a `Box<dyn Error + Send + Sync>` stashed in another
/// crate's error variant).
pub fn with_source_dyn(error: &(dyn std::error::Error + 'static)) -> String {
    if let Some(source) = error.source() {
        format!("{} ({})", error, with_source_dyn(source))
    } else {
        error.to_string()
    }
}
