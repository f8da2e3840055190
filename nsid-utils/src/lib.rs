//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Shared, leaf-level types used by every other crate in the workspace:
//! the VLAN label algebra, STP/NSA identity types, the async task
//! wrappers, and the `with_source` error-chaining helper.

pub mod error;
pub mod label;
pub mod nsa;
pub mod stp;
pub mod task;

pub use error::{with_source, with_source_dyn};
pub use label::{EmptyLabelSet, Label, LabelParseError};
pub use nsa::{NsiAgent, NsiAgentRole, Urn};
pub use stp::Stp;
