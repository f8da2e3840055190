//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! The `Provider` trait: the capability set every connection backend
//! implements, dispatched on at runtime per the network's declared
//! service type (spec REDESIGN FLAGS "Runtime dispatch on backend
//! type" — modeled here as a trait object rather than a closed enum,
//! so new backend kinds plug in without touching the aggregator).

use async_trait::async_trait;
use nsid_utils::Stp;
use serde::{Deserialize, Serialize};

use crate::ProviderError;

/// A single-segment reservation request handed to a provider.
#[derive(Clone, Debug)]
pub struct ReserveRequest {
    pub connection_id: String,
    pub src: Stp,
    pub dst: Stp,
    pub bandwidth_mbps: u64,
}

/// The provider-reported lifecycle state of a segment, mirrored from
/// the aggregator's own connection state machine (spec §5).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SegmentState {
    Reserved,
    Provisioned,
    Released,
    Terminated,
}

/// A connection backend: either a local NRM-backed network or a proxy
/// to a peer NSA reached over SOAP/HTTP.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn reserve(&self, request: &ReserveRequest) -> Result<(), ProviderError>;
    async fn reserve_commit(&self, connection_id: &str) -> Result<(), ProviderError>;
    async fn reserve_abort(&self, connection_id: &str) -> Result<(), ProviderError>;
    async fn provision(&self, connection_id: &str) -> Result<(), ProviderError>;
    async fn release(&self, connection_id: &str) -> Result<(), ProviderError>;
    async fn terminate(&self, connection_id: &str) -> Result<(), ProviderError>;
    async fn query(&self, connection_id: &str) -> Result<SegmentState, ProviderError>;
}
