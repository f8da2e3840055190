//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! A [`Provider`] implementation that proxies every call to a peer NSA
//! over [`PeerTransport`]. Envelope bodies are a minimal hand-rolled
//! convention, not a real NSI SOAP payload — full envelope
//! (de)serialization is named out of scope.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nsid_provider::{Provider, ProviderError, ReserveRequest, SegmentState};

use crate::transport::{PeerTransport, DEFAULT_CALL_TIMEOUT};

/// The built-in default backend selected by `plugin.name = "noop"`:
/// accepts every call without touching any hardware state. Stands in
/// for the device-specific NRM backend driver named out of scope;
/// a real driver is a named extension point selected by `plugin.name`.
pub struct NoopProvider;

#[async_trait]
impl Provider for NoopProvider {
    async fn reserve(&self, _request: &ReserveRequest) -> Result<(), ProviderError> {
        Ok(())
    }
    async fn reserve_commit(&self, _connection_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }
    async fn reserve_abort(&self, _connection_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }
    async fn provision(&self, _connection_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }
    async fn release(&self, _connection_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }
    async fn terminate(&self, _connection_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }
    async fn query(&self, _connection_id: &str) -> Result<SegmentState, ProviderError> {
        Ok(SegmentState::Reserved)
    }
}

pub struct PeerProvider {
    network_id: String,
    endpoint: String,
    transport: Arc<dyn PeerTransport>,
    timeout: Duration,
}

impl PeerProvider {
    pub fn new(
        network_id: impl Into<String>,
        endpoint: impl Into<String>,
        transport: Arc<dyn PeerTransport>,
    ) -> PeerProvider {
        PeerProvider {
            network_id: network_id.into(),
            endpoint: endpoint.into(),
            transport,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    async fn call(&self, soap_action: &str, envelope: String) -> Result<Vec<u8>, ProviderError> {
        self.transport
            .call(&self.endpoint, soap_action, &envelope, self.timeout)
            .await
            .map_err(|source| ProviderError::Backend {
                network_id: self.network_id.clone(),
                source: Box::new(source),
            })
    }
}

#[async_trait]
impl Provider for PeerProvider {
    async fn reserve(&self, request: &ReserveRequest) -> Result<(), ProviderError> {
        let envelope = format!(
            "<reserve connectionId=\"{}\" src=\"{}\" dst=\"{}\" bandwidthMbps=\"{}\"/>",
            request.connection_id, request.src, request.dst, request.bandwidth_mbps
        );
        self.call("reserve", envelope).await?;
        Ok(())
    }

    async fn reserve_commit(&self, connection_id: &str) -> Result<(), ProviderError> {
        self.call("reserveCommit", format!("<reserveCommit connectionId=\"{connection_id}\"/>"))
            .await?;
        Ok(())
    }

    async fn reserve_abort(&self, connection_id: &str) -> Result<(), ProviderError> {
        self.call("reserveAbort", format!("<reserveAbort connectionId=\"{connection_id}\"/>"))
            .await?;
        Ok(())
    }

    async fn provision(&self, connection_id: &str) -> Result<(), ProviderError> {
        self.call("provision", format!("<provision connectionId=\"{connection_id}\"/>"))
            .await?;
        Ok(())
    }

    async fn release(&self, connection_id: &str) -> Result<(), ProviderError> {
        self.call("release", format!("<release connectionId=\"{connection_id}\"/>"))
            .await?;
        Ok(())
    }

    async fn terminate(&self, connection_id: &str) -> Result<(), ProviderError> {
        self.call("terminate", format!("<terminate connectionId=\"{connection_id}\"/>"))
            .await?;
        Ok(())
    }

    async fn query(&self, connection_id: &str) -> Result<SegmentState, ProviderError> {
        let body = self
            .call("query", format!("<query connectionId=\"{connection_id}\"/>"))
            .await?;
        parse_segment_state(&body).ok_or_else(|| ProviderError::Backend {
            network_id: self.network_id.clone(),
            source: "unrecognized query response".into(),
        })
    }
}

fn parse_segment_state(body: &[u8]) -> Option<SegmentState> {
    match std::str::from_utf8(body).ok()?.trim() {
        "RESERVED" => Some(SegmentState::Reserved),
        "PROVISIONED" => Some(SegmentState::Provisioned),
        "RELEASED" => Some(SegmentState::Released),
        "TERMINATED" => Some(SegmentState::Terminated),
        _ => None,
    }
}
