//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! The optional client REST surface (spec §6): modeled as a trait with
//! the five named routes as methods, plus an in-process implementation
//! used by tests. Wiring this to a real HTTP server framework is a
//! named extension point, not implemented here (see `DESIGN.md`).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use nsid_aggregator::{Aggregator, AggregatorError, Connection, ConnectionStore};
use nsid_utils::Stp;

/// `POST /connections/{id}/{action}` named an action this instance
/// doesn't recognize.
#[derive(Debug)]
pub enum RestActionError {
    UnknownAction { action: String },
    Aggregator(AggregatorError),
}

impl fmt::Display for RestActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestActionError::UnknownAction { action } => {
                write!(f, "unknown connection action '{action}'")
            }
            RestActionError::Aggregator(inner) => write!(f, "{inner}"),
        }
    }
}

impl std::error::Error for RestActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RestActionError::Aggregator(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<AggregatorError> for RestActionError {
    fn from(value: AggregatorError) -> Self {
        RestActionError::Aggregator(value)
    }
}

/// The five routes named in spec §6, modeled as trait methods rather
/// than wired to a concrete HTTP server.
#[async_trait]
pub trait RestApi: Send + Sync {
    /// `POST /connections`
    async fn create_connection(
        &self,
        requester_nsa: String,
        src: Stp,
        dst: Stp,
        bandwidth_mbps: u64,
    ) -> Result<Connection, AggregatorError>;

    /// `GET /connections`
    async fn list_connections(&self) -> Vec<Connection>;

    /// `GET /connections/{id}`
    async fn get_connection(&self, connection_id: &str) -> Result<Connection, AggregatorError>;

    /// `POST /connections/{id}/{action}` for `commit|provision|release|terminate`.
    async fn perform_action(
        &self,
        connection_id: &str,
        action: &str,
    ) -> Result<(), RestActionError>;
}

/// An in-process `RestApi`, used by tests in place of a real HTTP
/// listener. Connection ids are assigned from a counter seeded by
/// `service-id-start` (spec §6).
pub struct InProcessRestApi {
    aggregator: Arc<Aggregator>,
    store: Arc<dyn ConnectionStore>,
    next_id: AtomicU64,
}

impl InProcessRestApi {
    pub fn new(
        aggregator: Arc<Aggregator>,
        store: Arc<dyn ConnectionStore>,
        service_id_start: u64,
    ) -> InProcessRestApi {
        InProcessRestApi {
            aggregator,
            store,
            next_id: AtomicU64::new(service_id_start),
        }
    }
}

#[async_trait]
impl RestApi for InProcessRestApi {
    async fn create_connection(
        &self,
        requester_nsa: String,
        src: Stp,
        dst: Stp,
        bandwidth_mbps: u64,
    ) -> Result<Connection, AggregatorError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let connection_id = format!("nsid-{id}");
        self.aggregator
            .reserve(connection_id, requester_nsa, src, dst, bandwidth_mbps)
            .await
    }

    async fn list_connections(&self) -> Vec<Connection> {
        self.store.all()
    }

    async fn get_connection(&self, connection_id: &str) -> Result<Connection, AggregatorError> {
        self.aggregator.query(connection_id).await
    }

    async fn perform_action(
        &self,
        connection_id: &str,
        action: &str,
    ) -> Result<(), RestActionError> {
        match action {
            "commit" => self.aggregator.commit(connection_id).await?,
            "provision" => self.aggregator.provision(connection_id).await?,
            "release" => self.aggregator.release(connection_id).await?,
            "terminate" => self.aggregator.terminate(connection_id).await?,
            other => {
                return Err(RestActionError::UnknownAction {
                    action: other.to_owned(),
                })
            }
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use nsid_provider::{Provider, ProviderError, ProviderRegistry, ReserveRequest, SegmentState};
    use nsid_topology::{Network, Port, Topology};
    use nsid_utils::{Label, NsiAgent, NsiAgentRole};

    use super::*;

    struct NoopProvider;

    #[async_trait]
    impl Provider for NoopProvider {
        async fn reserve(&self, _: &ReserveRequest) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn reserve_commit(&self, _: &str) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn reserve_abort(&self, _: &str) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn provision(&self, _: &str) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn release(&self, _: &str) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn terminate(&self, _: &str) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn query(&self, _: &str) -> Result<SegmentState, ProviderError> {
            Ok(SegmentState::Reserved)
        }
    }

    fn single_network_topology() -> Topology {
        let mut topo = Topology::new();
        let mut aruba = Network::new("aruba");
        aruba.add_port(Port::new("aruba-a", None));
        aruba.add_port(Port::new("aruba-b", None));
        topo.add_network(
            aruba,
            NsiAgent::new("urn:aruba:nsa", "https://aruba.example/nsa", "test", NsiAgentRole::Local),
        );
        topo
    }

    fn rest_api() -> InProcessRestApi {
        let mut registry = ProviderRegistry::new();
        registry.register_factory("test", |_| Arc::new(NoopProvider));
        registry.add_provider(
            "urn:aruba:nsa".to_owned(),
            Arc::new(NoopProvider),
            std::collections::BTreeSet::from(["aruba".to_owned()]),
        );
        let store = Arc::new(nsid_aggregator::InMemoryConnectionStore::new());
        let aggregator = Aggregator::new(
            single_network_topology(),
            registry,
            store.clone(),
            Duration::from_secs(120),
        );
        InProcessRestApi::new(aggregator, store, 1000)
    }

    #[tokio::test]
    async fn create_list_query_and_terminate_round_trip() {
        let api = rest_api();
        let label = Label::new("ethernet-vlan", "1781-1789").unwrap();
        let connection = api
            .create_connection(
                "urn:requester:nsa".to_owned(),
                Stp::new("aruba", "aruba-a", label.clone()),
                Stp::new("aruba", "aruba-b", label),
                100,
            )
            .await
            .unwrap();
        assert_eq!(connection.connection_id, "nsid-1000");

        assert_eq!(api.list_connections().await.len(), 1);
        assert!(api.get_connection(&connection.connection_id).await.is_ok());

        api.perform_action(&connection.connection_id, "commit")
            .await
            .unwrap();
        api.perform_action(&connection.connection_id, "terminate")
            .await
            .unwrap();

        let err = api
            .perform_action(&connection.connection_id, "frobnicate")
            .await
            .unwrap_err();
        assert!(matches!(err, RestActionError::UnknownAction { .. }));
    }
}
