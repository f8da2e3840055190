//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Dynamic provider bookkeeping, ported line-for-line in spirit from
//! `provreg.py`'s `ProviderRegistry`: a URN-to-handle map and a
//! URN-to-network-id-set map, with idempotent spawning.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use nsid_utils::{NsiAgent, Urn};
use tracing::{debug, info};

use crate::{Provider, ProviderError};

type Factory = Box<dyn Fn(&NsiAgent) -> Arc<dyn Provider> + Send + Sync>;

/// Tracks known providers and which networks each one serves.
/// `spawn_provider` is the hot path: called on every fetch cycle for
/// every peer NSA, it must be a no-op when nothing has changed.
pub struct ProviderRegistry {
    providers: HashMap<Urn, Arc<dyn Provider>>,
    provider_networks: HashMap<Urn, BTreeSet<String>>,
    factories: HashMap<String, Factory>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        ProviderRegistry::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> ProviderRegistry {
        ProviderRegistry {
            providers: HashMap::new(),
            provider_networks: HashMap::new(),
            factories: HashMap::new(),
        }
    }

    /// Registers a factory for a service type (e.g.
    /// `application/vnd.ogf.nsi.cs.v2+soap`). Only needed for service
    /// types reachable via `spawn_provider`; locally-configured
    /// providers are wired in directly with [`ProviderRegistry::add_provider`].
    pub fn register_factory<F>(&mut self, service_type: impl Into<String>, factory: F)
    where
        F: Fn(&NsiAgent) -> Arc<dyn Provider> + Send + Sync + 'static,
    {
        self.factories.insert(service_type.into(), Box::new(factory));
    }

    pub fn get_provider(&self, urn: &Urn) -> Result<Arc<dyn Provider>, ProviderError> {
        self.providers
            .get(urn)
            .cloned()
            .ok_or_else(|| ProviderError::StpResolution {
                what: format!("urn '{urn}'"),
            })
    }

    /// The set of network ids currently registered for `urn`, if any.
    pub fn network_ids_for(&self, urn: &Urn) -> Option<&BTreeSet<String>> {
        self.provider_networks.get(urn)
    }

    pub fn get_provider_by_network(&self, network_id: &str) -> Result<Urn, ProviderError> {
        self.provider_networks
            .iter()
            .find(|(_, networks)| networks.contains(network_id))
            .map(|(urn, _)| urn.clone())
            .ok_or_else(|| ProviderError::StpResolution {
                what: format!("network '{network_id}'"),
            })
    }

    /// Directly wires in a provider, bypassing the factory lookup.
    /// Used at startup for locally-configured networks.
    pub fn add_provider(
        &mut self,
        urn: Urn,
        provider: Arc<dyn Provider>,
        network_ids: BTreeSet<String>,
    ) {
        if !self.providers.contains_key(&urn) {
            info!(urn = %urn, "creating new provider");
        }
        self.providers.insert(urn.clone(), provider);
        self.provider_networks.insert(urn, network_ids);
    }

    /// Removes a provider and its network-id set, e.g. when a peer
    /// drops out of the discovery document.
    pub fn remove(&mut self, urn: &Urn) {
        self.providers.remove(urn);
        self.provider_networks.remove(urn);
    }

    /// Spawns a provider for `agent` if one doesn't already exist with
    /// the same URN and network-id set; otherwise returns the existing
    /// handle unchanged. This no-op path is what makes it safe to call
    /// on every discovery cycle for every peer.
    pub fn spawn_provider(
        &mut self,
        agent: &NsiAgent,
        network_ids: BTreeSet<String>,
    ) -> Result<Arc<dyn Provider>, ProviderError> {
        if let (Some(existing), Some(existing_networks)) = (
            self.providers.get(&agent.urn),
            self.provider_networks.get(&agent.urn),
        ) {
            if *existing_networks == network_ids {
                debug!(urn = %agent.urn, "skipping provider spawn, no change");
                return Ok(existing.clone());
            }
        }

        let factory = self.factories.get(&agent.service_type).ok_or_else(|| {
            ProviderError::NoFactory {
                service_type: agent.service_type.clone(),
            }
        })?;
        let provider = factory(agent);
        self.add_provider(agent.urn.clone(), provider.clone(), network_ids);
        info!(urn = %agent.urn, "spawned new provider");
        Ok(provider)
    }
}
