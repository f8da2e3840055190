//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! The discovery document (spec §6): hand-built XML, regenerated on a
//! `link_vector` listener callback rather than produced through a full
//! XML serializer, which is named out of scope.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nsid_aggregator::{DiscoveryClient, FetchError, PeerDiscovery};
use nsid_utils::NsiAgent;

use crate::transport::{PeerTransport, DEFAULT_CALL_TIMEOUT};

/// One interface this instance exposes: service type, endpoint URL,
/// and authentication method.
#[derive(Clone, Debug)]
pub struct Interface {
    pub service_type: String,
    pub endpoint: String,
    pub auth_method: String,
}

/// Everything the discovery document reports about this instance.
#[derive(Clone, Debug)]
pub struct DiscoveryDocument {
    pub nsa_urn: String,
    pub owner_name: String,
    pub software_version: String,
    pub startup_time: DateTime<Utc>,
    pub networks: Vec<String>,
    pub interfaces: Vec<Interface>,
    pub features: Vec<String>,
}

impl DiscoveryDocument {
    /// Renders the document as of `now`. `now` is a parameter rather
    /// than read internally so tests can pin it.
    pub fn render(&self, now: DateTime<Utc>) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<nsa xmlns=\"http://schemas.ogf.org/nsi/2014/02/discovery/types\" ");
        xml.push_str(&format!("id=\"{}\" version=\"{}\">\n", escape(&self.nsa_urn), now.to_rfc3339()));
        xml.push_str(&format!("  <name>{}</name>\n", escape(&self.owner_name)));
        xml.push_str(&format!("  <softwareVersion>{}</softwareVersion>\n", escape(&self.software_version)));
        xml.push_str(&format!("  <startTime>{}</startTime>\n", self.startup_time.to_rfc3339()));
        xml.push_str("  <networkId>\n");
        for network in &self.networks {
            xml.push_str(&format!("    <id>{}</id>\n", escape(network)));
        }
        xml.push_str("  </networkId>\n");
        xml.push_str("  <interface>\n");
        for interface in &self.interfaces {
            xml.push_str(&format!(
                "    <entry type=\"{}\" href=\"{}\" authMethod=\"{}\"/>\n",
                escape(&interface.service_type),
                escape(&interface.endpoint),
                escape(&interface.auth_method),
            ));
        }
        xml.push_str("  </interface>\n");
        xml.push_str("  <feature>\n");
        for feature in &self.features {
            xml.push_str(&format!("    <type>{}</type>\n", escape(feature)));
        }
        xml.push_str("  </feature>\n");
        xml.push_str("</nsa>\n");
        xml
    }
}

/// Escapes the five XML predefined entities. Good enough for the
/// handful of identifier-shaped strings this document ever embeds;
/// a real XML writer is out of scope.
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// The production [`DiscoveryClient`] (spec §4.7): polls a peer's
/// discovery document over [`PeerTransport`] and recovers the served
/// network ids from it with a crude substring scan rather than a real
/// XML parser. Port-level reachability (the `AdvertisedPort` costs a
/// full NML/topology exchange would carry) isn't present in the
/// discovery document this crate renders, so every recovered network
/// comes back with no ports — wiring a real topology document fetch is
/// a named extension point, not implemented here.
pub struct HttpDiscoveryClient {
    transport: Arc<dyn PeerTransport>,
}

impl HttpDiscoveryClient {
    pub fn new(transport: Arc<dyn PeerTransport>) -> HttpDiscoveryClient {
        HttpDiscoveryClient { transport }
    }
}

#[async_trait]
impl DiscoveryClient for HttpDiscoveryClient {
    async fn fetch(&self, peer: &NsiAgent) -> Result<PeerDiscovery, FetchError> {
        let body = self
            .transport
            .call(&peer.endpoint, "discovery", "", DEFAULT_CALL_TIMEOUT)
            .await
            .map_err(|source| FetchError {
                peer: peer.urn.clone(),
                source: Box::new(source),
            })?;
        let text = String::from_utf8_lossy(&body);
        let networks = extract_network_ids(&text)
            .into_iter()
            .map(|id| (id, Vec::new()))
            .collect();
        Ok(PeerDiscovery {
            agent: peer.clone(),
            networks,
        })
    }
}

/// Pulls every `<id>...</id>` entry out of a document's `<networkId>`
/// block. Not a real XML parser: it has no notion of nesting or
/// namespaces, and is only ever pointed at documents this same crate
/// renders.
fn extract_network_ids(xml: &str) -> Vec<String> {
    let Some(start) = xml.find("<networkId>") else {
        return Vec::new();
    };
    let Some(end) = xml[start..].find("</networkId>") else {
        return Vec::new();
    };
    let block = &xml[start..start + end];

    let mut ids = Vec::new();
    let mut rest = block;
    while let Some(open) = rest.find("<id>") {
        let after_open = &rest[open + "<id>".len()..];
        let Some(close) = after_open.find("</id>") else {
            break;
        };
        ids.push(after_open[..close].to_owned());
        rest = &after_open[close + "</id>".len()..];
    }
    ids
}
