//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Startup configuration: loaded from TOML with `serde`, exactly the
//! keyed fields named in `spec.md` §6.

use serde::Deserialize;

use crate::error::ConfigurationError;

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub key: Option<String>,
    pub certificate: Option<String>,
    pub certificate_dir: Option<String>,
    pub verify_cert: bool,
    pub network_name: String,
    pub nrm_map_file: Option<String>,
    pub peers: Vec<PeerConfig>,
    pub policy: PolicyConfig,
    pub rest: RestConfig,
    pub plugin: PluginConfig,
    pub database: String,
    pub service_id_start: u64,
}

/// One statically-configured peer NSA, reachable by the fetcher.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PeerConfig {
    pub urn: String,
    pub endpoint: String,
    pub service_type: String,
}

/// Policy gate applied ahead of `Aggregator::reserve` (REDESIGN FLAGS:
/// left as a named extension point, not implemented beyond the
/// "permit-all" default since the spec doesn't define a policy
/// language).
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PolicyConfig {
    pub mode: String,
}

impl Default for PolicyConfig {
    fn default() -> PolicyConfig {
        PolicyConfig {
            mode: "permit-all".to_owned(),
        }
    }
}

/// The optional client REST surface (spec §6: "(optional)").
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct RestConfig {
    pub enabled: bool,
    pub address: String,
}

impl Default for RestConfig {
    fn default() -> RestConfig {
        RestConfig {
            enabled: false,
            address: "127.0.0.1:8080".to_owned(),
        }
    }
}

/// Selects which locally-configured backend the NRM-mapped networks
/// are provisioned against (spec REDESIGN FLAGS "Runtime dispatch on
/// backend type"). The actual driver is a named interface, out of
/// scope here.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PluginConfig {
    pub name: String,
}

impl Default for PluginConfig {
    fn default() -> PluginConfig {
        PluginConfig {
            name: "noop".to_owned(),
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            host: "0.0.0.0".to_owned(),
            port: 9080,
            tls: false,
            key: None,
            certificate: None,
            certificate_dir: None,
            verify_cert: true,
            network_name: "urn:ogf:network:example.org:2021".to_owned(),
            nrm_map_file: None,
            peers: Vec::new(),
            policy: PolicyConfig::default(),
            rest: RestConfig::default(),
            plugin: PluginConfig::default(),
            database: "/var/lib/nsid/nsid.db".to_owned(),
            service_id_start: 1,
        }
    }
}

impl Config {
    const DFLT_FILEPATH: &'static str = "/etc/nsid/nsid.toml";

    pub fn load(config_file: Option<&str>) -> Config {
        let config_file = config_file.unwrap_or(Config::DFLT_FILEPATH);
        match std::fs::read_to_string(config_file) {
            Ok(config_str) => {
                toml::from_str(&config_str).expect("Failed to parse configuration file")
            }
            Err(err) => {
                eprintln!("Failed to load configuration file: {err}");
                eprintln!("Falling back to default configuration...");
                Config::default()
            }
        }
    }

    /// Enforces the one fatal startup rule the spec names explicitly:
    /// `tls = true` requires all three of `key`/`certificate`/
    /// `certificate-dir`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.tls {
            return Ok(());
        }
        if self.key.is_none() {
            return Err(ConfigurationError::IncompleteTls { missing: "key" });
        }
        if self.certificate.is_none() {
            return Err(ConfigurationError::IncompleteTls {
                missing: "certificate",
            });
        }
        if self.certificate_dir.is_none() {
            return Err(ConfigurationError::IncompleteTls {
                missing: "certificate-dir",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn tls_without_key_is_fatal() {
        let mut config = Config::default();
        config.tls = true;
        config.certificate = Some("/etc/nsid/cert.pem".to_owned());
        config.certificate_dir = Some("/etc/nsid/certs".to_owned());
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::IncompleteTls { missing: "key" }
        ));
    }

    #[test]
    fn tls_with_all_three_is_valid() {
        let mut config = Config::default();
        config.tls = true;
        config.key = Some("/etc/nsid/key.pem".to_owned());
        config.certificate = Some("/etc/nsid/cert.pem".to_owned());
        config.certificate_dir = Some("/etc/nsid/certs".to_owned());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_from_toml() {
        let toml_str = r#"
            host = "10.0.0.1"
            port = 9443
            network-name = "urn:ogf:network:aruba.example:2021"
            database = "/var/lib/nsid/aruba.db"

            [[peers]]
            urn = "urn:ogf:network:bonaire.example:2021:nsa"
            endpoint = "https://bonaire.example/nsi/services/CS"
            service-type = "application/vnd.ogf.nsi.cs.v2+soap"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.peers.len(), 1);
        assert_eq!(config.peers[0].urn, "urn:ogf:network:bonaire.example:2021:nsa");
    }
}
