//! ACME request configuration
//!
//! Assembles the parameters handed to the external ACME client and derives
//! the partition key from them. The canonical text lists fields in a fixed
//! order (server, email, terms-of-service digest, domains, key size) and
//! keeps domains in enumeration order, so reordering domains yields a new
//! partition and a fresh certificate request.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tlskeeper_common::AppName;
use tlskeeper_config::{keys, ConfigStore, LayeredConfig};
use tracing::{debug, warn};

use super::digest::ContentDigest;
use super::error::AcmeError;
use super::storage::{PartitionHandle, PartitionKey, PartitionStore};
use crate::apps::ApplicationRegistry;

/// Let's Encrypt production directory
pub const PRODUCTION_DIRECTORY_URL: &str = "https://acme-v02.api.letsencrypt.org/directory";

/// Let's Encrypt staging directory
pub const STAGING_DIRECTORY_URL: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// Terms-of-service digest used unless a setting overrides it
pub const DEFAULT_TOS_HASH: &str =
    "cc88d8d9517f490191401e7b54e9ffd12a2b9082ec7a1d4cec6101f9f1647e7b";

/// Key size requested for every certificate
pub const KEY_SIZE: u32 = 4096;

/// ACME server selection.
///
/// The aliases are fixed: `default` (or nothing) is production, `staging` is
/// staging, and anything else is taken as a directory URL verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum AcmeServer {
    Production,
    Staging,
    Custom(String),
}

impl AcmeServer {
    pub fn from_alias(alias: Option<&str>) -> Self {
        match alias {
            None | Some("default") => AcmeServer::Production,
            Some("staging") => AcmeServer::Staging,
            Some(url) => AcmeServer::Custom(url.to_string()),
        }
    }

    pub fn directory_url(&self) -> &str {
        match self {
            AcmeServer::Production => PRODUCTION_DIRECTORY_URL,
            AcmeServer::Staging => STAGING_DIRECTORY_URL,
            AcmeServer::Custom(url) => url,
        }
    }
}

impl From<AcmeServer> for String {
    fn from(server: AcmeServer) -> Self {
        server.directory_url().to_string()
    }
}

impl fmt::Display for AcmeServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directory_url())
    }
}

/// Parameters of one certificate request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestConfig {
    pub server: AcmeServer,
    pub email: String,
    pub tos_hash: String,
    /// Enumeration order; not normalized
    pub domains: Vec<String>,
    pub key_size: u32,
}

impl RequestConfig {
    /// Argument tokens for the ACME client, in canonical order
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--server".to_string(),
            self.server.directory_url().to_string(),
            "--email".to_string(),
            self.email.clone(),
            "--tos-sha256".to_string(),
            self.tos_hash.clone(),
        ];
        for domain in &self.domains {
            args.push("-d".to_string());
            args.push(domain.clone());
        }
        args.push("--cert-key-size".to_string());
        args.push(self.key_size.to_string());
        args
    }

    /// Text stored in the partition and hashed into its key
    pub fn canonical_text(&self) -> String {
        let mut text = self.args().join(" ");
        text.push('\n');
        text
    }

    /// Partition key of this configuration
    pub fn partition_key(&self, digest: &dyn ContentDigest) -> PartitionKey {
        PartitionKey::new(digest.digest(self.canonical_text().as_bytes()))
    }

    /// Every argument value must be one non-empty token.
    ///
    /// The canonical text is space-joined; a value containing whitespace
    /// would read the same as a split into the following fields.
    pub fn validate(&self) -> Result<(), AcmeError> {
        let fields = [
            (keys::SERVER, self.server.directory_url()),
            (keys::EMAIL, self.email.as_str()),
            (keys::TOS_HASH, self.tos_hash.as_str()),
        ];
        let domains = self.domains.iter().map(|d| (keys::DOMAINS, d.as_str()));

        match fields.into_iter().chain(domains).find(|(_, value)| !is_token(value)) {
            Some((key, value)) => Err(AcmeError::InvalidSetting {
                key: key.to_string(),
                value: value.to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(char::is_whitespace)
}

/// A resolved request: its configuration and the partition that holds its state
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRequest {
    pub config: RequestConfig,
    pub partition: PartitionHandle,
}

impl ResolvedRequest {
    pub fn key(&self) -> &PartitionKey {
        self.partition.key()
    }
}

/// Contact email for an application, or `MissingContactEmail`
pub fn contact_email(app: &AppName, config: &LayeredConfig) -> Result<String, AcmeError> {
    config
        .get(keys::EMAIL)
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AcmeError::MissingContactEmail { app: app.clone() })
}

/// Builds request configurations and selects their partitions
#[derive(Clone)]
pub struct RequestConfigResolver {
    config: Arc<dyn ConfigStore>,
    registry: Arc<dyn ApplicationRegistry>,
    partitions: Arc<dyn PartitionStore>,
    digest: Arc<dyn ContentDigest>,
}

impl RequestConfigResolver {
    pub fn new(
        config: Arc<dyn ConfigStore>,
        registry: Arc<dyn ApplicationRegistry>,
        partitions: Arc<dyn PartitionStore>,
        digest: Arc<dyn ContentDigest>,
    ) -> Self {
        Self {
            config,
            registry,
            partitions,
            digest,
        }
    }

    /// Check that a contact email is configured, without touching any partition
    pub fn check_email(&self, app: &AppName) -> Result<String, AcmeError> {
        let layered = self.config.layered(app)?;
        contact_email(app, &layered)
    }

    /// Assemble the request configuration without writing anything.
    ///
    /// Fails for applications the registry does not list, so a mistyped or
    /// path-like name never reaches the partition store.
    pub fn request_config(&self, app: &AppName) -> Result<RequestConfig, AcmeError> {
        if !self.registry.list_applications()?.contains(app) {
            return Err(AcmeError::UnknownApplication { app: app.clone() });
        }

        let layered = self.config.layered(app)?;
        let email = contact_email(app, &layered)?;

        let domains = self.registry.list_domains(app)?;
        if domains.is_empty() {
            warn!(app = %app, "No domains configured; the ACME client will decide");
        }

        let config = RequestConfig {
            server: AcmeServer::from_alias(layered.get(keys::SERVER)),
            email,
            tos_hash: layered
                .get(keys::TOS_HASH)
                .unwrap_or(DEFAULT_TOS_HASH)
                .to_string(),
            domains,
            key_size: KEY_SIZE,
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolve the request configuration and ensure its partition exists.
    ///
    /// Idempotent: an unchanged configuration maps to the same partition and
    /// rewrites identical content.
    pub fn resolve(&self, app: &AppName) -> Result<ResolvedRequest, AcmeError> {
        let config = self.request_config(app)?;
        let key = config.partition_key(self.digest.as_ref());
        let partition = self.partitions.ensure(app, &key, &config.canonical_text())?;

        debug!(
            app = %app,
            partition = %key,
            server = %config.server,
            domain_count = config.domains.len(),
            "Resolved ACME request configuration"
        );

        Ok(ResolvedRequest { config, partition })
    }

    /// Resolve and mark the partition as the active one
    pub fn resolve_and_activate(&self, app: &AppName) -> Result<ResolvedRequest, AcmeError> {
        let resolved = self.resolve(app)?;
        self.partitions.activate(app, resolved.key())?;
        Ok(resolved)
    }
}

impl fmt::Debug for RequestConfigResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfigResolver").finish_non_exhaustive()
    }
}
