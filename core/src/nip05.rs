// ABOUTME: NIP-05 discovery client resolving name@domain identifiers via /.well-known/nostr.json
// ABOUTME: Every transport, status, or decode failure is reported as a typed NotFound error

use crate::identity::{is_hex_pubkey, split_username, IdentityError};
use crate::traits::NameResolver;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const WELL_KNOWN_PATH: &str = "/.well-known/nostr.json";

/// Default per-lookup timeout so one slow domain cannot stall a refresh cycle.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of a `/.well-known/nostr.json` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    /// Short username to hex public key
    #[serde(default)]
    pub names: HashMap<String, String>,
    /// Short username to relay URLs
    #[serde(default)]
    pub relays: HashMap<String, Vec<String>>,
}

/// HTTP client for NIP-05 lookups.
#[derive(Debug, Clone)]
pub struct Nip05Client {
    http: reqwest::Client,
    scheme: String,
}

impl Nip05Client {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nostr-file/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            scheme: "https".to_string(),
        })
    }

    /// Override the URL scheme. Only useful against plain-HTTP test servers.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    fn discovery_url(&self, domain: &str) -> String {
        format!("{}://{}{}", self.scheme, domain, WELL_KNOWN_PATH)
    }

    /// Fetch the discovery document for a domain, optionally narrowed with `?name=`.
    pub async fn fetch(
        &self,
        domain: &str,
        name: Option<&str>,
    ) -> Result<DiscoveryResponse, IdentityError> {
        let mut request = self.http.get(self.discovery_url(domain));
        if let Some(name) = name {
            request = request.query(&[("name", name)]);
        }

        let response = request.send().await.map_err(|e| {
            IdentityError::NotFound(format!("NIP-05 request to {} failed: {}", domain, e))
        })?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(IdentityError::NotFound(format!(
                "NIP-05 request to {} returned {}",
                domain,
                response.status()
            )));
        }

        response.json::<DiscoveryResponse>().await.map_err(|e| {
            IdentityError::NotFound(format!("NIP-05 document from {} is malformed: {}", domain, e))
        })
    }

    async fn fetch_for_user(
        &self,
        username: &str,
    ) -> Result<(String, DiscoveryResponse), IdentityError> {
        let (local, domain) = split_username(username).ok_or_else(|| {
            IdentityError::InvalidEncoding(format!("'{}' is not a name@domain identifier", username))
        })?;
        let document = self.fetch(domain, Some(local)).await?;
        Ok((local.to_string(), document))
    }

    /// Look up the hex public key registered for `local@domain`.
    pub async fn lookup_pubkey(&self, username: &str) -> Result<String, IdentityError> {
        let (local, document) = self.fetch_for_user(username).await?;

        let pubkey = document
            .names
            .get(&local)
            .ok_or_else(|| IdentityError::NotFound(format!("{} not listed in NIP-05 names", username)))?;

        if !is_hex_pubkey(pubkey) {
            return Err(IdentityError::InvalidEncoding(format!(
                "NIP-05 entry for {} is not a hex public key: '{}'",
                username, pubkey
            )));
        }

        Ok(pubkey.to_ascii_lowercase())
    }

    /// Look up the relay list advertised for `local@domain`.
    pub async fn lookup_relays(&self, username: &str) -> Result<Vec<String>, IdentityError> {
        let (local, mut document) = self.fetch_for_user(username).await?;

        if !document.names.contains_key(&local) {
            return Err(IdentityError::NotFound(format!(
                "{} not listed in NIP-05 names",
                username
            )));
        }

        document
            .relays
            .remove(&local)
            .ok_or_else(|| IdentityError::NotFound(format!("{} has no NIP-05 relays", username)))
    }
}

#[async_trait]
impl NameResolver for Nip05Client {
    async fn resolve(&self, username: &str) -> Result<String, IdentityError> {
        self.lookup_pubkey(username).await
    }
}
