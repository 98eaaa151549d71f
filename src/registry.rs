//! Shared provider client instances.
//!
//! A client owns its rate window, so every request made with the same
//! credential must go through the same instance. The registry keys clients
//! by source name and a SHA-256 fingerprint of the credential; the raw
//! secret is never held as a key. It is created once at startup and handed
//! to whoever builds dispatchers, not stored in a global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::credentials::Credentials;
use crate::sources::{self, SourceClient, SourceId};

type ClientKey = (String, String);

#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientKey, Arc<dyn SourceClient>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the client registered for `(source, credential)`, building it
    /// with `build` on first use.
    pub fn get_or_insert_with<F>(
        &self,
        source: &str,
        credential: &[&str],
        build: F,
    ) -> Result<Arc<dyn SourceClient>>
    where
        F: FnOnce() -> Result<Arc<dyn SourceClient>>,
    {
        let key = (source.to_string(), fingerprint(credential));
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = clients.get(&key) {
            return Ok(existing.clone());
        }
        let client = build()?;
        clients.insert(key, client.clone());
        tracing::debug!(source, "registered provider client");
        Ok(client)
    }

    /// Clients for every source that has credentials and is enabled.
    pub fn configured_clients(
        &self,
        credentials: &Credentials,
        config: &Config,
    ) -> Result<Vec<Arc<dyn SourceClient>>> {
        let mut out = Vec::new();
        for id in SourceId::ALL {
            if !config.source_enabled(id) {
                continue;
            }
            let Some(parts) = credentials.for_source(id) else {
                continue;
            };
            let client = self.get_or_insert_with(id.as_str(), &parts, || {
                sources::build_client(id, credentials, config)?
                    .ok_or_else(|| anyhow::anyhow!("missing credentials for {}", id))
            })?;
            out.push(client);
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn fingerprint(credential: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in credential {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(shodan: &str) -> Credentials {
        Credentials {
            shodan: Some(shodan.into()),
            greynoise: Some("g".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_same_credential_shares_instance() {
        let registry = ClientRegistry::new();
        let config = Config::default();
        let a = registry.configured_clients(&creds("k1"), &config).unwrap();
        let b = registry.configured_clients(&creds("k1"), &config).unwrap();
        assert_eq!(a.len(), 2);
        assert!(Arc::ptr_eq(&a[0], &b[0]));
        assert!(Arc::ptr_eq(&a[1], &b[1]));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_different_credential_gets_new_instance() {
        let registry = ClientRegistry::new();
        let config = Config::default();
        let a = registry.configured_clients(&creds("k1"), &config).unwrap();
        let b = registry.configured_clients(&creds("k2"), &config).unwrap();
        assert!(!Arc::ptr_eq(&a[0], &b[0]));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_disabled_source_skipped() {
        let registry = ClientRegistry::new();
        let config: Config = toml::from_str("[sources.shodan]\nenabled = false\n").unwrap();
        let clients = registry.configured_clients(&creds("k1"), &config).unwrap();
        let names: Vec<&str> = clients.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["greynoise"]);
    }

    #[test]
    fn test_fingerprint_separates_parts() {
        assert_ne!(fingerprint(&["ab", "c"]), fingerprint(&["a", "bc"]));
        assert!(!fingerprint(&["secret"]).contains("secret"));
    }
}
