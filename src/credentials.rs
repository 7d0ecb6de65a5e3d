// Secret storage boundary: one secret per (plugin, purpose, server).

use std::collections::HashMap;
use std::sync::RwLock;

/// `<plugin-id>-<purpose>-<server-id>`
pub fn credential_key(plugin_id: &str, purpose: &str, server_id: &str) -> String {
    format!("{plugin_id}-{purpose}-{server_id}")
}

/// Opaque key-value secret store. The alert engine only reads from it.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// Process-local store; secrets are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut secrets = self
            .secrets
            .write()
            .map_err(|e| anyhow::anyhow!("credential store lock poisoned: {}", e))?;
        secrets.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
