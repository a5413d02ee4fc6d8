//! Session secret lookup.
//!
//! Secrets are session-bound credentials (the SID cookie family) used to
//! derive authorization hashes. They are never persisted by this crate and
//! never transmitted directly; the only capability the core needs is
//! `get(name) -> Option<String>`.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Trait for session secret backends.
///
/// Absence is an expected outcome (a slot simply not being set in the host
/// session), so lookups return `Option` rather than `Result`.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up the secret stored under `name`, if any.
    async fn get(&self, name: &str) -> Option<String>;

    /// Name of this secret backend.
    fn name(&self) -> &str {
        "unknown"
    }
}

/// Blanket impl for `Arc<T>`.
#[async_trait]
impl<T: SecretStore + ?Sized> SecretStore for std::sync::Arc<T> {
    async fn get(&self, name: &str) -> Option<String> {
        (**self).get(name).await
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A single stored secret with its optional cookie-style attributes.
#[derive(Debug, Clone)]
pub struct SecretEntry {
    /// Slot name (e.g. `SAPISID`).
    pub name: String,
    /// Secret value.
    pub value: String,
    /// Cookie domain attribute, if known.
    pub domain: Option<String>,
    /// Cookie path attribute, if known.
    pub path: Option<String>,
    /// Unix timestamp after which the entry is no longer valid.
    pub expires_at: Option<i64>,
}

impl SecretEntry {
    /// Create an entry with just a name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires_at: None,
        }
    }

    /// Set an expiry timestamp.
    #[must_use]
    pub fn expires_at(mut self, at: i64) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Whether the entry has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => at <= chrono::Utc::now().timestamp(),
            None => false,
        }
    }
}

/// In-memory secret store holding cookie-style entries.
pub struct MemorySecretStore {
    entries: RwLock<HashMap<String, SecretEntry>>,
}

impl MemorySecretStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a name/value pair with no attributes.
    pub async fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.insert_entry(SecretEntry::new(name, value)).await;
    }

    /// Insert a full entry, replacing any previous entry for the same name.
    pub async fn insert_entry(&self, entry: SecretEntry) {
        self.entries
            .write()
            .await
            .insert(entry.name.clone(), entry);
    }

    /// Remove the entry stored under `name`.
    pub async fn remove(&self, name: &str) {
        self.entries.write().await.remove(name);
    }
}

impl Default for MemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, name: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(name)
            .filter(|e| !e.is_expired())
            .map(|e| e.value.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Secret store backed by process environment variables.
///
/// Maps the "ambient process-global variable" slots onto the environment:
/// `get("SAPISID")` reads the `SAPISID` variable.
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    fn name(&self) -> &str {
        "env"
    }
}
