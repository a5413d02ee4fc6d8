//! Credential and service-origin discovery.
//!
//! The environment scan (embedded script text introspection) is an injected
//! capability: the core depends only on the [`CredentialSource`] contract,
//! never on how a particular host performs the scan.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::{API_KEY_RE, SERVICE_ORIGIN_RE};
use crate::error::{Error, Result};

/// Trait for credential discovery backends.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Discover candidate API keys, excluding any in `excluding`.
    ///
    /// Returns deduplicated keys in reverse discovery order: the most
    /// recently defined key is empirically the most likely to be valid, so
    /// it is tried first.
    async fn discover_credentials(&self, excluding: &HashSet<String>) -> Result<Vec<String>>;

    /// Discover the remote service origin.
    ///
    /// Fails with [`Error::OriginNotFound`] when no origin is present; the
    /// caller must treat that as fatal since no request is possible without
    /// it.
    async fn discover_service_origin(&self) -> Result<String>;

    /// Name of this discovery backend.
    fn name(&self) -> &str {
        "unknown"
    }
}

/// Blanket impl for `Arc<T>`.
#[async_trait]
impl<T: CredentialSource + ?Sized> CredentialSource for Arc<T> {
    async fn discover_credentials(&self, excluding: &HashSet<String>) -> Result<Vec<String>> {
        (**self).discover_credentials(excluding).await
    }
    async fn discover_service_origin(&self) -> Result<String> {
        (**self).discover_service_origin().await
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

type ScriptTextFn = dyn Fn() -> Option<Vec<String>> + Send + Sync;

/// Discovery backed by a scan over embedded script text.
///
/// The provider closure returns the currently loaded script bodies, or
/// `None` when the host exposes no way to read them (surfaced as
/// [`Error::MissingCapability`]).
pub struct ScriptScanSource {
    scripts: Arc<ScriptTextFn>,
}

impl ScriptScanSource {
    /// Create from a script text provider.
    pub fn new<F>(scripts: F) -> Self
    where
        F: Fn() -> Option<Vec<String>> + Send + Sync + 'static,
    {
        Self {
            scripts: Arc::new(scripts),
        }
    }

    /// Create from a fixed set of script bodies (testing).
    pub fn from_scripts(scripts: Vec<String>) -> Self {
        Self::new(move || Some(scripts.clone()))
    }

    fn script_bodies(&self) -> Result<Vec<String>> {
        (self.scripts)().ok_or_else(|| Error::missing_capability("script text introspection"))
    }
}

#[async_trait]
impl CredentialSource for ScriptScanSource {
    async fn discover_credentials(&self, excluding: &HashSet<String>) -> Result<Vec<String>> {
        let scripts = self.script_bodies()?;

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for body in &scripts {
            for m in API_KEY_RE.find_iter(body) {
                let key = m.as_str().to_string();
                if excluding.contains(&key) || !seen.insert(key.clone()) {
                    continue;
                }
                keys.push(key);
            }
        }
        keys.reverse();

        debug!(count = keys.len(), "Discovered API keys from script scan");
        Ok(keys)
    }

    async fn discover_service_origin(&self) -> Result<String> {
        let scripts = self.script_bodies()?;
        for body in &scripts {
            if let Some(m) = SERVICE_ORIGIN_RE.find(body) {
                debug!(origin = m.as_str(), "Discovered service origin");
                return Ok(m.as_str().to_string());
            }
        }
        Err(Error::OriginNotFound)
    }

    fn name(&self) -> &str {
        "script-scan"
    }
}

/// Fixed-answer discovery source, primarily for testing.
///
/// The key list can be swapped at runtime to simulate key rotation between
/// pool refreshes.
pub struct StaticCredentialSource {
    keys: RwLock<Vec<String>>,
    origin: Option<String>,
}

impl StaticCredentialSource {
    /// Create with the given keys and origin.
    pub fn new(keys: Vec<String>, origin: Option<String>) -> Self {
        Self {
            keys: RwLock::new(keys),
            origin,
        }
    }

    /// Replace the keys subsequent discoveries will return.
    pub async fn set_keys(&self, keys: Vec<String>) {
        *self.keys.write().await = keys;
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn discover_credentials(&self, excluding: &HashSet<String>) -> Result<Vec<String>> {
        let keys = self.keys.read().await;
        let mut seen = HashSet::new();
        Ok(keys
            .iter()
            .filter(|k| !excluding.contains(*k) && seen.insert((*k).clone()))
            .cloned()
            .collect())
    }

    async fn discover_service_origin(&self) -> Result<String> {
        self.origin.clone().ok_or(Error::OriginNotFound)
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(suffix: char) -> String {
        format!("AIzaSy{}", String::from(suffix).repeat(33))
    }

    #[tokio::test]
    async fn test_scan_reverse_order_and_dedup() {
        let source = ScriptScanSource::from_scripts(vec![
            format!("var a = \"{}\"; var b = \"{}\";", key('A'), key('B')),
            format!("var c = \"{}\"; var a2 = \"{}\";", key('C'), key('A')),
        ]);

        let keys = source.discover_credentials(&HashSet::new()).await.unwrap();
        // Discovery order A, B, C (A deduped at first sight), reversed.
        assert_eq!(keys, vec![key('C'), key('B'), key('A')]);
    }

    #[tokio::test]
    async fn test_scan_excludes_keys() {
        let source = ScriptScanSource::from_scripts(vec![format!(
            "\"{}\" \"{}\"",
            key('A'),
            key('B')
        )]);

        let mut excluding = HashSet::new();
        excluding.insert(key('A'));
        let keys = source.discover_credentials(&excluding).await.unwrap();
        assert_eq!(keys, vec![key('B')]);
    }

    #[tokio::test]
    async fn test_scan_origin_first_match() {
        let source = ScriptScanSource::from_scripts(vec![
            "no origin here".to_string(),
            "fetch(\"https://alkalimakersuite-pa.clients6.google.com/x\")".to_string(),
            "https://othermakersuite-pa.clients6.google.com".to_string(),
        ]);
        assert_eq!(
            source.discover_service_origin().await.unwrap(),
            "https://alkalimakersuite-pa.clients6.google.com"
        );
    }

    #[tokio::test]
    async fn test_scan_origin_not_found() {
        let source = ScriptScanSource::from_scripts(vec!["nothing".to_string()]);
        assert!(matches!(
            source.discover_service_origin().await,
            Err(Error::OriginNotFound)
        ));
    }

    #[tokio::test]
    async fn test_missing_capability() {
        let source = ScriptScanSource::new(|| None);
        assert!(matches!(
            source.discover_credentials(&HashSet::new()).await,
            Err(Error::MissingCapability(_))
        ));
        assert!(matches!(
            source.discover_service_origin().await,
            Err(Error::MissingCapability(_))
        ));
    }

    #[tokio::test]
    async fn test_static_source_rotation() {
        let source = StaticCredentialSource::new(vec![key('A')], Some("https://o".into()));
        assert_eq!(
            source.discover_credentials(&HashSet::new()).await.unwrap(),
            vec![key('A')]
        );

        source.set_keys(vec![key('B')]).await;
        assert_eq!(
            source.discover_credentials(&HashSet::new()).await.unwrap(),
            vec![key('B')]
        );
    }
}
