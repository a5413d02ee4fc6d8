//! API key pool management.
//!
//! Owns the credential cache and the last-known-good marker. Keys rotate on
//! the service side, so when the previously trusted key fails the pool is
//! rebuilt from a fresh discovery scan excluding it.

use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::discovery::CredentialSource;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct PoolState {
    /// Discovered keys, reverse discovery order. `None` until first use.
    pool: Option<Vec<String>>,
    /// Key that served the most recent successful transmission.
    last_successful: Option<String>,
}

/// Manages the credential pool for a discovery source.
///
/// Thread-safe: `mark_success` and `refresh` are read-modify-write, so all
/// state sits behind one `RwLock`.
pub struct KeyPool<C: CredentialSource> {
    source: C,
    state: RwLock<PoolState>,
}

impl<C: CredentialSource> KeyPool<C> {
    /// Create a pool over the given discovery source. Discovery runs lazily
    /// on first use.
    pub fn new(source: C) -> Self {
        Self {
            source,
            state: RwLock::new(PoolState::default()),
        }
    }

    /// The discovery source backing this pool.
    pub fn source(&self) -> &C {
        &self.source
    }

    /// Return the pool, populating it via discovery on first use.
    ///
    /// Fails with [`Error::NoCredentials`] when discovery yields nothing.
    pub async fn get_or_init(&self) -> Result<Vec<String>> {
        {
            let state = self.state.read().await;
            if let Some(pool) = state.pool.as_ref() {
                return Ok(pool.clone());
            }
        }

        let mut state = self.state.write().await;
        // Another task may have populated the pool while we waited.
        if let Some(pool) = state.pool.as_ref() {
            return Ok(pool.clone());
        }

        let keys = self.source.discover_credentials(&HashSet::new()).await?;
        if keys.is_empty() {
            return Err(Error::NoCredentials);
        }
        info!(
            count = keys.len(),
            source = self.source.name(),
            "Initialized credential pool"
        );
        state.pool = Some(keys.clone());
        Ok(keys)
    }

    /// Return the pool with the last successful key (if still a member)
    /// moved to the front; the relative order of the rest is preserved.
    pub async fn ordered(&self) -> Result<Vec<String>> {
        let mut keys = self.get_or_init().await?;
        let last = self.state.read().await.last_successful.clone();
        if let Some(last) = last {
            if let Some(pos) = keys.iter().position(|k| k == &last) {
                let key = keys.remove(pos);
                keys.insert(0, key);
            }
        }
        Ok(keys)
    }

    /// Record that `key` just served a successful transmission.
    pub async fn mark_success(&self, key: &str) {
        let mut state = self.state.write().await;
        state.last_successful = Some(key.to_string());
    }

    /// The current last-successful marker, if any.
    pub async fn last_successful(&self) -> Option<String> {
        self.state.read().await.last_successful.clone()
    }

    /// Re-run discovery excluding a just-failed key and clear the
    /// last-successful marker.
    ///
    /// Keys surfaced by discovery replace the pool. An empty discovery does
    /// not: the stored pool keeps its surviving members (only the failed key
    /// is dropped, and a pool emptied that way reverts to undiscovered so
    /// the next use runs discovery again). The returned list is what
    /// discovery produced, which may be empty; the caller decides whether to
    /// restart its attempt loop or fall back to its previous candidate list.
    pub async fn refresh(&self, excluding: &str) -> Result<Vec<String>> {
        let mut exclude = HashSet::new();
        exclude.insert(excluding.to_string());

        let keys = self.source.discover_credentials(&exclude).await?;
        debug!(
            count = keys.len(),
            excluded = excluding,
            "Refreshed credential pool"
        );

        let mut state = self.state.write().await;
        if keys.is_empty() {
            if let Some(pool) = state.pool.as_mut() {
                pool.retain(|k| k != excluding);
                if pool.is_empty() {
                    state.pool = None;
                }
            }
        } else {
            state.pool = Some(keys.clone());
        }
        state.last_successful = None;
        Ok(keys)
    }
}

impl<C: CredentialSource> std::fmt::Debug for KeyPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPool")
            .field("source", &self.source.name())
            .finish()
    }
}
