//! Credential-rotating request dispatch.
//!
//! One outbound call walks the ordered credential list sequentially:
//! `Trying(i) -> Succeeded | Refreshing -> Trying(0) | Exhausted`. Attempts
//! are never concurrent; the remote service is rate-limited and the
//! last-successful bookkeeping assumes one attempt in flight at a time.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::secrets::SecretStore;
use crate::auth::token::{derive_all_tokens, TokenParam};
use crate::config::ATTEMPT_TIMEOUT;
use crate::discovery::CredentialSource;
use crate::error::{Error, Result};
use crate::pool::KeyPool;
use crate::transport::{headers, Transport};

/// Retry-loop state for one dispatch.
#[derive(Debug)]
enum DispatchState {
    /// Trying the credential at this index of the current list.
    Trying(usize),
    /// The trusted credential just failed; rebuild the pool without it.
    /// Falls back to `Trying(resume_at)` of the old list when the rebuild
    /// comes back empty.
    Refreshing { failed: String, resume_at: usize },
}

/// Dispatches authorized requests, rotating through the credential pool.
pub struct Dispatcher<C: CredentialSource, T: Transport> {
    pool: Arc<KeyPool<C>>,
    transport: T,
    secrets: Arc<dyn SecretStore>,
    /// Normalized origin of the calling security context.
    request_origin: String,
    attempt_timeout: Duration,
}

impl<C: CredentialSource, T: Transport> Dispatcher<C, T> {
    /// Create a dispatcher over the given pool, transport and secret store.
    pub fn new(
        pool: Arc<KeyPool<C>>,
        transport: T,
        secrets: Arc<dyn SecretStore>,
        request_origin: String,
    ) -> Self {
        Self {
            pool,
            transport,
            secrets,
            request_origin,
            attempt_timeout: ATTEMPT_TIMEOUT,
        }
    }

    /// Override the per-attempt timeout.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Send `payload` to `url`, trying pool credentials in order until one
    /// succeeds.
    ///
    /// Returns the raw response body of the first successful attempt. When
    /// the trusted (last-successful) credential fails, the pool is refreshed
    /// without it and the loop restarts at the head of the new pool. When
    /// every candidate has been tried, fails with
    /// [`Error::AllCredentialsExhausted`].
    pub async fn dispatch(&self, url: &str, payload: &Value) -> Result<String> {
        let request_id = Uuid::new_v4();
        let mut keys = self.pool.ordered().await?;
        let mut state = DispatchState::Trying(0);
        let mut attempts = 0u32;
        let mut failures: Vec<String> = Vec::new();

        loop {
            match state {
                DispatchState::Trying(index) => {
                    let Some(key) = keys.get(index).cloned() else {
                        warn!(%request_id, attempts, "All credentials exhausted");
                        return Err(Error::AllCredentialsExhausted {
                            attempts,
                            message: failures.join("; "),
                        });
                    };

                    attempts += 1;
                    debug!(%request_id, index, key = key_prefix(&key), "Attempting transmission");

                    match self.attempt(url, &key, payload).await {
                        Ok(body) => {
                            debug!(%request_id, attempts, "Dispatch succeeded");
                            self.pool.mark_success(&key).await;
                            return Ok(body);
                        }
                        Err(err) if err.is_fatal() => return Err(err),
                        Err(err) => {
                            warn!(%request_id, key = key_prefix(&key), %err, "Attempt failed");
                            failures.push(format!("{}: {}", key_prefix(&key), err));

                            let trusted =
                                self.pool.last_successful().await.as_deref() == Some(key.as_str());
                            state = if trusted {
                                DispatchState::Refreshing {
                                    failed: key,
                                    resume_at: index + 1,
                                }
                            } else {
                                DispatchState::Trying(index + 1)
                            };
                        }
                    }
                }
                DispatchState::Refreshing { failed, resume_at } => {
                    debug!(%request_id, failed = key_prefix(&failed), "Trusted credential failed, refreshing pool");
                    let refreshed = self.pool.refresh(&failed).await?;
                    state = if refreshed.is_empty() {
                        // Nothing new surfaced; keep walking the old list.
                        DispatchState::Trying(resume_at)
                    } else {
                        keys = refreshed;
                        DispatchState::Trying(0)
                    };
                }
            }
        }
    }

    /// One transmission attempt with one credential.
    ///
    /// The authorization token is derived fresh per attempt; timestamped
    /// variants are never reused.
    async fn attempt(&self, url: &str, api_key: &str, payload: &Value) -> Result<String> {
        let params: [TokenParam; 0] = [];
        let token = derive_all_tokens(self.secrets.as_ref(), &self.request_origin, &params)
            .await
            .ok_or_else(|| Error::missing_capability("SID-family session secret"))?;

        let hdrs = headers::api_headers(&token, api_key);
        let response = tokio::time::timeout(
            self.attempt_timeout,
            self.transport.post(url, payload, hdrs),
        )
        .await
        .map_err(|_| Error::Timeout)??;

        if response.is_success() {
            Ok(response.body)
        } else {
            Err(Error::api(response.status, response.body))
        }
    }
}

impl<C: CredentialSource, T: Transport> std::fmt::Debug for Dispatcher<C, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("transport", &self.transport.name())
            .field("request_origin", &self.request_origin)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

/// Loggable key prefix; full keys never hit the logs.
fn key_prefix(key: &str) -> String {
    let prefix: String = key.chars().take(10).collect();
    format!("{}…", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::secrets::MemorySecretStore;
    use crate::discovery::StaticCredentialSource;
    use crate::transport::AttemptResponse;
    use async_trait::async_trait;
    use reqwest::header::HeaderMap;
    use tokio::sync::Mutex;

    /// Transport that replays a scripted sequence of outcomes and records
    /// which credential each attempt presented.
    struct ScriptedTransport {
        outcomes: Mutex<std::collections::VecDeque<Result<AttemptResponse>>>,
        tried_keys: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<Result<AttemptResponse>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                tried_keys: Mutex::new(Vec::new()),
            }
        }

        fn ok(body: &str) -> Result<AttemptResponse> {
            Ok(AttemptResponse {
                status: 200,
                body: body.to_string(),
            })
        }

        fn status(status: u16) -> Result<AttemptResponse> {
            Ok(AttemptResponse {
                status,
                body: format!("status {}", status),
            })
        }

        async fn tried(&self) -> Vec<String> {
            self.tried_keys.lock().await.clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post(
            &self,
            _url: &str,
            _body: &Value,
            headers: HeaderMap,
        ) -> Result<AttemptResponse> {
            let key = headers
                .get("x-goog-api-key")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            self.tried_keys.lock().await.push(key);
            self.outcomes
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Self::status(500))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    async fn secrets() -> Arc<MemorySecretStore> {
        let store = MemorySecretStore::new();
        store.insert("SAPISID", "secret").await;
        Arc::new(store)
    }

    type TestDispatcher = Dispatcher<Arc<StaticCredentialSource>, Arc<ScriptedTransport>>;
    type TestPool = Arc<KeyPool<Arc<StaticCredentialSource>>>;

    fn dispatcher(
        keys: &[&str],
        transport: Arc<ScriptedTransport>,
        secrets: Arc<MemorySecretStore>,
    ) -> (TestDispatcher, TestPool, Arc<StaticCredentialSource>) {
        let source = Arc::new(StaticCredentialSource::new(
            keys.iter().map(|k| k.to_string()).collect(),
            None,
        ));
        let pool = Arc::new(KeyPool::new(Arc::clone(&source)));
        let dispatcher = Dispatcher::new(
            Arc::clone(&pool),
            transport,
            secrets,
            "https://example.com".to_string(),
        );
        (dispatcher, pool, source)
    }

    #[tokio::test]
    async fn test_first_key_succeeds() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok("body")]));
        let (dispatcher, pool, _source) =
            dispatcher(&["k1", "k2"], Arc::clone(&transport), secrets().await);

        let body = dispatcher.dispatch("https://o/rpc", &serde_json::json!([])).await.unwrap();
        assert_eq!(body, "body");
        assert_eq!(transport.tried().await, vec!["k1"]);
        assert_eq!(pool.last_successful().await.as_deref(), Some("k1"));
    }

    #[tokio::test]
    async fn test_third_key_succeeds_in_order() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::status(403),
            ScriptedTransport::status(401),
            ScriptedTransport::ok("third"),
        ]));
        let (dispatcher, pool, _source) =
            dispatcher(&["k1", "k2", "k3"], Arc::clone(&transport), secrets().await);

        let body = dispatcher.dispatch("https://o/rpc", &serde_json::json!([])).await.unwrap();
        assert_eq!(body, "third");
        assert_eq!(transport.tried().await, vec!["k1", "k2", "k3"]);
        assert_eq!(pool.last_successful().await.as_deref(), Some("k3"));
    }

    #[tokio::test]
    async fn test_exhaustion_combines_failures() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::status(403),
            ScriptedTransport::status(429),
        ]));
        let (dispatcher, _pool, _source) =
            dispatcher(&["k1", "k2"], Arc::clone(&transport), secrets().await);

        let err = dispatcher
            .dispatch("https://o/rpc", &serde_json::json!([]))
            .await
            .unwrap_err();
        match err {
            Error::AllCredentialsExhausted { attempts, message } => {
                assert_eq!(attempts, 2);
                assert!(message.contains("403"));
                assert!(message.contains("429"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trusted_failure_refreshes_and_restarts() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::status(403), // trusted k2 fails
            ScriptedTransport::ok("fresh"), // new pool head succeeds
        ]));
        let (dispatcher, pool, _source) =
            dispatcher(&["k1", "k2"], Arc::clone(&transport), secrets().await);

        // k2 is the trusted key, so ordered() puts it first.
        pool.get_or_init().await.unwrap();
        pool.mark_success("k2").await;

        let body = dispatcher.dispatch("https://o/rpc", &serde_json::json!([])).await.unwrap();
        assert_eq!(body, "fresh");
        // Refresh excluded k2; the restarted loop begins at the new head k1.
        assert_eq!(transport.tried().await, vec!["k2", "k1"]);
        assert_eq!(pool.last_successful().await.as_deref(), Some("k1"));
    }

    #[tokio::test]
    async fn test_empty_refresh_continues_old_list() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::status(403), // trusted k1 fails
            ScriptedTransport::ok("old-list"),
        ]));
        let (dispatcher, pool, source) =
            dispatcher(&["k1", "k2"], Arc::clone(&transport), secrets().await);
        pool.get_or_init().await.unwrap();
        pool.mark_success("k1").await;

        // Discovery now only knows the failed key, so the refreshed pool
        // (excluding k1) is empty and the old list continues at k2.
        source.set_keys(vec!["k1".into()]).await;

        let body = dispatcher.dispatch("https://o/rpc", &serde_json::json!([])).await.unwrap();
        assert_eq!(body, "old-list");
        assert_eq!(transport.tried().await, vec!["k1", "k2"]);
    }

    #[tokio::test]
    async fn test_dispatch_after_empty_refresh_uses_surviving_key() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::status(403), // trusted k1 fails
            ScriptedTransport::ok("old-list"),
            ScriptedTransport::ok("again"),
        ]));
        let (dispatcher, pool, source) =
            dispatcher(&["k1", "k2"], Arc::clone(&transport), secrets().await);
        pool.get_or_init().await.unwrap();
        pool.mark_success("k1").await;
        source.set_keys(vec!["k1".into()]).await;

        dispatcher.dispatch("https://o/rpc", &serde_json::json!([])).await.unwrap();
        // k2 succeeded off the old list and stayed a pool member, so a
        // second dispatch goes straight to it instead of failing empty.
        let body = dispatcher.dispatch("https://o/rpc", &serde_json::json!([])).await.unwrap();
        assert_eq!(body, "again");
        assert_eq!(transport.tried().await, vec!["k1", "k2", "k2"]);
        assert_eq!(pool.last_successful().await.as_deref(), Some("k2"));
    }

    #[tokio::test]
    async fn test_network_error_treated_like_failure() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(Error::Timeout),
            ScriptedTransport::ok("recovered"),
        ]));
        let (dispatcher, _pool, _source) =
            dispatcher(&["k1", "k2"], Arc::clone(&transport), secrets().await);

        let body = dispatcher.dispatch("https://o/rpc", &serde_json::json!([])).await.unwrap();
        assert_eq!(body, "recovered");
        assert_eq!(transport.tried().await, vec!["k1", "k2"]);
    }

    #[tokio::test]
    async fn test_missing_secrets_is_fatal() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let (dispatcher, _pool, _source) = dispatcher(
            &["k1", "k2"],
            Arc::clone(&transport),
            Arc::new(MemorySecretStore::new()),
        );

        let err = dispatcher
            .dispatch("https://o/rpc", &serde_json::json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCapability(_)));
        // No transmission happened without an authorization token.
        assert!(transport.tried().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_pool_fails_before_any_attempt() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let (dispatcher, _pool, _source) = dispatcher(&[], Arc::clone(&transport), secrets().await);

        let err = dispatcher
            .dispatch("https://o/rpc", &serde_json::json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoCredentials));
    }
}
