//! High-level client for the MakerSuite prompt API.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use crate::auth::secrets::SecretStore;
use crate::config::rpc_url;
use crate::convert::convert_prompt;
use crate::discovery::CredentialSource;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::pool::KeyPool;
use crate::transport::{HttpTransport, Transport};

/// RPC operation for prompt creation.
pub const OP_CREATE_PROMPT: &str = "CreatePrompt";

/// Client for the MakerSuite prompt API.
///
/// Owns the credential pool and the cached service origin; generic over the
/// discovery source and the transport so hosts and tests inject their own.
pub struct MakerSuiteClient<C: CredentialSource, T: Transport> {
    pool: Arc<KeyPool<C>>,
    dispatcher: Dispatcher<C, T>,
    /// Service origin, resolved once and reused for the client's lifetime.
    service_origin: RwLock<Option<String>>,
}

impl<C: CredentialSource> MakerSuiteClient<C, HttpTransport> {
    /// Create a client over the real HTTP transport.
    pub fn new(
        source: C,
        secrets: Arc<dyn SecretStore>,
        request_origin: impl Into<String>,
    ) -> Result<Self> {
        Ok(MakerSuiteClient::builder()
            .credential_source(source)
            .secret_store(secrets)
            .request_origin(request_origin)
            .transport(HttpTransport::new()?)
            .build())
    }
}

impl<C: CredentialSource, T: Transport> MakerSuiteClient<C, T> {
    /// Create a new client builder.
    pub fn builder() -> MakerSuiteClientBuilder<C, T> {
        MakerSuiteClientBuilder::default()
    }

    /// The remote service origin, discovering and caching it on first use.
    ///
    /// Immutable after the first successful resolution.
    pub async fn service_origin(&self) -> Result<String> {
        {
            let cached = self.service_origin.read().await;
            if let Some(origin) = cached.as_ref() {
                return Ok(origin.clone());
            }
        }

        let mut cached = self.service_origin.write().await;
        if let Some(origin) = cached.as_ref() {
            return Ok(origin.clone());
        }

        let origin = self.pool.source().discover_service_origin().await?;
        info!(origin = origin.as_str(), "Resolved service origin");
        *cached = Some(origin.clone());
        Ok(origin)
    }

    /// Dispatch a canonical payload to the named RPC operation.
    ///
    /// Returns the raw response body of the first successful attempt.
    pub async fn dispatch(&self, operation: &str, payload: &Value) -> Result<String> {
        let origin = self.service_origin().await?;
        let url = rpc_url(&origin, operation)?;
        self.dispatcher.dispatch(&url, payload).await
    }

    /// Convert a prompt document and send it to the prompt-creation
    /// operation.
    ///
    /// Returns `Ok(None)` when the document is not a recognized prompt shape
    /// (no request is made); dispatch failures surface as errors.
    pub async fn create_prompt(&self, name: &str, document: &Value) -> Result<Option<String>> {
        let Some(payload) = convert_prompt(name, document) else {
            return Ok(None);
        };
        self.dispatch(OP_CREATE_PROMPT, &payload).await.map(Some)
    }
}

impl<C: CredentialSource, T: Transport> std::fmt::Debug for MakerSuiteClient<C, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MakerSuiteClient")
            .field("pool", &self.pool)
            .finish()
    }
}

/// Builder for [`MakerSuiteClient`].
pub struct MakerSuiteClientBuilder<C: CredentialSource, T: Transport> {
    source: Option<C>,
    transport: Option<T>,
    secrets: Option<Arc<dyn SecretStore>>,
    request_origin: Option<String>,
    attempt_timeout: Option<Duration>,
}

impl<C: CredentialSource, T: Transport> MakerSuiteClientBuilder<C, T> {
    /// Set the credential discovery source (required).
    pub fn credential_source(mut self, source: C) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the transport (required).
    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the session secret store (required).
    pub fn secret_store(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// Set the normalized origin of the calling security context (required).
    pub fn request_origin(mut self, origin: impl Into<String>) -> Self {
        self.request_origin = Some(origin.into());
        self
    }

    /// Override the per-attempt timeout.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Build the client.
    ///
    /// # Panics
    ///
    /// Panics if the credential source, transport, secret store or request
    /// origin was not provided.
    pub fn build(self) -> MakerSuiteClient<C, T> {
        let source = self.source.expect("credential source is required");
        let transport = self.transport.expect("transport is required");
        let secrets = self.secrets.expect("secret store is required");
        let request_origin = self.request_origin.expect("request origin is required");

        let pool = Arc::new(KeyPool::new(source));
        let mut dispatcher =
            Dispatcher::new(Arc::clone(&pool), transport, secrets, request_origin);
        if let Some(timeout) = self.attempt_timeout {
            dispatcher = dispatcher.with_attempt_timeout(timeout);
        }

        MakerSuiteClient {
            pool,
            dispatcher,
            service_origin: RwLock::new(None),
        }
    }
}

impl<C: CredentialSource, T: Transport> Default for MakerSuiteClientBuilder<C, T> {
    fn default() -> Self {
        Self {
            source: None,
            transport: None,
            secrets: None,
            request_origin: None,
            attempt_timeout: None,
        }
    }
}
