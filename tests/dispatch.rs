//! End-to-end tests over the public API: discovery, pool rotation, token
//! derivation and dispatch, with a scripted transport standing in for the
//! wire.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use makersuite_gateway::{
    sha1_hex, AttemptResponse, Error, MakerSuiteClient, MemorySecretStore, Result,
    ScriptScanSource, Transport,
};

/// Records every attempt (url, api key, authorization) and replays a
/// scripted sequence of outcomes.
struct ScriptedTransport {
    outcomes: Mutex<std::collections::VecDeque<Result<AttemptResponse>>>,
    attempts: Mutex<Vec<(String, String, String)>>,
}

impl ScriptedTransport {
    fn new(outcomes: Vec<Result<AttemptResponse>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            attempts: Mutex::new(Vec::new()),
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
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, url: &str, _body: &Value, headers: HeaderMap) -> Result<AttemptResponse> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        self.attempts
            .lock()
            .await
            .push((url.to_string(), header("x-goog-api-key"), header("authorization")));
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

fn test_key(suffix: char) -> String {
    format!("AIzaSy{}", String::from(suffix).repeat(33))
}

/// Script bodies carrying two API keys and the service origin.
fn page_scripts() -> Vec<String> {
    vec![
        format!("window.__k1 = \"{}\";", test_key('A')),
        format!(
            "var cfg = {{ key: \"{}\", api: \"https://alkalimakersuite-pa.clients6.google.com\" }};",
            test_key('B')
        ),
    ]
}

async fn secrets() -> Arc<MemorySecretStore> {
    let store = MemorySecretStore::new();
    store.insert("SAPISID", "session-secret").await;
    Arc::new(store)
}

fn client(
    transport: Arc<ScriptedTransport>,
    secrets: Arc<MemorySecretStore>,
) -> MakerSuiteClient<ScriptScanSource, Arc<ScriptedTransport>> {
    MakerSuiteClient::builder()
        .credential_source(ScriptScanSource::from_scripts(page_scripts()))
        .transport(transport)
        .secret_store(secrets)
        .request_origin("https://example.com")
        .build()
}

#[tokio::test]
async fn create_prompt_end_to_end() {
    let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok("[]")]));
    let client = client(Arc::clone(&transport), secrets().await);

    let document = json!({
        "runSettings": {
            "model": "models/gemini-pro",
            "temperature": 0.7,
            "responseSchema": {"type": "object", "properties": {"answer": {"type": "string"}}}
        },
        "chunkedPrompt": {
            "chunks": [{"text": "Question?", "role": "user"}]
        }
    });

    let body = client
        .create_prompt("integration prompt", &document)
        .await
        .unwrap();
    assert_eq!(body.as_deref(), Some("[]"));

    let attempts = transport.attempts.lock().await;
    assert_eq!(attempts.len(), 1);
    let (url, api_key, authorization) = &attempts[0];

    // URL: discovered origin + fixed RPC path + operation.
    assert_eq!(
        url,
        "https://alkalimakersuite-pa.clients6.google.com/$rpc/google.internal.alkali.applications.makersuite.v1.MakerSuiteService/CreatePrompt"
    );

    // Reverse discovery order: the key from the later script is tried first.
    assert_eq!(api_key, &test_key('B'));

    // Authorization derived from the SAPISID secret and the request origin.
    let expected = format!(
        "SAPISIDHASH {}",
        sha1_hex("session-secret https://example.com")
    );
    assert_eq!(authorization, &expected);
}

#[tokio::test]
async fn rotation_tries_keys_in_pool_order() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        ScriptedTransport::status(403),
        ScriptedTransport::ok("second"),
    ]));
    let client = client(Arc::clone(&transport), secrets().await);

    let body = client.dispatch("CreatePrompt", &json!([])).await.unwrap();
    assert_eq!(body, "second");

    let attempts = transport.attempts.lock().await;
    let keys: Vec<&str> = attempts.iter().map(|(_, k, _)| k.as_str()).collect();
    assert_eq!(keys, vec![test_key('B'), test_key('A')]);
}

#[tokio::test]
async fn exhaustion_after_all_keys_fail() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        ScriptedTransport::status(401),
        ScriptedTransport::status(403),
    ]));
    let client = client(Arc::clone(&transport), secrets().await);

    let err = client.dispatch("CreatePrompt", &json!([])).await.unwrap_err();
    match err {
        Error::AllCredentialsExhausted { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn successful_key_is_reused_first_on_next_dispatch() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        ScriptedTransport::status(403), // key B fails
        ScriptedTransport::ok("first"), // key A succeeds
        ScriptedTransport::ok("second"),
    ]));
    let client = client(Arc::clone(&transport), secrets().await);

    client.dispatch("CreatePrompt", &json!([])).await.unwrap();
    client.dispatch("CreatePrompt", &json!([])).await.unwrap();

    let attempts = transport.attempts.lock().await;
    let keys: Vec<&str> = attempts.iter().map(|(_, k, _)| k.as_str()).collect();
    // Second dispatch leads with the key that succeeded.
    assert_eq!(keys, vec![test_key('B'), test_key('A'), test_key('A')]);
}

#[tokio::test]
async fn scripts_without_keys_yield_no_credentials() {
    let transport = Arc::new(ScriptedTransport::new(vec![]));
    let client: MakerSuiteClient<ScriptScanSource, Arc<ScriptedTransport>> =
        MakerSuiteClient::builder()
            .credential_source(ScriptScanSource::from_scripts(vec![
                "var api = \"https://alkalimakersuite-pa.clients6.google.com\";".to_string(),
            ]))
            .transport(Arc::clone(&transport))
            .secret_store(secrets().await)
            .request_origin("https://example.com")
            .build();

    let err = client.dispatch("CreatePrompt", &json!([])).await.unwrap_err();
    assert!(matches!(err, Error::NoCredentials));
}
