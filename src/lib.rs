//! # makersuite-gateway
//!
//! Rust client library for the MakerSuite prompt API.
//!
//! Authorization tokens are derived locally from SID-family session secrets
//! (no server round-trip), API keys are discovered from the host environment
//! and rotated through on failure, and prompt documents in either of two
//! external shapes convert to the canonical positional wire payload.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use makersuite_gateway::{
//!     MakerSuiteClient, MemorySecretStore, Result, ScriptScanSource,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let secrets = MemorySecretStore::new();
//!     secrets.insert("SAPISID", "session-secret").await;
//!
//!     let source = ScriptScanSource::from_scripts(vec![
//!         page_scripts(), // script bodies from the host environment
//!     ]);
//!
//!     let client = MakerSuiteClient::new(
//!         source,
//!         Arc::new(secrets),
//!         "https://example.com",
//!     )?;
//!
//!     let document = serde_json::json!({
//!         "generationConfig": { "temperature": 0.7 },
//!         "contents": [
//!             { "role": "user", "parts": [{ "text": "Hello" }] }
//!         ]
//!     });
//!
//!     match client.create_prompt("my prompt", &document).await? {
//!         Some(body) => println!("created: {}", body),
//!         None => println!("not a recognized prompt document"),
//!     }
//!     Ok(())
//! }
//! # fn page_scripts() -> String { String::new() }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod convert;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod hash;
pub mod models;
pub mod pool;
pub mod transport;

// Re-exports for ergonomic usage
pub use auth::{
    derive_all_tokens, derive_auth_token, normalize_origin, EnvSecretStore, MemorySecretStore,
    SecretEntry, SecretStore, TokenParam, SECRET_SLOTS,
};
pub use client::{MakerSuiteClient, MakerSuiteClientBuilder, OP_CREATE_PROMPT};
pub use convert::{convert_prompt, encode_response_schema};
pub use discovery::{CredentialSource, ScriptScanSource, StaticCredentialSource};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use hash::{sha1_hex, Sha1};
pub use pool::KeyPool;
pub use transport::{AttemptResponse, HttpTransport, Transport};
