//! Request authorization: origin normalization, session secrets and
//! SAPISID-style token derivation.

pub mod origin;
pub mod secrets;
pub mod token;

pub use origin::normalize_origin;
pub use secrets::{EnvSecretStore, MemorySecretStore, SecretEntry, SecretStore};
pub use token::{derive_all_tokens, derive_auth_token, TokenParam, SECRET_SLOTS};
