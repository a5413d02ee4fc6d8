//! Conversion from external prompt documents to the canonical positional
//! payload.

pub mod prompt;
pub mod schema;

pub use prompt::{convert_prompt, RESPONSE_MIME_JSON, RESPONSE_MIME_TEXT};
pub use schema::encode_response_schema;
