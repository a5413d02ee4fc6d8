//! The two external prompt document shapes.
//!
//! Both describe the same thing; they differ only in where the generation
//! configuration and the conversation turns live. The shape markers
//! (`generationConfig` vs `chunkedPrompt`) are mutually exclusive.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Shape A: generate-content style ─────────────────────────────────────────

/// Document carrying a `generationConfig` marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentDocument {
    /// Generation configuration (the shape marker).
    pub generation_config: GenerationConfig,
    /// Conversation turns.
    #[serde(default)]
    pub contents: Vec<Content>,
    /// Model identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Generation parameters for shape A.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Top-k sampling parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Output token cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Explicit response MIME type, overriding the schema-based default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// Structured-output schema (JSON-Schema-like).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

/// One conversation turn in shape A.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Turn role; anything other than `model`/`assistant` maps to `user`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Turn content parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single content part. Only text parts carry payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Text payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// ── Shape B: studio prompt style ────────────────────────────────────────────

/// Document carrying a `chunkedPrompt` marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioPromptDocument {
    /// Run settings (configuration fields live here in this shape).
    #[serde(default)]
    pub run_settings: RunSettings,
    /// Chunked conversation (the shape marker).
    pub chunked_prompt: ChunkedPrompt,
}

/// Generation parameters for shape B. Same fields as
/// [`GenerationConfig`] plus the model identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSettings {
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Model identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Nucleus sampling parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Top-k sampling parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Output token cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Explicit response MIME type, overriding the schema-based default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// Structured-output schema (JSON-Schema-like).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

/// The conversation turns of shape B.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkedPrompt {
    /// Ordered turns.
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

/// One conversation turn in shape B.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Turn text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Turn role; anything other than `model`/`assistant` maps to `user`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}
