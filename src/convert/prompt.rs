//! Canonical prompt payload construction.
//!
//! Either external document shape converts to the same positional payload:
//! `[config, [title], turns]`. Fields are identified by array position, not
//! by name, and the configuration array is trimmed of trailing nulls (interior
//! nulls stay, they keep later positions aligned).

use serde_json::{json, Value};

use crate::convert::schema::{encode_response_schema, trim_trailing_nulls};
use crate::models::prompt::{GenerateContentDocument, StudioPromptDocument};

/// Response MIME marker emitted when a structured-output schema is present.
pub const RESPONSE_MIME_JSON: &str = "application/json";

/// Response MIME marker emitted otherwise.
pub const RESPONSE_MIME_TEXT: &str = "text/plain";

/// Positional slots of the configuration array.
const CFG_TEMPERATURE: usize = 0;
const CFG_MODEL: usize = 2;
const CFG_TOP_P: usize = 4;
const CFG_TOP_K: usize = 5;
const CFG_MAX_OUTPUT_TOKENS: usize = 6;
const CFG_PADDING: usize = 7;
const CFG_RESPONSE_MIME: usize = 8;
const CFG_RESPONSE_SCHEMA: usize = 9;
const CFG_FLAGS_START: usize = 10;
const CFG_LEN: usize = 12;

/// Literal flags carried after the schema slot whenever a structured-output
/// schema is present.
const STRUCTURED_OUTPUT_FLAGS: [u64; 2] = [1, 1];

/// Length of one conversation-turn tuple; text sits at slot 0, the role at
/// the final slot.
const TURN_LEN: usize = 9;
const TURN_ROLE: usize = TURN_LEN - 1;

/// A prompt document reduced to the fields the canonical payload needs.
/// Both external shapes normalize into this before encoding.
#[derive(Debug, Default)]
struct NormalizedPrompt {
    temperature: Option<f64>,
    model: Option<String>,
    top_p: Option<f64>,
    top_k: Option<u32>,
    max_output_tokens: Option<u32>,
    response_mime_type: Option<String>,
    response_schema: Option<Value>,
    /// `(role, text)` per turn, in order.
    turns: Vec<(String, String)>,
}

/// Convert an external prompt document into the canonical payload.
///
/// Dispatches on the document's shape marker (`chunkedPrompt` vs
/// `generationConfig`). Returns `None` when the document carries neither
/// marker or does not parse as its claimed shape — "not a recognized
/// prompt", distinct from a hard failure.
pub fn convert_prompt(name: &str, document: &Value) -> Option<Value> {
    let normalized = if document.get("chunkedPrompt").is_some() {
        let doc: StudioPromptDocument = serde_json::from_value(document.clone()).ok()?;
        normalize_studio(doc)
    } else if document.get("generationConfig").is_some() {
        let doc: GenerateContentDocument = serde_json::from_value(document.clone()).ok()?;
        normalize_generate_content(doc)
    } else {
        return None;
    };

    Some(encode_payload(name, &normalized))
}

fn normalize_generate_content(doc: GenerateContentDocument) -> NormalizedPrompt {
    let cfg = doc.generation_config;
    let turns = doc
        .contents
        .into_iter()
        .map(|content| {
            let text: String = content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect();
            (map_role(content.role.as_deref()), text)
        })
        .collect();

    NormalizedPrompt {
        temperature: cfg.temperature,
        model: doc.model,
        top_p: cfg.top_p,
        top_k: cfg.top_k,
        max_output_tokens: cfg.max_output_tokens,
        response_mime_type: cfg.response_mime_type,
        response_schema: cfg.response_schema,
        turns,
    }
}

fn normalize_studio(doc: StudioPromptDocument) -> NormalizedPrompt {
    let cfg = doc.run_settings;
    let turns = doc
        .chunked_prompt
        .chunks
        .into_iter()
        .map(|chunk| {
            (
                map_role(chunk.role.as_deref()),
                chunk.text.unwrap_or_default(),
            )
        })
        .collect();

    NormalizedPrompt {
        temperature: cfg.temperature,
        model: cfg.model,
        top_p: cfg.top_p,
        top_k: cfg.top_k,
        max_output_tokens: cfg.max_output_tokens,
        response_mime_type: cfg.response_mime_type,
        response_schema: cfg.response_schema,
        turns,
    }
}

/// Map a document role onto the two wire roles.
fn map_role(role: Option<&str>) -> String {
    match role {
        Some("model") | Some("assistant") => "model".to_string(),
        _ => "user".to_string(),
    }
}

fn encode_payload(name: &str, prompt: &NormalizedPrompt) -> Value {
    let turns: Vec<Value> = prompt
        .turns
        .iter()
        .map(|(role, text)| {
            let mut tuple = vec![Value::Null; TURN_LEN];
            tuple[0] = json!(text);
            tuple[TURN_ROLE] = json!(role);
            Value::Array(tuple)
        })
        .collect();

    json!([encode_config(prompt), [name], turns])
}

fn encode_config(prompt: &NormalizedPrompt) -> Value {
    let mut fields = vec![Value::Null; CFG_LEN];

    if let Some(t) = prompt.temperature {
        fields[CFG_TEMPERATURE] = json!(t);
    }
    // Slot 1 is the stop-sequences placeholder, slot 3 is reserved.
    if let Some(model) = &prompt.model {
        fields[CFG_MODEL] = json!(model);
    }
    if let Some(p) = prompt.top_p {
        fields[CFG_TOP_P] = json!(p);
    }
    if let Some(k) = prompt.top_k {
        fields[CFG_TOP_K] = json!(k);
    }
    if let Some(max) = prompt.max_output_tokens {
        fields[CFG_MAX_OUTPUT_TOKENS] = json!(max);
    }
    fields[CFG_PADDING] = json!([null, null, null]);

    let mime = prompt.response_mime_type.clone().unwrap_or_else(|| {
        if prompt.response_schema.is_some() {
            RESPONSE_MIME_JSON.to_string()
        } else {
            RESPONSE_MIME_TEXT.to_string()
        }
    });
    fields[CFG_RESPONSE_MIME] = json!(mime);

    if let Some(schema) = &prompt.response_schema {
        fields[CFG_RESPONSE_SCHEMA] = encode_response_schema(schema);
        for (i, flag) in STRUCTURED_OUTPUT_FLAGS.iter().enumerate() {
            fields[CFG_FLAGS_START + i] = json!(flag);
        }
    }

    trim_trailing_nulls(&mut fields);
    Value::Array(fields)
}
