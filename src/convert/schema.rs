//! Structured-output schema encoding.
//!
//! The wire format is positional: a schema is an index-significant array, not
//! an object. Trailing null entries are stripped per array after building
//! (array-level trimming, never per-field), so a field can only be omitted
//! when everything after it is unset too. This is the most likely source of
//! wire-incompatibility bugs, hence the test density here.

use serde_json::{json, Value};

/// Positional slots of an encoded schema array.
const SLOT_FORMAT: usize = 1;
const SLOT_DESCRIPTION: usize = 2;
const SLOT_NULLABLE: usize = 3;
const SLOT_ENUM: usize = 4;
const SLOT_ITEMS: usize = 5;
const SLOT_PROPERTIES: usize = 6;
const SLOT_COUNT: usize = 7;

/// Integer codes for the six JSON-Schema-like primitive kinds.
fn type_code(ty: Option<&str>) -> u64 {
    match ty {
        Some("string") => 1,
        Some("number") => 2,
        Some("integer") => 3,
        Some("boolean") => 4,
        Some("array") => 5,
        Some("object") => 6,
        _ => 0,
    }
}

/// Remove trailing nulls, leaving interior nulls untouched.
pub(crate) fn trim_trailing_nulls(fields: &mut Vec<Value>) {
    while matches!(fields.last(), Some(Value::Null)) {
        fields.pop();
    }
}

/// Recursively encode a JSON-Schema-like value into its positional array
/// form.
pub fn encode_response_schema(schema: &Value) -> Value {
    let ty = schema.get("type").and_then(Value::as_str);
    let mut fields = vec![Value::Null; SLOT_COUNT];
    fields[0] = json!(type_code(ty));

    if let Some(format) = schema.get("format") {
        fields[SLOT_FORMAT] = format.clone();
    }
    if let Some(description) = schema.get("description") {
        fields[SLOT_DESCRIPTION] = description.clone();
    }
    if let Some(nullable) = schema.get("nullable") {
        fields[SLOT_NULLABLE] = nullable.clone();
    }
    if let Some(variants) = schema.get("enum") {
        fields[SLOT_ENUM] = variants.clone();
    }

    if ty == Some("array") {
        if let Some(items) = schema.get("items") {
            fields[SLOT_ITEMS] = encode_response_schema(items);
        }
    }

    if ty == Some("object") {
        if let Some(Value::Object(props)) = schema.get("properties") {
            let encoded: Vec<Value> = props
                .iter()
                .map(|(name, sub)| json!([name, encode_response_schema(sub)]))
                .collect();
            fields[SLOT_PROPERTIES] = Value::Array(encoded);
        }
    }

    trim_trailing_nulls(&mut fields);
    Value::Array(fields)
}
