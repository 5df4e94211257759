//! Store-facing document representation of records.
//!
//! A record crosses the store boundary as a JSON object. Sparse filters and
//! partial updates only consider fields that are not at their zero value.

use crate::entity::{EntityId, Record};
use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Value};

/// A stored row: column name to value.
pub type Document = Map<String, Value>;

/// Returns true if `value` is the zero value of its type.
///
/// Zero values are `null`, `false`, `0`, `""`, the nil UUID, and empty
/// arrays or objects.
#[must_use]
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || is_nil_uuid(s),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

fn is_nil_uuid(s: &str) -> bool {
    s.parse::<EntityId>().map(|id| id.is_nil()).unwrap_or(false)
}

/// Returns a copy of `doc` holding only its non-zero fields.
#[must_use]
pub fn non_zero_fields(doc: &Document) -> Document {
    doc.iter()
        .filter(|(_, v)| !is_zero(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Reads an identity column from a document.
///
/// Missing, null or unparsable values yield the nil identity.
#[must_use]
pub fn document_id(doc: &Document, column: &str) -> EntityId {
    doc.get(column)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Encodes a record into its document.
pub fn encode<T: Record>(record: &T) -> CoreResult<Document> {
    match serde_json::to_value(record) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(other) => Err(CoreError::codec(
            T::TABLE,
            format!("record must serialize to an object, got {}", kind(&other)),
        )),
        Err(e) => Err(CoreError::codec(T::TABLE, e.to_string())),
    }
}

/// Encodes only the non-zero fields of a record.
pub fn encode_sparse<T: Record>(record: &T) -> CoreResult<Document> {
    encode(record).map(|doc| non_zero_fields(&doc))
}

/// Decodes a record from a stored document.
pub fn decode<T: Record>(doc: Document) -> CoreResult<T> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| CoreError::codec(T::TABLE, e.to_string()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
