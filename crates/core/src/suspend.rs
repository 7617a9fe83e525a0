//! Suspend payload and its string codec.
//!
//! The payload is the small resumable blob a course keeps in the host's
//! `cmi.suspend_data` field (or the local store's `suspend_data` key). It is
//! encoded as compact JSON:
//!
//! ```text
//! {"lang":"fr","location":3,"quiz":{"q1":"b"},"v":1}
//! ```
//!
//! `v` is the schema version, `location` and `lang` are the two fields the
//! progress engine understands; anything else is carried through untouched.

use serde_json::{Map, Value};

/// Schema version stamped on every write.
pub const SCHEMA_VERSION: u32 = 1;

const VERSION_FIELD: &str = "v";
const LOCATION_FIELD: &str = "location";
const LANGUAGE_FIELD: &str = "lang";

/// Errors raised while decoding a stored payload.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The stored string is not a payload object.
    #[error("malformed suspend payload: {0}")]
    MalformedPayload(String),
}

/// Versioned, extensible suspend payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SuspendPayload {
    schema_version: u32,
    fields: Map<String, Value>,
}

impl SuspendPayload {
    /// An empty payload at the current schema version.
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            fields: Map::new(),
        }
    }

    /// Schema version carried by this payload.
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Stored location, if it is a non-negative integer.
    pub fn location(&self) -> Option<u32> {
        self.fields
            .get(LOCATION_FIELD)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }

    /// Stored language preference, if non-empty.
    pub fn language(&self) -> Option<&str> {
        self.fields
            .get(LANGUAGE_FIELD)
            .and_then(Value::as_str)
            .filter(|lang| !lang.is_empty())
    }

    /// Any field by name (the version is not a field).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields except the version.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Shallow-merge `patch` over this payload and restamp the schema version.
    pub fn merge(&mut self, patch: SuspendPatch) {
        for (key, value) in patch.fields {
            if key == VERSION_FIELD {
                continue;
            }
            self.fields.insert(key, value);
        }
        self.schema_version = SCHEMA_VERSION;
    }

    /// Merge `patch` over `base` (or an empty payload) without touching `base`.
    pub fn merged(base: Option<&SuspendPayload>, patch: SuspendPatch) -> Self {
        let mut next = base.cloned().unwrap_or_default();
        next.merge(patch);
        next
    }
}

impl Default for SuspendPayload {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial update applied with [`SuspendPayload::merge`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuspendPatch {
    fields: Map<String, Value>,
}

impl SuspendPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the location.
    pub fn location(mut self, location: u32) -> Self {
        self.fields.insert(LOCATION_FIELD.to_string(), Value::from(location));
        self
    }

    /// Set the language preference.
    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.fields
            .insert(LANGUAGE_FIELD.to_string(), Value::String(lang.into()));
        self
    }

    /// Set an arbitrary field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Whether the patch carries no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for SuspendPatch {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Encode a payload as compact JSON.
pub fn encode(payload: &SuspendPayload) -> String {
    let mut object = Map::with_capacity(payload.fields.len() + 1);
    object.insert(VERSION_FIELD.to_string(), Value::from(payload.schema_version));
    for (key, value) in &payload.fields {
        object.insert(key.clone(), value.clone());
    }
    Value::Object(object).to_string()
}

/// Decode a stored payload.
pub fn decode(raw: &str) -> Result<SuspendPayload, CodecError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CodecError::MalformedPayload(e.to_string()))?;

    let Value::Object(mut fields) = value else {
        return Err(CodecError::MalformedPayload(
            "payload is not an object".to_string(),
        ));
    };

    let schema_version = match fields.remove(VERSION_FIELD) {
        None => SCHEMA_VERSION,
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                CodecError::MalformedPayload(format!("invalid schema version: {}", v))
            })?,
    };

    Ok(SuspendPayload {
        schema_version,
        fields,
    })
}

/// Length of an encoded payload in characters, as text-field limits count it.
pub fn encoded_len(encoded: &str) -> usize {
    encoded.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_keeps_extension_fields() {
        let payload = SuspendPayload::merged(
            None,
            SuspendPatch::new()
                .location(3)
                .language("fr")
                .field("quiz", json!({"q1": "b", "attempts": [1, 2]}))
                .field("note", "héllo \"quoted\""),
        );

        let decoded = decode(&encode(&payload)).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(decoded.location(), Some(3));
        assert_eq!(decoded.language(), Some("fr"));
    }

    #[test]
    fn test_round_trip_across_payload_shapes() {
        let cases = [
            r#"{"v":1}"#,
            r#"{"location":2,"v":0}"#,
            r#"{"lang":"ja","note":"日本語 é \"q\" \\ \n\t \u0001","v":1}"#,
            r#"{"grid":[[1,2],[],[["deep"]]],"location":0,"v":1}"#,
            r#"{"missing":null,"ratio":2.5,"step":0.125,"v":1}"#,
        ];

        for raw in cases {
            let payload = decode(raw).unwrap();
            let encoded = encode(&payload);
            let decoded = decode(&encoded).unwrap();
            assert_eq!(decoded, payload, "case {raw}");
            assert_eq!(encode(&decoded), encoded, "case {raw}");
        }
    }

    #[test]
    fn test_empty_payload_encodes_version_only() {
        assert_eq!(encode(&SuspendPayload::new()), r#"{"v":1}"#);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("not json"), Err(CodecError::MalformedPayload(_))));
        assert!(matches!(decode(""), Err(CodecError::MalformedPayload(_))));
        assert!(matches!(decode("2"), Err(CodecError::MalformedPayload(_))));
        assert!(matches!(decode("[1,2]"), Err(CodecError::MalformedPayload(_))));
        assert!(matches!(decode(r#"{"v":"one"}"#), Err(CodecError::MalformedPayload(_))));
    }

    #[test]
    fn test_decode_without_version_assumes_current() {
        let payload = decode(r#"{"location":2}"#).unwrap();
        assert_eq!(payload.schema_version(), SCHEMA_VERSION);
        assert_eq!(payload.location(), Some(2));
    }

    #[test]
    fn test_non_integer_location_is_ignored_but_kept() {
        let payload = decode(r#"{"v":1,"location":"two"}"#).unwrap();
        assert_eq!(payload.location(), None);
        assert_eq!(payload.get("location"), Some(&json!("two")));

        let negative = decode(r#"{"v":1,"location":-1}"#).unwrap();
        assert_eq!(negative.location(), None);
    }

    #[test]
    fn test_empty_language_is_absent() {
        let payload = decode(r#"{"v":1,"lang":""}"#).unwrap();
        assert_eq!(payload.language(), None);
    }

    #[test]
    fn test_merge_preserves_unknown_fields_and_restamps_version() {
        let mut payload = decode(r#"{"v":0,"lang":"de","custom":true}"#).unwrap();
        assert_eq!(payload.schema_version(), 0);

        payload.merge(SuspendPatch::new().location(4).field("v", 9));

        assert_eq!(payload.schema_version(), SCHEMA_VERSION);
        assert_eq!(payload.location(), Some(4));
        assert_eq!(payload.language(), Some("de"));
        assert_eq!(payload.get("custom"), Some(&json!(true)));
        assert_eq!(payload.get("v"), None);
    }

    #[test]
    fn test_merge_overwrites_shallowly() {
        let base = decode(r#"{"v":1,"quiz":{"q1":"a","q2":"b"}}"#).unwrap();
        let next = SuspendPayload::merged(Some(&base), SuspendPatch::new().field("quiz", json!({"q3": "c"})));

        assert_eq!(next.get("quiz"), Some(&json!({"q3": "c"})));
        assert_eq!(base.get("quiz"), Some(&json!({"q1": "a", "q2": "b"})));
    }

    #[test]
    fn test_encoded_len_counts_characters() {
        assert_eq!(encoded_len("abc"), 3);
        assert_eq!(encoded_len("é日"), 2);
    }
}
