//! Annotation records returned by the oracle and persisted per image.
//!
//! Deserialization is lenient. A missing or malformed field degrades
//! instead of failing the record:
//!
//! - a list that is absent or not an array is empty, and non-string
//!   elements are dropped;
//! - a context field that is absent, `null` or a nested value becomes
//!   [`UNKNOWN`]; numbers and booleans are kept as their text;
//! - `instances` or `context` given as anything but an object is treated
//!   as absent.
//!
//! Fields beyond the documented shape are ignored. Ingestion checks the
//! oracle's reply with the stricter [`AnnotationRecord::from_value_strict`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Sentinel used for context fields the oracle could not resolve.
pub const UNKNOWN: &str = "unknown";

/// File extension of persisted annotation records.
pub const ANNOTATION_EXTENSION: &str = "json";

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Structured "bag of words" annotation for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(default, deserialize_with = "lenient_labels")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub instances: Instances,
    #[serde(default, deserialize_with = "lenient_object")]
    pub context: Context,
}

/// Objects grouped by how many times they appear in the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instances {
    #[serde(default, deserialize_with = "lenient_labels")]
    pub single: Vec<String>,
    #[serde(default, deserialize_with = "lenient_labels")]
    pub few: Vec<String>,
    #[serde(default, deserialize_with = "lenient_labels")]
    pub many: Vec<String>,
}

/// Scene context. Each field is free text or [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default = "unknown", deserialize_with = "lenient_label")]
    pub time: String,
    #[serde(default = "unknown", deserialize_with = "lenient_label")]
    pub location: String,
    #[serde(default = "unknown", deserialize_with = "lenient_label")]
    pub action: String,
    #[serde(default = "unknown", deserialize_with = "lenient_label")]
    pub object: String,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            time: unknown(),
            location: unknown(),
            action: unknown(),
            object: unknown(),
        }
    }
}

impl AnnotationRecord {
    /// Interpret an already-parsed JSON value as an annotation record.
    ///
    /// The value must be a JSON object; its fields are read leniently.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CoreError> {
        if !value.is_object() {
            return Err(CoreError::Validation(format!(
                "annotation must be a JSON object, got {}",
                json_kind(value)
            )));
        }
        Self::deserialize(value)
            .map_err(|e| CoreError::Validation(format!("malformed annotation: {e}")))
    }

    /// Parse an annotation record from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| CoreError::Validation(format!("invalid JSON: {e}")))?;
        Self::from_value(&value)
    }

    /// Like [`from_value`](Self::from_value), but every field that is
    /// present must already have the documented type: string lists,
    /// objects for `instances` and `context`, and string (or `null`)
    /// context values.
    pub fn from_value_strict(value: &serde_json::Value) -> Result<Self, CoreError> {
        if !value.is_object() {
            return Self::from_value(value);
        }
        StrictRecord::deserialize(value)
            .map_err(|e| CoreError::Validation(format!("malformed annotation: {e}")))?;
        Self::from_value(value)
    }
}

/// Shape check used by [`AnnotationRecord::from_value_strict`].
#[derive(Deserialize)]
#[allow(dead_code)]
struct StrictRecord {
    keywords: Option<Vec<String>>,
    instances: Option<StrictInstances>,
    context: Option<StrictContext>,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct StrictInstances {
    single: Option<Vec<String>>,
    few: Option<Vec<String>>,
    many: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct StrictContext {
    time: Option<String>,
    location: Option<String>,
    action: Option<String>,
    object: Option<String>,
}

// ---------------------------------------------------------------------------
// Persistence helpers
// ---------------------------------------------------------------------------

/// Serialize a JSON value with four-space indentation.
pub fn to_pretty_json(value: &serde_json::Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}

/// Output file name for the annotation of an image with the given stem.
pub fn annotation_file_name(stem: &str) -> String {
    format!("{stem}.{ANNOTATION_EXTENSION}")
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn lenient_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => unknown(),
    })
}

fn lenient_labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => T::deserialize(value).map_err(serde::de::Error::custom),
        _ => Ok(T::default()),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_record_parses() {
        let value = json!({
            "keywords": ["sky", "tree"],
            "instances": {"single": ["tree"], "few": ["clouds"], "many": ["rocks"]},
            "context": {
                "time": "evening",
                "location": "forest",
                "object": "campfire",
                "action": "burning"
            }
        });
        let record = AnnotationRecord::from_value(&value).unwrap();
        assert_eq!(record.keywords, vec!["sky", "tree"]);
        assert_eq!(record.instances.few, vec!["clouds"]);
        assert_eq!(record.context.object, "campfire");
        assert_eq!(record.context.action, "burning");
    }

    #[test]
    fn empty_object_defaults_everything() {
        let record = AnnotationRecord::from_json_str("{}").unwrap();
        assert!(record.keywords.is_empty());
        assert_eq!(record.instances, Instances::default());
        assert_eq!(record.context.time, UNKNOWN);
        assert_eq!(record.context.location, UNKNOWN);
        assert_eq!(record.context.action, UNKNOWN);
        assert_eq!(record.context.object, UNKNOWN);
    }

    #[test]
    fn partial_context_fills_unknown() {
        let record =
            AnnotationRecord::from_json_str(r#"{"context": {"time": "night"}}"#).unwrap();
        assert_eq!(record.context.time, "night");
        assert_eq!(record.context.location, UNKNOWN);
    }

    #[test]
    fn null_fields_are_treated_as_missing() {
        let record = AnnotationRecord::from_json_str(
            r#"{"keywords": null, "instances": {"few": null}, "context": {"time": null}}"#,
        )
        .unwrap();
        assert!(record.keywords.is_empty());
        assert!(record.instances.few.is_empty());
        assert_eq!(record.context.time, UNKNOWN);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let record =
            AnnotationRecord::from_json_str(r#"{"keywords": ["a"], "caption": "x"}"#).unwrap();
        assert_eq!(record.keywords, vec!["a"]);
    }

    #[test]
    fn non_object_rejected() {
        let err = AnnotationRecord::from_value(&json!(["sky"])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn wrongly_typed_fields_degrade() {
        let record = AnnotationRecord::from_json_str(
            r#"{
                "keywords": ["sky", null, 3, "tree"],
                "instances": {"single": "tree", "few": [{"name": "cloud"}, "birds"]},
                "context": {"time": 7, "location": ["beach"], "action": true, "object": {}}
            }"#,
        )
        .unwrap();
        assert_eq!(record.keywords, vec!["sky", "tree"]);
        assert!(record.instances.single.is_empty());
        assert_eq!(record.instances.few, vec!["birds"]);
        assert_eq!(record.context.time, "7");
        assert_eq!(record.context.location, UNKNOWN);
        assert_eq!(record.context.action, "true");
        assert_eq!(record.context.object, UNKNOWN);
    }

    #[test]
    fn non_object_sections_are_treated_as_missing() {
        let record = AnnotationRecord::from_json_str(
            r#"{"keywords": "sky, tree", "instances": [], "context": "night"}"#,
        )
        .unwrap();
        assert!(record.keywords.is_empty());
        assert_eq!(record.instances, Instances::default());
        assert_eq!(record.context, Context::default());
    }

    #[test]
    fn strict_parse_rejects_wrong_types() {
        for bad in [
            json!({"keywords": "sky, tree"}),
            json!({"keywords": ["sky", null]}),
            json!({"instances": {"few": "clouds"}}),
            json!({"context": {"time": 7}}),
            json!({"context": "night"}),
        ] {
            let err = AnnotationRecord::from_value_strict(&bad).unwrap_err();
            assert!(err.to_string().contains("malformed annotation"), "{bad}");
        }
    }

    #[test]
    fn strict_parse_accepts_documented_shape() {
        let record = AnnotationRecord::from_value_strict(&json!({
            "keywords": ["sky"],
            "instances": {"few": ["clouds"]},
            "context": {"time": null, "location": "forest"},
            "caption": "extra fields are fine"
        }))
        .unwrap();
        assert_eq!(record.context.time, UNKNOWN);
        assert_eq!(record.context.location, "forest");
        assert!(AnnotationRecord::from_value_strict(&json!(["sky"])).is_err());
    }

    #[test]
    fn invalid_json_rejected() {
        let err = AnnotationRecord::from_json_str("{not json").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn pretty_json_uses_four_space_indent() {
        let bytes = to_pretty_json(&json!({"keywords": ["sky"]})).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "{\n    \"keywords\": [\n        \"sky\"\n    ]\n}\n");
    }

    #[test]
    fn annotation_file_name_appends_extension() {
        assert_eq!(annotation_file_name("IMG_0001"), "IMG_0001.json");
    }
}
