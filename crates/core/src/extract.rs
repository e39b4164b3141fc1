//! Locate the JSON object inside a free-form oracle reply.
//!
//! Models often wrap their answer in markdown code fences or add a
//! sentence before or after it. [`extract_json_object`] tries every `{`
//! in the text, left to right, and returns the first one that starts a
//! complete, parseable JSON object. Anything after the object is ignored.

use serde_json::{Map, Value};

/// Errors produced while extracting JSON from a reply.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The text contains no `{` at all.
    #[error("response contains no JSON object")]
    NoJsonObject,

    /// At least one `{` was found but none started a valid object.
    #[error("response contains malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Return the first valid JSON object embedded in `text`.
pub fn extract_json_object(text: &str) -> Result<Value, ExtractError> {
    let mut first_error: Option<serde_json::Error> = None;

    for (start, _) in text.match_indices('{') {
        let mut stream =
            serde_json::Deserializer::from_str(&text[start..]).into_iter::<Map<String, Value>>();
        match stream.next() {
            Some(Ok(object)) => return Ok(Value::Object(object)),
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }

    match first_error {
        Some(e) => Err(ExtractError::Malformed(e)),
        None => Err(ExtractError::NoJsonObject),
    }
}
