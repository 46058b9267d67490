//! Generated-output parsing.
//!
//! The generator is asked for a JSON document shaped like
//! `{"title": .., "content": .., "keyExpressions": [{"expression": .., "meaning": ..}]}`.
//!
//! - empty, non-JSON, non-object, or title-and-content-less payloads are rejected
//! - a missing title or body becomes a sentinel string; a present but blank one is kept
//! - a missing or malformed annotation list becomes an empty list

use crate::constants::{fields, sentinels};
use crate::error::{GeneratorError, GeneratorResult};
use crate::models::{Annotation, GeneratedContent};
use serde_json::{Map, Value};
use tracing::warn;

/// Parse generator output into [`GeneratedContent`]
pub fn parse_generated_content(raw: &str) -> GeneratorResult<GeneratedContent> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(GeneratorError::malformed("generator returned an empty payload"));
    }

    let document: Value = serde_json::from_str(raw)
        .map_err(|e| GeneratorError::malformed(format!("payload is not JSON: {e}")))?;

    let Value::Object(object) = document else {
        return Err(GeneratorError::malformed("payload is not a JSON object"));
    };

    let title = string_field(&object, fields::TITLE);
    let body = string_field(&object, fields::BODY);
    if title.is_none() && body.is_none() {
        return Err(GeneratorError::malformed(
            "payload has neither a title nor content",
        ));
    }

    Ok(GeneratedContent {
        title: title.unwrap_or_else(|| sentinels::MISSING_TITLE.to_string()),
        body: body.unwrap_or_else(|| sentinels::MISSING_BODY.to_string()),
        annotations: annotations(&object),
    })
}

fn string_field(object: &Map<String, Value>, name: &str) -> Option<String> {
    object
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn annotations(object: &Map<String, Value>) -> Vec<Annotation> {
    let Some(value) = object.get(fields::ANNOTATIONS) else {
        return Vec::new();
    };

    let Some(items) = value.as_array() else {
        warn!(
            field = fields::ANNOTATIONS,
            "Annotation field is not an array; using no annotations"
        );
        return Vec::new();
    };

    // One bad entry discards the whole list
    match items.iter().map(annotation).collect::<Option<Vec<_>>>() {
        Some(annotations) => annotations,
        None => {
            warn!(
                field = fields::ANNOTATIONS,
                "Annotation list is malformed; using no annotations"
            );
            Vec::new()
        }
    }
}

fn annotation(item: &Value) -> Option<Annotation> {
    let term = item.get(fields::ANNOTATION_TERM)?.as_str()?;
    let note = item.get(fields::ANNOTATION_NOTE)?.as_str()?;
    Some(Annotation::new(term, note))
}
