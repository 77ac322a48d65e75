//! # Schema Module
//!
//! The typed contract every research answer must satisfy, plus the
//! "format contract" text that tells the model which JSON to emit.
//!
//! Validation is all-or-nothing: either every field is present and
//! well-typed, or no [`ResearchResult`] exists at all.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::SchemaValidationError;

// =============================================================================
// RESEARCH RESULT
// =============================================================================
/// A validated, structured research answer.
///
/// # Rust Concept: Private Fields for Invariants
///
/// The fields are private so the only ways to obtain a value are
/// [`ResearchResult::new`] and [`ResearchResult::from_value`], both of which
/// check the invariants. Callers get read-only accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ResearchResult {
    topic: String,
    summary: String,
    sources: Vec<String>,
    tools_used: Vec<String>,
}

const FIELD_TOPIC: &str = "topic";
const FIELD_SUMMARY: &str = "summary";
const FIELD_SOURCES: &str = "sources";
const FIELD_TOOLS_USED: &str = "tools_used";

impl ResearchResult {
    /// Build a result from already-typed parts.
    pub fn new(
        topic: impl Into<String>,
        summary: impl Into<String>,
        sources: Vec<String>,
        tools_used: Vec<String>,
    ) -> Result<Self, SchemaValidationError> {
        let topic = topic.into();
        let summary = summary.into();

        if topic.trim().is_empty() {
            return Err(SchemaValidationError::EmptyField(FIELD_TOPIC));
        }
        if summary.trim().is_empty() {
            return Err(SchemaValidationError::EmptyField(FIELD_SUMMARY));
        }

        Ok(Self {
            topic,
            summary,
            sources,
            tools_used,
        })
    }

    /// Validate a parsed JSON value against the schema.
    ///
    /// Unknown keys are ignored; every known key must be present and typed.
    pub fn from_value(value: &Value) -> Result<Self, SchemaValidationError> {
        let object = value
            .as_object()
            .ok_or_else(|| SchemaValidationError::NotAnObject(json_kind(value)))?;

        let topic = string_field(object, FIELD_TOPIC)?;
        let summary = string_field(object, FIELD_SUMMARY)?;
        let sources = string_list_field(object, FIELD_SOURCES)?;
        let tools_used = string_list_field(object, FIELD_TOOLS_USED)?;

        Self::new(topic, summary, sources, tools_used)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn tools_used(&self) -> &[String] {
        &self.tools_used
    }

    /// JSON Schema describing the object the model must produce.
    pub fn json_schema() -> Value {
        json!({
            "title": "ResearchResponse",
            "type": "object",
            "properties": {
                "topic": { "title": "Topic", "type": "string" },
                "summary": { "title": "Summary", "type": "string" },
                "sources": {
                    "title": "Sources",
                    "type": "array",
                    "items": { "type": "string" }
                },
                "tools_used": {
                    "title": "Tools Used",
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": [FIELD_TOPIC, FIELD_SUMMARY, FIELD_SOURCES, FIELD_TOOLS_USED]
        })
    }

    /// The format contract embedded in the system prompt.
    pub fn format_instructions() -> String {
        format!(
            "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\n\
             As an example, for the schema {{\"properties\": {{\"foo\": {{\"title\": \"Foo\", \"description\": \"a list of strings\", \"type\": \"array\", \"items\": {{\"type\": \"string\"}}}}}}, \"required\": [\"foo\"]}}\n\
             the object {{\"foo\": [\"bar\", \"baz\"]}} is a well-formatted instance of the schema. \
             The object {{\"properties\": {{\"foo\": [\"bar\", \"baz\"]}}}} is not well-formatted.\n\n\
             Here is the output schema:\n```\n{}\n```",
            Self::json_schema()
        )
    }
}

impl TryFrom<Value> for ResearchResult {
    type Error = SchemaValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

// =============================================================================
// FIELD HELPERS
// =============================================================================
fn string_field(object: &Map<String, Value>, field: &'static str) -> Result<String, SchemaValidationError> {
    match object.get(field) {
        None => Err(SchemaValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(SchemaValidationError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

fn string_list_field(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Vec<String>, SchemaValidationError> {
    let wrong_type = SchemaValidationError::WrongType {
        field,
        expected: "an array of strings",
    };

    let items = match object.get(field) {
        None => return Err(SchemaValidationError::MissingField(field)),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(wrong_type),
    };

    items
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(|| wrong_type.clone()))
        .collect()
}

/// Short name of a JSON value's type, for diagnostics.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
