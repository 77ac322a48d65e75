//! # Extraction Module
//!
//! Turns whatever the agent answered into a validated [`ResearchResult`].
//!
//! Models do not always follow the "no other text" instruction. Observed
//! answers include:
//!
//! - a bare JSON object
//! - a JSON object wrapped in prose (`Here is the result: {...} Hope this helps!`)
//! - a list of content blocks whose first block's `text` is the object
//!
//! The extractor accepts all of these, tries exactly once, and otherwise
//! fails with a typed [`ExtractionError`] carrying the offending text.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::schema::{json_kind, ResearchResult};

// =============================================================================
// RAW AGENT OUTPUT
// =============================================================================
/// The unmodified final answer of the agent loop.
///
/// # Rust Concept: Tagged Enums Instead of Runtime Type Checks
///
/// Each supported shape is its own variant, so extraction is a plain `match`
/// and the compiler checks that every shape is handled.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAgentOutput {
    /// Free text, possibly with a JSON object embedded in prose.
    PlainText(String),

    /// Ordered content blocks; the first one carries the answer in `text`.
    Blocks(Vec<Value>),
}

impl RawAgentOutput {
    /// Classify an arbitrary JSON value as one of the supported shapes.
    pub fn from_value(value: Value) -> Result<Self, ExtractionError> {
        match value {
            Value::String(text) => Ok(RawAgentOutput::PlainText(text)),
            Value::Array(blocks) => Ok(RawAgentOutput::Blocks(blocks)),
            other => Err(ExtractionError::UnsupportedOutputShape {
                kind: json_kind(&other),
            }),
        }
    }

    /// Human-readable rendering for diagnostics.
    pub fn to_display_string(&self) -> String {
        match self {
            RawAgentOutput::PlainText(text) => text.clone(),
            RawAgentOutput::Blocks(blocks) => Value::Array(blocks.clone()).to_string(),
        }
    }
}

impl From<String> for RawAgentOutput {
    fn from(text: String) -> Self {
        RawAgentOutput::PlainText(text)
    }
}

impl From<&str> for RawAgentOutput {
    fn from(text: &str) -> Self {
        RawAgentOutput::PlainText(text.to_string())
    }
}

// =============================================================================
// SCAN MODE
// =============================================================================
/// How a JSON candidate is located inside free text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMode {
    /// From the first `{` to the last `}` of the whole text.
    #[default]
    Outermost,

    /// The first complete object starting at the first `{`, tracking
    /// nesting and string literals. Stray braces in trailing prose are ignored.
    Balanced,
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outermost" => Ok(ScanMode::Outermost),
            "balanced" => Ok(ScanMode::Balanced),
            other => Err(format!("unknown scan mode `{other}` (expected outermost or balanced)")),
        }
    }
}

// =============================================================================
// RESPONSE EXTRACTOR
// =============================================================================
/// Locates, parses, and validates the research object in agent output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseExtractor {
    mode: ScanMode,
}

impl ResponseExtractor {
    pub fn new(mode: ScanMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Extract a research result from raw agent output.
    pub fn extract(&self, raw: &RawAgentOutput) -> Result<ResearchResult, ExtractionError> {
        let candidate = match raw {
            RawAgentOutput::PlainText(text) => self.locate(text)?,
            RawAgentOutput::Blocks(blocks) => first_block_text(blocks)?,
        };

        debug!(len = candidate.len(), "JSON candidate located");

        let value: Value =
            serde_json::from_str(candidate).map_err(|source| ExtractionError::JsonSyntax {
                candidate: candidate.to_string(),
                source,
            })?;

        ResearchResult::from_value(&value).map_err(|e| {
            warn!(error = %e, "Agent output failed schema validation");
            ExtractionError::SchemaValidation(e)
        })
    }

    /// Classify an untyped JSON value, then extract.
    pub fn extract_value(&self, raw: Value) -> Result<ResearchResult, ExtractionError> {
        self.extract(&RawAgentOutput::from_value(raw)?)
    }

    fn locate<'a>(&self, text: &'a str) -> Result<&'a str, ExtractionError> {
        let span = match self.mode {
            ScanMode::Outermost => outermost_span(text),
            ScanMode::Balanced => balanced_span(text),
        };

        span.ok_or_else(|| ExtractionError::NoJsonFound {
            raw: text.to_string(),
        })
    }
}

/// First `{` through last `}` inclusive.
fn outermost_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// The object opened by the first `{`, closed by its matching `}`.
fn balanced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn first_block_text(blocks: &[Value]) -> Result<&str, ExtractionError> {
    let malformed = |reason: &str| ExtractionError::MalformedBlock {
        reason: reason.to_string(),
        raw: Value::Array(blocks.to_vec()).to_string(),
    };

    let first = blocks
        .first()
        .ok_or_else(|| malformed("content block list is empty"))?;
    let block = first
        .as_object()
        .ok_or_else(|| malformed("first content block is not an object"))?;

    match block.get("text") {
        Some(Value::String(text)) => Ok(text.as_str()),
        Some(_) => Err(malformed("`text` of the first content block is not a string")),
        None => Err(malformed("first content block has no `text` field")),
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaValidationError;
    use serde_json::json;

    const MARS: &str = r#"{"topic": "Mars colonization", "summary": "Brief overview.", "sources": ["nasa.gov"], "tools_used": ["search"]}"#;

    fn extractor() -> ResponseExtractor {
        ResponseExtractor::default()
    }

    #[test]
    fn test_prose_wrapped_object() {
        let raw = RawAgentOutput::from(format!("Sure! {MARS}"));
        let result = extractor().extract(&raw).unwrap();

        assert_eq!(result.topic(), "Mars colonization");
        assert_eq!(result.summary(), "Brief overview.");
        assert_eq!(result.sources(), ["nasa.gov"]);
        assert_eq!(result.tools_used(), ["search"]);
    }

    #[test]
    fn test_prose_on_both_sides() {
        let raw = RawAgentOutput::from(format!("Here is the result:\n```json\n{MARS}\n```\nHope this helps."));
        assert!(extractor().extract(&raw).is_ok());
    }

    #[test]
    fn test_no_json() {
        let err = extractor().extract(&"no json here".into()).unwrap_err();
        match err {
            ExtractionError::NoJsonFound { raw } => assert_eq!(raw, "no json here"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_closing_or_reversed_braces() {
        for text in ["only { opening", "only } closing", "} backwards {"] {
            let err = extractor().extract(&text.into()).unwrap_err();
            assert!(matches!(err, ExtractionError::NoJsonFound { .. }), "{text}");
        }
    }

    #[test]
    fn test_block_path_matches_string_path() {
        let blocks = RawAgentOutput::Blocks(vec![json!({ "type": "text", "text": MARS })]);
        let from_blocks = extractor().extract(&blocks).unwrap();
        let from_text = extractor().extract(&MARS.into()).unwrap();
        assert_eq!(from_blocks, from_text);
    }

    #[test]
    fn test_block_missing_fields_is_schema_error() {
        let raw = extractor().extract_value(json!([{ "text": "{\"topic\":\"X\"}" }]));
        assert!(matches!(
            raw,
            Err(ExtractionError::SchemaValidation(SchemaValidationError::MissingField("summary")))
        ));
    }

    #[test]
    fn test_block_text_is_not_brace_scanned() {
        let raw = RawAgentOutput::Blocks(vec![json!({ "text": format!("Sure! {MARS}") })]);
        let err = extractor().extract(&raw).unwrap_err();
        assert!(matches!(err, ExtractionError::JsonSyntax { .. }));
    }

    #[test]
    fn test_malformed_blocks() {
        let cases = [
            json!([]),
            json!(["just a string"]),
            json!([{ "type": "text" }]),
            json!([{ "text": 7 }]),
        ];
        for case in cases {
            let err = extractor().extract_value(case.clone()).unwrap_err();
            assert!(
                matches!(err, ExtractionError::MalformedBlock { .. }),
                "{case} -> {err:?}"
            );
        }
    }

    #[test]
    fn test_unsupported_shapes() {
        for value in [json!(null), json!(42), json!({ "output": MARS }), json!(true)] {
            let err = extractor().extract_value(value).unwrap_err();
            assert!(matches!(err, ExtractionError::UnsupportedOutputShape { .. }));
        }
    }

    #[test]
    fn test_json_syntax_error_keeps_candidate() {
        let err = extractor()
            .extract(&"Result: {\"topic\": \"X\", } trailing".into())
            .unwrap_err();
        match err {
            ExtractionError::JsonSyntax { candidate, .. } => {
                assert_eq!(candidate, "{\"topic\": \"X\", }")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_type_is_schema_error() {
        let text = r#"{"topic": "X", "summary": "Y", "sources": "nasa.gov", "tools_used": []}"#;
        let err = extractor().extract(&text.into()).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::SchemaValidation(SchemaValidationError::WrongType { field: "sources", .. })
        ));
    }

    #[test]
    fn test_outermost_trips_on_stray_trailing_brace() {
        let text = format!("{MARS} (see appendix}})");
        let err = extractor().extract(&text.as_str().into()).unwrap_err();
        assert!(matches!(err, ExtractionError::JsonSyntax { .. }));
    }

    #[test]
    fn test_balanced_ignores_stray_trailing_brace() {
        let text = format!("Result: {MARS} (see appendix}})");
        let result = ResponseExtractor::new(ScanMode::Balanced)
            .extract(&text.as_str().into())
            .unwrap();
        assert_eq!(result.topic(), "Mars colonization");
    }

    #[test]
    fn test_balanced_handles_braces_inside_strings() {
        let text = r#"ok {"topic": "Sets {a, b}", "summary": "Uses \"}\" a lot", "sources": [], "tools_used": []} done"#;
        let result = ResponseExtractor::new(ScanMode::Balanced)
            .extract(&text.into())
            .unwrap();
        assert_eq!(result.topic(), "Sets {a, b}");
        assert_eq!(result.summary(), "Uses \"}\" a lot");
    }

    #[test]
    fn test_balanced_unterminated_object() {
        let err = ResponseExtractor::new(ScanMode::Balanced)
            .extract(&"{\"topic\": \"X\"".into())
            .unwrap_err();
        assert!(matches!(err, ExtractionError::NoJsonFound { .. }));
    }

    #[test]
    fn test_scan_mode_from_str() {
        assert_eq!("Balanced".parse::<ScanMode>(), Ok(ScanMode::Balanced));
        assert_eq!("outermost".parse::<ScanMode>(), Ok(ScanMode::Outermost));
        assert!("strict".parse::<ScanMode>().is_err());
    }
}
