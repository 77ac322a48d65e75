//! # Error Module
//!
//! Library-level error types for the research pipeline.
//!
//! Every stage has its own error so the presentation layer can tell the user
//! exactly which step failed and show the model output that caused it:
//!
//! - [`AgentInvocationError`]: the model or a tool call inside the agent loop failed
//! - [`ExtractionError`]: the agent answered, but not with a usable research object
//! - [`PersistenceError`]: the result is valid but could not be written to the log
//! - [`ResearchError`]: the top-level error returned by the shared service

use thiserror::Error;

use crate::tools::ToolError;

/// Boxed cause carried by errors that wrap a foreign failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// AGENT ERRORS
// =============================================================================
/// The external agent loop failed before producing any output.
///
/// The original cause is kept as the error source so callers can walk the
/// chain (`anyhow` prints it with `{:#}`).
#[derive(Error, Debug)]
#[error("agent invocation failed: {source}")]
pub struct AgentInvocationError {
    #[source]
    source: BoxError,
}

impl AgentInvocationError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Convenience for failures that only have a message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new(message)
    }
}

// =============================================================================
// SCHEMA ERRORS
// =============================================================================
/// A candidate object did not satisfy the research result schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaValidationError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
}

// =============================================================================
// EXTRACTION ERRORS
// =============================================================================
/// Turning raw agent output into a [`ResearchResult`](crate::ResearchResult) failed.
///
/// Each variant carries enough of the model output to diagnose the failure.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("unsupported agent output shape: {kind}")]
    UnsupportedOutputShape { kind: &'static str },

    #[error("no JSON object found in agent output")]
    NoJsonFound { raw: String },

    #[error("malformed content block: {reason}")]
    MalformedBlock { reason: String, raw: String },

    #[error("agent output is not valid JSON: {source}")]
    JsonSyntax {
        candidate: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("agent output does not match the research schema: {0}")]
    SchemaValidation(#[from] SchemaValidationError),
}

impl ExtractionError {
    /// The model output (or the offending part of it) attached to this error.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            ExtractionError::NoJsonFound { raw } => Some(raw),
            ExtractionError::MalformedBlock { raw, .. } => Some(raw),
            ExtractionError::JsonSyntax { candidate, .. } => Some(candidate),
            ExtractionError::UnsupportedOutputShape { .. }
            | ExtractionError::SchemaValidation(_) => None,
        }
    }
}

// =============================================================================
// PERSISTENCE ERRORS
// =============================================================================
/// The save tool refused or failed to append the research block.
#[derive(Error, Debug)]
#[error("failed to persist research result: {0}")]
pub struct PersistenceError(#[source] pub ToolError);

// =============================================================================
// EXPORT ERRORS
// =============================================================================
/// Re-importing an exported document failed.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("invalid JSON export: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid Markdown export: {0}")]
    Markdown(String),

    #[error(transparent)]
    Schema(#[from] SchemaValidationError),
}

// =============================================================================
// TOP-LEVEL ERRORS
// =============================================================================
/// Errors returned by [`ResearchService`](crate::ResearchService).
///
/// Persistence failures are deliberately absent: they are reported next to a
/// valid result in [`ResearchOutcome`](crate::ResearchOutcome).
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("invalid research query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Agent(#[from] AgentInvocationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Configuration could not be loaded or is out of range.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} has an invalid value `{value}`: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Invalid(String),

    #[error("failed to set up research tools: {0}")]
    Tools(#[from] ToolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let err = AgentInvocationError::new(io);

        assert!(err.to_string().contains("connection refused"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_extraction_diagnostics() {
        let err = ExtractionError::NoJsonFound {
            raw: "no json here".to_string(),
        };
        assert_eq!(err.diagnostic(), Some("no json here"));

        let err = ExtractionError::SchemaValidation(SchemaValidationError::MissingField("topic"));
        assert_eq!(err.diagnostic(), None);
        assert!(err.to_string().contains("`topic`"));
    }
}
