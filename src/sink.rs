//! # Sink Module
//!
//! Renders a validated result as the plain-text block of the research log
//! and hands it to the save tool.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::PersistenceError;
use crate::schema::ResearchResult;
use crate::tools::TextTool;

/// What the save tool received and what it answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    /// The rendered block forwarded to the tool
    pub text: String,
    /// The tool's confirmation, kept as-is
    pub confirmation: String,
}

/// Plain-text block appended to the research log.
pub fn render_text(result: &ResearchResult) -> String {
    format!(
        "\nResearch Topic: {}\n\nSUMMARY:\n{}\n\nSOURCES:\n{}\n\nTOOLS USED:\n{}\n",
        result.topic(),
        result.summary(),
        result.sources().join(", "),
        result.tools_used().join(", ")
    )
}

/// Forwards rendered results to the persist-to-file tool.
#[derive(Clone)]
pub struct ResultSink {
    save_tool: Arc<dyn TextTool>,
}

impl ResultSink {
    pub fn new(save_tool: Arc<dyn TextTool>) -> Self {
        Self { save_tool }
    }

    /// Render `result` and append it to the log. No retry on failure.
    pub async fn persist(&self, result: &ResearchResult) -> Result<PersistedRecord, PersistenceError> {
        let text = render_text(result);

        match self.save_tool.invoke(&text).await {
            Ok(confirmation) => {
                info!(topic = %result.topic(), tool = self.save_tool.name(), "Research result persisted");
                Ok(PersistedRecord { text, confirmation })
            }
            Err(e) => {
                warn!(topic = %result.topic(), error = %e, "Failed to persist research result");
                Err(PersistenceError(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{SaveTool, ToolError};
    use async_trait::async_trait;

    struct BrokenDisk;

    #[async_trait]
    impl TextTool for BrokenDisk {
        fn name(&self) -> &'static str {
            "save_text_to_file"
        }

        fn description(&self) -> &'static str {
            "always fails"
        }

        async fn invoke(&self, _input: &str) -> Result<String, ToolError> {
            Err(ToolError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only file system",
            )))
        }
    }

    fn result() -> ResearchResult {
        ResearchResult::new(
            "Mars colonization",
            "Brief overview.",
            vec!["nasa.gov".to_string(), "esa.int".to_string()],
            vec!["search".to_string(), "wikipedia".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&result());
        assert!(text.contains("Research Topic: Mars colonization"));
        assert!(text.contains("SUMMARY:\nBrief overview."));
        assert!(text.contains("SOURCES:\nnasa.gov, esa.int"));
        assert!(text.contains("TOOLS USED:\nsearch, wikipedia"));
    }

    #[tokio::test]
    async fn test_persist_appends_through_save_tool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("research_output.txt");
        let sink = ResultSink::new(Arc::new(SaveTool::new(&path)));

        let record = sink.persist(&result()).await.unwrap();

        assert!(record.confirmation.contains("research_output.txt"));
        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains(&record.text));
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported() {
        let sink = ResultSink::new(Arc::new(BrokenDisk));
        let err = sink.persist(&result()).await.unwrap_err();
        assert!(err.to_string().contains("read-only file system"));
    }
}
