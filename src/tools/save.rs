//! # Save Tool
//!
//! Appends research blocks to a plain-text log. Every call adds a new,
//! timestamped entry; existing content is never overwritten.

use async_trait::async_trait;
use chrono::Local;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::{TextTool, ToolError};

/// Persist-to-file tool backed by an append-only log.
#[derive(Debug, Clone)]
pub struct SaveTool {
    path: PathBuf,
}

impl SaveTool {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and return a confirmation message.
    pub async fn save(&self, data: &str) -> Result<String, ToolError> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let entry = format!("--- Research Output ---\nTimestamp: {timestamp}\n\n{data}\n\n");

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;

        info!(path = %self.path.display(), bytes = entry.len(), "Research output saved");

        Ok(format!("Data successfully saved to {}", self.path.display()))
    }
}

#[async_trait]
impl TextTool for SaveTool {
    fn name(&self) -> &'static str {
        <Self as Tool>::NAME
    }

    fn description(&self) -> &'static str {
        "Saves structured research data to a text file"
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        self.save(input).await
    }
}

/// Input arguments for the save tool.
#[derive(Debug, Deserialize, Serialize)]
pub struct SaveArgs {
    /// The text to append to the research log
    pub data: String,
}

impl Tool for SaveTool {
    const NAME: &'static str = "save_text_to_file";

    type Args = SaveArgs;
    type Output = String;
    type Error = ToolError;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: TextTool::description(self).to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "data": {
                        "type": "string",
                        "description": "The research text to save"
                    }
                },
                "required": ["data"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.save(&args.data).await
    }
}
