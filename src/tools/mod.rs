//! # Tools Module
//!
//! The three capabilities the research agent may call:
//!
//! | name                | tool               | what it does                          |
//! |---------------------|--------------------|---------------------------------------|
//! | `search`            | [`WebSearchTool`]  | DuckDuckGo web search                 |
//! | `wikipedia`         | [`WikipediaTool`]  | Wikipedia intro lookup                |
//! | `save_text_to_file` | [`SaveTool`]       | append a block to the research log    |
//!
//! Each tool exposes the same text-in/text-out contract ([`TextTool`]) and
//! also implements Rig's `Tool` trait so the agent can call it.

mod save;
mod search;
mod wikipedia;

pub use save::{SaveArgs, SaveTool};
pub use search::{SearchArgs, SearchResult, WebSearchTool};
pub use wikipedia::{WikipediaArgs, WikipediaTool};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Config;

// =============================================================================
// TOOL ERRORS
// =============================================================================
/// Errors raised by any of the research tools.
///
/// Note: Rig's `Tool` trait needs an error implementing `std::error::Error`,
/// which thiserror provides.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to perform web search: {0}")]
    SearchFailed(String),

    #[error("Rate limited by search provider, please wait")]
    RateLimited,

    #[error("Wikipedia lookup failed: {0}")]
    Wikipedia(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// HTTP client shared by the network tools: 30 second timeout and the given
/// User-Agent.
pub(crate) fn http_client(user_agent: &str) -> Result<reqwest::Client, ToolError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}

// =============================================================================
// TEXT TOOL CONTRACT
// =============================================================================
/// A named capability taking a text payload and returning text.
///
/// # Rust Concept: async-trait
///
/// `async fn` in traits is not object safe yet, so `#[async_trait]` boxes the
/// futures. That lets us store tools as `Arc<dyn TextTool>`.
#[async_trait]
pub trait TextTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn invoke(&self, input: &str) -> Result<String, ToolError>;
}

// =============================================================================
// TOOL REGISTRY
// =============================================================================
/// The fixed set of tools handed to the agent.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    pub(crate) search: WebSearchTool,
    pub(crate) wikipedia: WikipediaTool,
    pub(crate) save: SaveTool,
}

impl ToolRegistry {
    pub fn new(search: WebSearchTool, wikipedia: WikipediaTool, save: SaveTool) -> Self {
        Self {
            search,
            wikipedia,
            save,
        }
    }

    /// Build all three tools; fails only if an HTTP client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, ToolError> {
        Ok(Self::new(
            WebSearchTool::new(config.max_search_results)?,
            WikipediaTool::new(config.wiki_max_chars)?,
            SaveTool::new(&config.output_file),
        ))
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|tool| tool.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn TextTool> {
        self.iter().find(|tool| tool.name() == name)
    }

    /// Invoke a tool by name.
    pub async fn invoke(&self, name: &str, input: &str) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.invoke(input).await
    }

    /// The persist-to-file capability, shared with the result sink.
    pub fn save_tool(&self) -> Arc<dyn TextTool> {
        Arc::new(self.save.clone())
    }

    fn iter(&self) -> impl Iterator<Item = &dyn TextTool> {
        [
            &self.search as &dyn TextTool,
            &self.wikipedia as &dyn TextTool,
            &self.save as &dyn TextTool,
        ]
        .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(dir: &tempfile::TempDir) -> ToolRegistry {
        ToolRegistry::new(
            WebSearchTool::new(5).unwrap(),
            WikipediaTool::new(100).unwrap(),
            SaveTool::new(dir.path().join("log.txt")),
        )
    }

    #[test]
    fn test_registry_names() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            registry(&dir).names(),
            vec!["search", "wikipedia", "save_text_to_file"]
        );
    }

    #[test]
    fn test_registry_from_config_builds_http_clients() {
        let registry = ToolRegistry::from_config(&Config::default()).unwrap();
        assert_eq!(registry.names().len(), 3);
        assert!(http_client("research-agent/test").is_ok());
    }

    #[tokio::test]
    async fn test_registry_dispatches_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir);

        let confirmation = registry
            .invoke("save_text_to_file", "hello")
            .await
            .unwrap();
        assert!(confirmation.starts_with("Data successfully saved to"));

        let err = registry.invoke("calculator", "1+1").await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "calculator"));
    }
}
