//! # Wikipedia Tool
//!
//! Encyclopedia lookup through the MediaWiki action API: search for the best
//! matching page, then fetch its plain-text introduction.

use async_trait::async_trait;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{http_client, TextTool, ToolError};

const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const NO_RESULT: &str = "No good Wikipedia Search Result was found";

/// Wikipedia lookup returning the top page's summary.
#[derive(Debug, Clone)]
pub struct WikipediaTool {
    /// Summaries are cut to this many characters
    max_chars: usize,
    base_url: String,
    client: reqwest::Client,
}

// MediaWiki `formatversion=2` response shapes, only the parts we read.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: ExtractQuery,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    extract: Option<String>,
}

impl WikipediaTool {
    pub fn new(max_chars: usize) -> Result<Self, ToolError> {
        Ok(Self {
            max_chars,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: http_client(USER_AGENT)?,
        })
    }

    /// Point the tool at a different host (used by tests with a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_url(&self) -> String {
        format!("{}/w/api.php", self.base_url.trim_end_matches('/'))
    }

    /// Look up `query` and return `Page: …\nSummary: …`, or a no-result notice.
    pub async fn lookup(&self, query: &str) -> Result<String, ToolError> {
        info!(query = %query, "Looking up Wikipedia");

        let Some(title) = self.top_title(query).await? else {
            return Ok(NO_RESULT.to_string());
        };

        debug!(title = %title, "Fetching Wikipedia extract");

        let response: ExtractResponse = self
            .client
            .get(self.api_url())
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("format", "json"),
                ("formatversion", "2"),
                ("titles", title.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(page) = response.query.pages.into_iter().next() else {
            return Ok(NO_RESULT.to_string());
        };
        let extract = page.extract.unwrap_or_default();

        Ok(format!(
            "Page: {}\nSummary: {}",
            page.title,
            truncate_chars(extract.trim(), self.max_chars)
        ))
    }

    async fn top_title(&self, query: &str) -> Result<Option<String>, ToolError> {
        let response = self
            .client
            .get(self.api_url())
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srlimit", "1"),
                ("format", "json"),
                ("formatversion", "2"),
                ("srsearch", query),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::Wikipedia(format!("HTTP {}", response.status())));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.query.search.into_iter().next().map(|hit| hit.title))
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl TextTool for WikipediaTool {
    fn name(&self) -> &'static str {
        <Self as Tool>::NAME
    }

    fn description(&self) -> &'static str {
        "Look up a topic on Wikipedia and return the summary of the best matching page"
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        self.lookup(input).await
    }
}

/// Input arguments for the Wikipedia tool.
#[derive(Debug, Deserialize, Serialize)]
pub struct WikipediaArgs {
    pub query: String,
}

impl Tool for WikipediaTool {
    const NAME: &'static str = "wikipedia";

    type Args = WikipediaArgs;
    type Output = String;
    type Error = ToolError;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: TextTool::description(self).to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The topic or page title to look up"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.lookup(&args.query).await
    }
}
