//! # Web Search Tool
//!
//! DuckDuckGo web search for the research agent.
//! It demonstrates several important Rust and async patterns:
//! - Trait implementation (Rig's Tool trait and our own TextTool)
//! - Async/await for non-blocking I/O
//! - Serde for JSON serialization/deserialization

use async_trait::async_trait;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{http_client, TextTool, ToolError};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

/// Politeness delay before each request to the search provider.
const REQUEST_DELAY: Duration = Duration::from_millis(500);

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// =============================================================================
// SEARCH RESULT STRUCT
// =============================================================================
/// Represents a single search result from the web.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The title of the search result
    pub title: String,

    /// The URL of the result
    pub url: String,

    /// A snippet/description of the content
    pub snippet: String,
}

// =============================================================================
// WEB SEARCH TOOL
// =============================================================================
/// The web search tool that uses DuckDuckGo for free searches.
///
/// # Rust Concept: Struct with Private Fields
///
/// By not making fields `pub`, we encapsulate the implementation.
/// Users can only create this through `new()` and use the public methods.
#[derive(Debug, Clone)]
pub struct WebSearchTool {
    /// Maximum results to return per search
    max_results: usize,

    base_url: String,

    client: reqwest::Client,

    delay: Duration,
}

impl WebSearchTool {
    /// Create a new WebSearchTool with the specified max results.
    pub fn new(max_results: usize) -> Result<Self, ToolError> {
        Ok(Self {
            max_results,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: http_client(USER_AGENT)?,
            delay: REQUEST_DELAY,
        })
    }

    /// Point the tool at a different host (used by tests with a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.delay = Duration::ZERO;
        self
    }

    /// Perform a web search using DuckDuckGo.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ToolError> {
        info!(query = %query, "Performing web search");

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let url = format!(
            "{}/html/?q={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(query)
        );

        debug!(url = %url, "Fetching search results");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(ToolError::RateLimited);
            }
            return Err(ToolError::SearchFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let results = self.parse_html(&body);

        if results.is_empty() {
            warn!(query = %query, "No search results found");
        } else {
            info!(query = %query, count = results.len(), "Search completed");
        }

        Ok(results)
    }

    /// Parse DuckDuckGo HTML to extract results.
    /// Uses multiple strategies to handle different HTML formats.
    fn parse_html(&self, html: &str) -> Vec<SearchResult> {
        let mut collector = Collector::new(self.max_results);

        // Strategy 1: result links with the uddg parameter (redirect URLs)
        for segment in html.split("uddg=").skip(1) {
            if collector.is_full() {
                break;
            }

            if let Some(end) = segment.find(['&', '"', '\'']) {
                if let Ok(url) = urlencoding::decode(&segment[..end]) {
                    if url.starts_with("http") && !url.contains("duckduckgo.com") {
                        collector.push(url.into_owned(), "Search result from DuckDuckGo");
                    }
                }
            }
        }

        // Strategy 2: the result__url class which contains visible URLs
        for segment in html.split("result__url").skip(1) {
            if collector.is_full() {
                break;
            }

            let Some(href_start) = segment.find("href=\"") else {
                continue;
            };
            let after_href = &segment[href_start + 6..];
            let Some(href_end) = after_href.find('"') else {
                continue;
            };
            let href = &after_href[..href_end];
            let url = if let Some(rest) = href.strip_prefix("//") {
                format!("https://{}", rest)
            } else if href.starts_with("http") {
                href.to_string()
            } else {
                continue;
            };

            if !url.contains("duckduckgo.com") {
                collector.push(url, "Search result");
            }
        }

        // Strategy 3: any bare https:// URL that does not look like an asset
        for segment in html.split("https://").skip(1) {
            if collector.is_full() {
                break;
            }

            let Some(end) =
                segment.find(|c: char| matches!(c, '"' | '\'' | '<' | '>' | ' ' | ')'))
            else {
                continue;
            };
            let domain_path = &segment[..end];
            if is_content_url(domain_path) {
                collector.push(format!("https://{}", domain_path), "Search result");
            }
        }

        collector.results
    }
}

fn is_content_url(domain_path: &str) -> bool {
    const SKIPPED: [&str; 5] = ["cdn.", ".js", ".css", ".png", ".ico"];

    !domain_path.starts_with("duckduckgo")
        && !domain_path.starts_with("improving.duckduckgo")
        && !SKIPPED.iter().any(|s| domain_path.contains(s))
        && domain_path.contains('.')
        && domain_path.len() > 5
}

/// Deduplicating, capped result accumulator shared by the parse strategies.
struct Collector {
    max: usize,
    seen: HashSet<String>,
    results: Vec<SearchResult>,
}

impl Collector {
    fn new(max: usize) -> Self {
        Self {
            max,
            seen: HashSet::new(),
            results: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.results.len() >= self.max
    }

    fn push(&mut self, url: String, snippet: &str) {
        if self.is_full() || !self.seen.insert(url.clone()) {
            return;
        }
        self.results.push(SearchResult {
            title: extract_domain(&url).unwrap_or_else(|| "Result".to_string()),
            url,
            snippet: snippet.to_string(),
        });
    }
}

/// Extract the domain name from a URL.
fn extract_domain(url: &str) -> Option<String> {
    url.split("//")
        .nth(1)?
        .split('/')
        .next()
        .map(|s| s.to_string())
}

fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for: {}", query);
    }

    let formatted = results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. **{}**\n   URL: {}\n   {}\n", i + 1, r.title, r.url, r.snippet))
        .collect::<Vec<_>>()
        .join("\n");

    format!("## Search Results for: {}\n\n{}", query, formatted)
}

#[async_trait]
impl TextTool for WebSearchTool {
    fn name(&self) -> &'static str {
        <Self as Tool>::NAME
    }

    fn description(&self) -> &'static str {
        "Search the web for information"
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let results = self.search(input).await?;
        Ok(format_results(input, &results))
    }
}

// =============================================================================
// RIG TOOL TRAIT IMPLEMENTATION
// =============================================================================
/// Input arguments for the search tool.
#[derive(Debug, Deserialize, Serialize)]
pub struct SearchArgs {
    /// The search query to execute
    pub query: String,
}

impl Tool for WebSearchTool {
    const NAME: &'static str = "search";

    type Args = SearchArgs;
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
                        "description": "The search query to find information about"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let results = self.search(&args.query).await?;
        Ok(format_results(&args.query, &results))
    }
}
