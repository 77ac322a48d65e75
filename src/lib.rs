//! # Structured Research Agent
//!
//! A research assistant built on the Rig framework that asks a tool-calling
//! model for a fixed JSON report, then extracts and validates it.
//!
//! - [`agent`]: prompt assembly and the agent backend seam
//! - [`extract`]: locating and validating JSON in free-form model output
//! - [`schema`]: the research result contract
//! - [`sink`] / [`export`]: research log, Markdown and JSON documents
//! - [`service`]: the shared flow used by the CLI and the dashboard
//! - [`tools`]: web search, Wikipedia, and save-to-file

pub mod agent;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod extract;
pub mod schema;
pub mod service;
pub mod sink;
pub mod tools;

pub use agent::{AgentBackend, AgentPipeline, PromptContext, ResearchQuery, RigBackend, Turn};
pub use config::{Config, LlmProvider};
pub use error::{
    AgentInvocationError, ConfigError, ExportError, ExtractionError, PersistenceError,
    ResearchError, SchemaValidationError,
};
pub use export::{ExportFormat, ResearchStats};
pub use extract::{RawAgentOutput, ResponseExtractor, ScanMode};
pub use schema::ResearchResult;
pub use service::{ResearchOutcome, ResearchService};
pub use sink::{PersistedRecord, ResultSink};
pub use tools::{SaveTool, TextTool, ToolError, ToolRegistry, WebSearchTool, WikipediaTool};
