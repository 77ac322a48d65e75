//! # Agent Module
//!
//! This module drives the research agent using the Rig framework.
//! It demonstrates:
//! - Rig's agent builder pattern
//! - Tool integration for agentic workflows
//! - A trait seam ([`AgentBackend`]) so the model can be swapped for a test double
//!
//! The agent loop itself (which tools to call, how often, in what order) is
//! Rig's business. This module only assembles the prompt, hands over the
//! tools, and returns the final answer untouched.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rig::client::{CompletionClient, Nothing};
use rig::completion::Prompt;
use rig::message::Message;
use rig::providers::{gemini, ollama};
use tracing::{debug, info};

use crate::config::{Config, LlmProvider};
use crate::error::{AgentInvocationError, ConfigError, ResearchError};
use crate::extract::RawAgentOutput;
use crate::schema::ResearchResult;
use crate::tools::ToolRegistry;

// =============================================================================
// SYSTEM PROMPT
// =============================================================================
/// Role statement and directives; the format contract is appended at runtime.
const RESEARCH_SYSTEM_PROMPT: &str = "\
You are a research assistant that will help generate a research paper.
Answer the user query and use only the tools that are necessary.
Wrap the output in this format and provide no other text";

/// The full system instruction: role, directives, format contract.
pub fn system_prompt() -> String {
    format!(
        "{}\n{}",
        RESEARCH_SYSTEM_PROMPT,
        ResearchResult::format_instructions()
    )
}

// =============================================================================
// QUERY & PROMPT TYPES
// =============================================================================
/// A single research topic submitted by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchQuery(String);

impl ResearchQuery {
    /// Trim the topic and reject empty input.
    pub fn new(topic: impl AsRef<str>) -> Result<Self, ResearchError> {
        let topic = topic.as_ref().trim();
        if topic.is_empty() {
            return Err(ResearchError::InvalidQuery(
                "Please enter a research topic".to_string(),
            ));
        }
        Ok(Self(topic.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message of prior conversation or tool-call scratch work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    User(String),
    Assistant(String),
}

impl Turn {
    fn to_message(&self) -> Message {
        match self {
            Turn::User(text) => Message::user(text.as_str()),
            Turn::Assistant(text) => Message::assistant(text.as_str()),
        }
    }
}

/// Everything sent to the model for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub system: String,
    /// Prior conversation turns (empty for a single-shot query)
    pub history: Vec<Turn>,
    /// The user's topic
    pub query: String,
    /// Intermediate tool-call turns (empty for a single-shot query)
    pub scratchpad: Vec<Turn>,
}

// =============================================================================
// AGENT BACKEND
// =============================================================================
/// The external tool-calling agent, seen from the outside.
///
/// # Rust Concept: Trait Objects for Substitution
///
/// The pipeline stores an `Arc<dyn AgentBackend>`, so production code uses
/// [`RigBackend`] while tests plug in a backend returning canned output.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn run(
        &self,
        prompt: &PromptContext,
        tools: &ToolRegistry,
    ) -> Result<RawAgentOutput, AgentInvocationError>;
}

/// Rig client for the configured provider.
enum ProviderClient {
    Gemini(gemini::Client),
    Ollama(ollama::Client),
}

/// [`AgentBackend`] running Rig's multi-turn tool-calling agent.
pub struct RigBackend {
    client: ProviderClient,
    provider: LlmProvider,
    model: String,
    temperature: f64,
    max_turns: usize,
}

impl fmt::Debug for RigBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigBackend")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_turns", &self.max_turns)
            .finish()
    }
}

impl RigBackend {
    /// Build the provider client from explicit configuration values.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let client = match config.provider {
            LlmProvider::Gemini => {
                let api_key = config.api_key.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("GOOGLE_API_KEY is required for the gemini provider".to_string())
                })?;
                let client = gemini::Client::new(api_key)
                    .map_err(|e| ConfigError::Invalid(format!("failed to create Gemini client: {e}")))?;
                ProviderClient::Gemini(client)
            }
            LlmProvider::Ollama => {
                let client = ollama::Client::builder()
                    .api_key(Nothing)
                    .base_url(&config.ollama_host)
                    .build()
                    .map_err(|e| ConfigError::Invalid(format!("failed to create Ollama client: {e}")))?;
                ProviderClient::Ollama(client)
            }
        };

        debug!(provider = %config.provider, model = %config.model, "Model client created");

        Ok(Self {
            client,
            provider: config.provider,
            model: config.model.clone(),
            temperature: f64::from(config.temperature),
            max_turns: config.max_turns,
        })
    }
}

#[async_trait]
impl AgentBackend for RigBackend {
    async fn run(
        &self,
        prompt: &PromptContext,
        tools: &ToolRegistry,
    ) -> Result<RawAgentOutput, AgentInvocationError> {
        let mut history: Vec<Message> = prompt
            .history
            .iter()
            .chain(prompt.scratchpad.iter())
            .map(Turn::to_message)
            .collect();

        // Both arms build the same agent; the client types differ per provider.
        let response = match &self.client {
            ProviderClient::Gemini(client) => {
                let agent = client
                    .agent(&self.model)
                    .preamble(&prompt.system)
                    .temperature(self.temperature)
                    .tool(tools.search.clone())
                    .tool(tools.wikipedia.clone())
                    .tool(tools.save.clone())
                    .build();

                agent
                    .prompt(prompt.query.as_str())
                    .with_history(&mut history)
                    .multi_turn(self.max_turns)
                    .await
            }
            ProviderClient::Ollama(client) => {
                let agent = client
                    .agent(&self.model)
                    .preamble(&prompt.system)
                    .temperature(self.temperature)
                    .tool(tools.search.clone())
                    .tool(tools.wikipedia.clone())
                    .tool(tools.save.clone())
                    .build();

                agent
                    .prompt(prompt.query.as_str())
                    .with_history(&mut history)
                    .multi_turn(self.max_turns)
                    .await
            }
        };

        response
            .map(RawAgentOutput::PlainText)
            .map_err(AgentInvocationError::new)
    }
}

// =============================================================================
// AGENT PIPELINE
// =============================================================================
/// Prompt assembly plus a single, non-retried call into the agent backend.
#[derive(Clone)]
pub struct AgentPipeline {
    backend: Arc<dyn AgentBackend>,
    tools: ToolRegistry,
    history: Vec<Turn>,
}

impl AgentPipeline {
    pub fn new(backend: Arc<dyn AgentBackend>, tools: ToolRegistry) -> Self {
        Self {
            backend,
            tools,
            history: Vec::new(),
        }
    }

    /// Carry prior conversation turns into every prompt.
    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Assemble the prompt for one query.
    pub fn build_prompt(&self, query: &ResearchQuery) -> PromptContext {
        PromptContext {
            system: system_prompt(),
            history: self.history.clone(),
            query: query.as_str().to_string(),
            scratchpad: Vec::new(),
        }
    }

    /// Run the agent for `query` and return its final output verbatim.
    pub async fn run(&self, query: &ResearchQuery) -> Result<RawAgentOutput, AgentInvocationError> {
        let prompt = self.build_prompt(query);

        info!(
            topic = %query,
            tools = ?self.tools.names(),
            history = prompt.history.len(),
            "Invoking research agent"
        );

        let output = self.backend.run(&prompt, &self.tools).await?;

        debug!(output = %output.to_display_string(), "Agent returned");
        Ok(output)
    }
}
