//! # Configuration Module
//!
//! This module handles loading and managing configuration from environment variables.
//! It demonstrates several important Rust patterns:
//! - Structs with named fields
//! - The Default trait for sensible defaults
//! - Error handling with Result types
//!
//! The API key lives in [`Config`] and is handed to the agent backend
//! explicitly; nothing here writes back into the process environment.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::extract::ScanMode;

// =============================================================================
// LLM PROVIDER
// =============================================================================
/// Which model provider drives the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Google Gemini, authenticated with an API key.
    #[default]
    Gemini,
    /// A local Ollama server.
    Ollama,
}

impl LlmProvider {
    /// Default model for this provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini-1.5-flash",
            LlmProvider::Ollama => "llama3.2",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(format!("unknown provider `{other}` (expected gemini or ollama)")),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Gemini => f.write_str("gemini"),
            LlmProvider::Ollama => f.write_str("ollama"),
        }
    }
}

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Main configuration for the research agent.
///
/// # Rust Concept: Derive Macros
/// - Debug: Allows printing with {:?} format (the API key is redacted by hand below)
/// - Clone: Creates a deep copy of the struct
#[derive(Clone)]
pub struct Config {
    pub provider: LlmProvider,

    /// The model to use (e.g., "gemini-1.5-flash", "llama3.2")
    pub model: String,

    /// Gemini API key
    pub api_key: Option<String>,

    /// Ollama server URL (default: http://localhost:11434)
    pub ollama_host: String,

    /// Temperature for LLM responses (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Maximum number of search results returned by the search tool
    pub max_search_results: usize,

    /// Maximum characters of a Wikipedia summary
    pub wiki_max_chars: usize,

    /// Maximum tool-calling rounds per query
    pub max_turns: usize,

    /// Append-only research log written by the save tool
    pub output_file: PathBuf,

    /// How JSON is located inside free-text answers
    pub extraction_mode: ScanMode,

    /// Listen address of the dashboard
    pub dashboard_addr: String,

    /// Log filter for the application
    pub log_level: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("ollama_host", &self.ollama_host)
            .field("temperature", &self.temperature)
            .field("max_search_results", &self.max_search_results)
            .field("wiki_max_chars", &self.wiki_max_chars)
            .field("max_turns", &self.max_turns)
            .field("output_file", &self.output_file)
            .field("extraction_mode", &self.extraction_mode)
            .field("dashboard_addr", &self.dashboard_addr)
            .field("log_level", &self.log_level)
            .finish()
    }
}

// =============================================================================
// DEFAULT IMPLEMENTATION
// =============================================================================
impl Default for Config {
    fn default() -> Self {
        let provider = LlmProvider::default();
        Self {
            provider,
            model: provider.default_model().to_string(),
            api_key: None,

            // Standard Ollama default port
            ollama_host: "http://localhost:11434".to_string(),

            // Moderate temperature - balanced between creativity and focus
            temperature: 0.7,

            max_search_results: 5,

            // Short encyclopedia snippets keep the prompt small
            wiki_max_chars: 100,

            max_turns: 5,

            output_file: PathBuf::from("research_output.txt"),

            extraction_mode: ScanMode::Outermost,

            dashboard_addr: "127.0.0.1:3000".to_string(),

            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from a `.env` file (if any) and the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Silently ignore a missing .env file
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// `from_env` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = lookup("LLM_PROVIDER") {
            config.provider = parse_var("LLM_PROVIDER", &val)?;
            config.model = config.provider.default_model().to_string();
        }

        if let Some(val) = lookup("LLM_MODEL") {
            config.model = val;
        }

        config.api_key = lookup("GOOGLE_API_KEY").filter(|key| !key.trim().is_empty());

        if let Some(val) = lookup("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Some(val) = lookup("TEMPERATURE") {
            config.temperature = parse_var("TEMPERATURE", &val)?;
        }

        if let Some(val) = lookup("MAX_SEARCH_RESULTS") {
            config.max_search_results = parse_var("MAX_SEARCH_RESULTS", &val)?;
        }

        if let Some(val) = lookup("WIKI_MAX_CHARS") {
            config.wiki_max_chars = parse_var("WIKI_MAX_CHARS", &val)?;
        }

        if let Some(val) = lookup("MAX_TURNS") {
            config.max_turns = parse_var("MAX_TURNS", &val)?;
        }

        if let Some(val) = lookup("RESEARCH_OUTPUT_FILE") {
            config.output_file = PathBuf::from(val);
        }

        if let Some(val) = lookup("EXTRACTION_MODE") {
            config.extraction_mode = parse_var("EXTRACTION_MODE", &val)?;
        }

        if let Some(val) = lookup("DASHBOARD_ADDR") {
            config.dashboard_addr = val;
        }

        // RUST_LOG wins over the plain LOG_LEVEL alias.
        if let Some(val) = lookup("RUST_LOG").or_else(|| lookup("LOG_LEVEL")) {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Fail fast with a clear error rather than later with a confusing one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            )));
        }

        if self.max_search_results == 0 {
            return Err(ConfigError::Invalid(
                "MAX_SEARCH_RESULTS must be at least 1".to_string(),
            ));
        }

        if self.max_turns == 0 {
            return Err(ConfigError::Invalid("MAX_TURNS must be at least 1".to_string()));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("LLM_MODEL cannot be empty".to_string()));
        }

        if self.provider == LlmProvider::Gemini && self.api_key.is_none() {
            return Err(ConfigError::Invalid(
                "GOOGLE_API_KEY is required for the gemini provider".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
