//! Shared helpers for integration tests: a scripted agent backend and a
//! config pointing the research log into a temporary directory.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use research_agent::{
    AgentBackend, AgentInvocationError, Config, PromptContext, RawAgentOutput, ResearchService,
    ToolRegistry,
};

pub const MARS_JSON: &str = r#"{"topic": "Mars colonization", "summary": "Brief overview.", "sources": ["nasa.gov"], "tools_used": ["search"]}"#;

/// Replays canned outputs in order, one per call.
pub struct ScriptedBackend {
    replies: Mutex<Vec<Result<RawAgentOutput, String>>>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<PromptContext>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<RawAgentOutput, String>>) -> Arc<Self> {
        let mut replies = replies;
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn replying(output: impl Into<RawAgentOutput>) -> Arc<Self> {
        Self::new(vec![Ok(output.into())])
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(vec![Err(message.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<PromptContext> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    async fn run(
        &self,
        prompt: &PromptContext,
        _tools: &ToolRegistry,
    ) -> Result<RawAgentOutput, AgentInvocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());

        match self.replies.lock().unwrap().pop() {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(AgentInvocationError::msg(message)),
            None => Err(AgentInvocationError::msg("no scripted reply left")),
        }
    }
}

pub fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.output_file = dir.join("research_output.txt");
    config
}

pub fn service(dir: &Path, backend: Arc<ScriptedBackend>) -> ResearchService {
    ResearchService::with_backend(&config_in(dir), backend).unwrap()
}
