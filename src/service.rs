//! # Service Module
//!
//! The one research flow shared by the console and the dashboard:
//!
//! ```text
//! topic -> ResearchQuery -> AgentPipeline::run -> ResponseExtractor::extract
//!       -> ResultSink::persist -> ResearchOutcome
//! ```

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::agent::{AgentBackend, AgentPipeline, ResearchQuery, RigBackend};
use crate::config::Config;
use crate::error::{ConfigError, PersistenceError, ResearchError};
use crate::extract::ResponseExtractor;
use crate::schema::ResearchResult;
use crate::sink::{PersistedRecord, ResultSink};
use crate::tools::ToolRegistry;

/// A validated result plus the outcome of writing it to the research log.
///
/// A failed save does not invalidate the result; it can still be shown and
/// exported.
#[derive(Debug)]
pub struct ResearchOutcome {
    pub result: ResearchResult,
    pub persisted: Result<PersistedRecord, PersistenceError>,
}

/// Pipeline, extractor, and sink wired together.
#[derive(Clone)]
pub struct ResearchService {
    pipeline: AgentPipeline,
    extractor: ResponseExtractor,
    sink: ResultSink,
}

impl ResearchService {
    pub fn new(pipeline: AgentPipeline, extractor: ResponseExtractor, sink: ResultSink) -> Self {
        Self {
            pipeline,
            extractor,
            sink,
        }
    }

    /// Wire the service from configuration, using the Rig backend.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let backend: Arc<dyn AgentBackend> = Arc::new(RigBackend::from_config(config)?);
        Self::with_backend(config, backend)
    }

    /// Wire the service from configuration around any backend.
    pub fn with_backend(
        config: &Config,
        backend: Arc<dyn AgentBackend>,
    ) -> Result<Self, ConfigError> {
        let tools = ToolRegistry::from_config(config)?;
        let sink = ResultSink::new(tools.save_tool());
        Ok(Self::new(
            AgentPipeline::new(backend, tools),
            ResponseExtractor::new(config.extraction_mode),
            sink,
        ))
    }

    /// Research `topic` and try to persist the result.
    #[instrument(skip(self))]
    pub async fn research(&self, topic: &str) -> Result<ResearchOutcome, ResearchError> {
        let result = self.research_only(topic).await?;
        let persisted = self.sink.persist(&result).await;
        Ok(ResearchOutcome { result, persisted })
    }

    /// Research `topic` without writing to the research log.
    pub async fn research_only(&self, topic: &str) -> Result<ResearchResult, ResearchError> {
        let query = ResearchQuery::new(topic)?;

        let raw = self.pipeline.run(&query).await.map_err(|e| {
            error!(error = %e, "Research agent failed");
            e
        })?;

        let result = self.extractor.extract(&raw).map_err(|e| {
            error!(error = %e, "Could not extract research result");
            e
        })?;

        info!(
            topic = %result.topic(),
            sources = result.sources().len(),
            tools = result.tools_used().len(),
            "Research result extracted"
        );
        Ok(result)
    }
}
