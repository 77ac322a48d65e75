//! Integration tests for the shared research flow
//!
//! These tests drive `ResearchService` end to end with a scripted agent:
//! - prose-wrapped and block-shaped answers
//! - every extraction failure mode
//! - persistence to the research log, and failures of it
//! - export of a result that could not be persisted

mod common;

use std::sync::Arc;

use chrono::Local;
use research_agent::export;
use research_agent::{
    ExtractionError, RawAgentOutput, ResearchError, ResponseExtractor, ResultSink,
    SchemaValidationError, ScanMode, AgentPipeline, ResearchService, SaveTool, ToolRegistry,
    WebSearchTool, WikipediaTool,
};
use serde_json::json;

use common::{service, ScriptedBackend, MARS_JSON};

#[tokio::test]
async fn test_prose_wrapped_answer_is_extracted_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::replying(format!("Sure! {MARS_JSON}"));
    let service = service(dir.path(), backend.clone());

    let outcome = service.research("Mars colonization").await.unwrap();

    assert_eq!(outcome.result.topic(), "Mars colonization");
    assert_eq!(outcome.result.summary(), "Brief overview.");
    assert_eq!(outcome.result.sources(), ["nasa.gov"]);
    assert_eq!(outcome.result.tools_used(), ["search"]);

    let record = outcome.persisted.unwrap();
    assert!(record.confirmation.starts_with("Data successfully saved to"));

    let log = std::fs::read_to_string(dir.path().join("research_output.txt")).unwrap();
    assert!(log.contains("--- Research Output ---"));
    assert!(log.contains("Research Topic: Mars colonization"));
    assert!(log.contains("SOURCES:\nnasa.gov"));

    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_prompt_carries_topic_and_format_contract() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::replying(MARS_JSON);
    let service = service(dir.path(), backend.clone());

    service.research_only("  Mars colonization ").await.unwrap();

    let prompt = backend.last_prompt().unwrap();
    assert_eq!(prompt.query, "Mars colonization");
    assert!(prompt.system.contains("research assistant"));
    assert!(prompt.system.contains("\"tools_used\""));
    assert!(prompt.history.is_empty());
    assert!(prompt.scratchpad.is_empty());
}

#[tokio::test]
async fn test_block_answer_matches_plain_answer() {
    let dir = tempfile::tempdir().unwrap();

    let plain = service(dir.path(), ScriptedBackend::replying(MARS_JSON))
        .research_only("Mars")
        .await
        .unwrap();
    let blocks = service(
        dir.path(),
        ScriptedBackend::replying(RawAgentOutput::Blocks(vec![json!({ "text": MARS_JSON })])),
    )
    .research_only("Mars")
    .await
    .unwrap();

    assert_eq!(plain, blocks);
}

#[tokio::test]
async fn test_no_json_answer() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path(), ScriptedBackend::replying("no json here"));

    let err = service.research("Mars").await.unwrap_err();
    match err {
        ResearchError::Extraction(ExtractionError::NoJsonFound { raw }) => {
            assert_eq!(raw, "no json here")
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Nothing is written for a failed extraction.
    assert!(!dir.path().join("research_output.txt").exists());
}

#[tokio::test]
async fn test_incomplete_block_answer_is_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::replying(RawAgentOutput::Blocks(vec![
        json!({ "text": "{\"topic\":\"X\"}" }),
    ]));
    let err = service(dir.path(), backend).research("X").await.unwrap_err();

    assert!(matches!(
        err,
        ResearchError::Extraction(ExtractionError::SchemaValidation(
            SchemaValidationError::MissingField(_)
        ))
    ));
}

#[tokio::test]
async fn test_agent_failure_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new(vec![
        Err("upstream timeout".to_string()),
        Ok(RawAgentOutput::from(MARS_JSON)),
    ]);
    let service = service(dir.path(), backend.clone());

    let err = service.research("Mars").await.unwrap_err();
    assert!(matches!(err, ResearchError::Agent(_)));
    assert!(err.to_string().contains("upstream timeout"));
    assert_eq!(backend.calls(), 1);

    // The caller decides to re-run; the next scripted reply succeeds.
    assert!(service.research("Mars").await.is_ok());
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_empty_topic_never_reaches_the_agent() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::replying(MARS_JSON);
    let service = service(dir.path(), backend.clone());

    let err = service.research("   ").await.unwrap_err();
    assert!(matches!(err, ResearchError::InvalidQuery(_)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_persistence_failure_keeps_result_exportable() {
    let dir = tempfile::tempdir().unwrap();
    let unwritable = dir.path().join("missing").join("research_output.txt");

    let tools = ToolRegistry::new(
        WebSearchTool::new(5).unwrap(),
        WikipediaTool::new(100).unwrap(),
        SaveTool::new(&unwritable),
    );
    let sink = ResultSink::new(tools.save_tool());
    let pipeline = AgentPipeline::new(ScriptedBackend::replying(MARS_JSON), tools);
    let service = ResearchService::new(pipeline, ResponseExtractor::default(), sink);

    let outcome = service.research("Mars").await.unwrap();
    assert!(outcome.persisted.is_err());

    let document = export::to_json(&outcome.result, Local::now());
    assert_eq!(export::from_json(&document).unwrap(), outcome.result);
}

#[tokio::test]
async fn test_balanced_mode_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::config_in(dir.path());
    config.extraction_mode = ScanMode::Balanced;

    let backend = ScriptedBackend::replying(format!("{MARS_JSON} (see note}})"));
    let service = ResearchService::with_backend(&config, backend).unwrap();

    let result = service.research_only("Mars").await.unwrap();
    assert_eq!(result.topic(), "Mars colonization");
}

#[tokio::test]
async fn test_exports_round_trip_through_schema() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path(), ScriptedBackend::replying(MARS_JSON));
    let result = service.research_only("Mars").await.unwrap();
    let now = Local::now();

    assert_eq!(export::from_json(&export::to_json(&result, now)).unwrap(), result);
    assert_eq!(
        export::from_markdown(&export::to_markdown(&result, now)).unwrap(),
        result
    );
}

#[test]
fn test_registry_shares_the_save_tool_with_the_sink() {
    let tools = ToolRegistry::new(
        WebSearchTool::new(5).unwrap(),
        WikipediaTool::new(100).unwrap(),
        SaveTool::new("research_output.txt"),
    );
    let save: Arc<dyn research_agent::TextTool> = tools.save_tool();
    assert_eq!(save.name(), "save_text_to_file");
}
