//! # Export Module
//!
//! Downloadable renderings of a research result (Markdown report and JSON
//! document), their inverse parsers, file naming, and the summary stats
//! shown next to a result.
//!
//! Both documents are pure functions of the result and a timestamp, and
//! both parse back into an equal [`ResearchResult`] (the timestamp is
//! dropped on the way back).

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ExportError;
use crate::schema::ResearchResult;

const MD_TITLE: &str = "# Research Report: ";
const MD_SUMMARY: &str = "## Summary";
const MD_SOURCES: &str = "## Sources";
const MD_TOOLS: &str = "## Tools Used";
const MD_RULE: &str = "---";
const MD_FOOTER: &str = "*Generated by AI Research Agent*";

/// Download formats offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Json => "application/json",
        }
    }

    /// Render `result` in this format.
    pub fn render(&self, result: &ResearchResult, at: DateTime<Local>) -> String {
        match self {
            ExportFormat::Markdown => to_markdown(result, at),
            ExportFormat::Json => to_json(result, at),
        }
    }
}

// =============================================================================
// JSON
// =============================================================================
/// Pretty JSON document with an ISO-8601 generation timestamp.
pub fn to_json(result: &ResearchResult, at: DateTime<Local>) -> String {
    let document = json!({
        "topic": result.topic(),
        "summary": result.summary(),
        "sources": result.sources(),
        "tools_used": result.tools_used(),
        "timestamp": at.to_rfc3339(),
    });

    // A `Value` built from strings always serializes.
    serde_json::to_string_pretty(&document).unwrap_or_else(|_| document.to_string())
}

/// Parse a JSON export back into a validated result.
pub fn from_json(document: &str) -> Result<ResearchResult, ExportError> {
    let value: serde_json::Value = serde_json::from_str(document)?;
    Ok(ResearchResult::from_value(&value)?)
}

// =============================================================================
// MARKDOWN
// =============================================================================
/// Markdown report with Summary / Sources / Tools Used sections.
pub fn to_markdown(result: &ResearchResult, at: DateTime<Local>) -> String {
    let bullets = |items: &[String]| {
        items
            .iter()
            .map(|item| format!("- {item}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "{MD_TITLE}{topic}\n\n**Generated on:** {generated}\n\n{MD_SUMMARY}\n{summary}\n\n\
         {MD_SOURCES}\n{sources}\n\n{MD_TOOLS}\n{tools}\n\n{MD_RULE}\n{MD_FOOTER}\n",
        topic = result.topic(),
        generated = at.format("%Y-%m-%d %H:%M:%S"),
        summary = result.summary(),
        sources = bullets(result.sources()),
        tools = bullets(result.tools_used()),
    )
}

/// Parse a Markdown report produced by [`to_markdown`].
///
/// The summary is free text and may contain its own headings, so the list
/// sections are located from the end: list items always start with `- `, so
/// the last `## Tools Used` line and the last `## Sources` line before it are
/// the real section headings.
pub fn from_markdown(document: &str) -> Result<ResearchResult, ExportError> {
    let lines: Vec<&str> = document.split('\n').collect();

    let topic = lines
        .iter()
        .find_map(|line| line.strip_prefix(MD_TITLE))
        .ok_or_else(|| missing("title line"))?;

    let summary_at = lines
        .iter()
        .position(|line| *line == MD_SUMMARY)
        .ok_or_else(|| missing_section(MD_SUMMARY))?;
    let tools_at = last_position(&lines, MD_TOOLS)?;
    let sources_at = last_position(&lines[..tools_at], MD_SOURCES)?;
    let rule_at = lines[tools_at..]
        .iter()
        .rposition(|line| *line == MD_RULE)
        .map(|offset| tools_at + offset)
        .ok_or_else(|| missing("closing rule"))?;

    // `## Summary`, the summary lines, one blank separator, `## Sources`.
    if sources_at < summary_at + 2 || !lines[sources_at - 1].is_empty() {
        return Err(ExportError::Markdown(
            "summary section is malformed or out of order".to_string(),
        ));
    }

    let summary = lines[summary_at + 1..sources_at - 1].join("\n");
    let sources = bullet_items(&lines[sources_at + 1..tools_at])?;
    let tools_used = bullet_items(&lines[tools_at + 1..rule_at])?;

    Ok(ResearchResult::new(topic, summary, sources, tools_used)?)
}

fn missing(what: &str) -> ExportError {
    ExportError::Markdown(format!("missing {what}"))
}

fn missing_section(heading: &str) -> ExportError {
    missing(&format!("`{heading}` section"))
}

fn last_position(lines: &[&str], heading: &str) -> Result<usize, ExportError> {
    lines
        .iter()
        .rposition(|line| *line == heading)
        .ok_or_else(|| missing_section(heading))
}

fn trim_blank_lines<'a>(lines: &'a [&'a str]) -> &'a [&'a str] {
    let start = lines.iter().position(|l| !l.trim().is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.trim().is_empty()).map_or(start, |i| i + 1);
    &lines[start..end]
}

fn bullet_items(lines: &[&str]) -> Result<Vec<String>, ExportError> {
    trim_blank_lines(lines)
        .iter()
        .map(|line| {
            line.strip_prefix("- ")
                .map(str::to_string)
                .ok_or_else(|| ExportError::Markdown(format!("expected a list item, got `{line}`")))
        })
        .collect()
}

// =============================================================================
// FILE NAMES & STATS
// =============================================================================
/// `research_{topic}_{YYYYmmdd_HHMMSS}.{ext}` with the topic lowercased and
/// every character outside `[a-z0-9_-]` replaced by an underscore.
///
/// The result is a single path component that is also safe to quote in a
/// `Content-Disposition` header.
pub fn file_name(result: &ResearchResult, at: DateTime<Local>, format: ExportFormat) -> String {
    format!(
        "research_{}_{}.{}",
        file_stem(result.topic()),
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

fn file_stem(topic: &str) -> String {
    topic
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}

/// Quick figures about a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResearchStats {
    pub source_count: usize,
    pub tool_count: usize,
    pub summary_words: usize,
}

impl From<&ResearchResult> for ResearchStats {
    fn from(result: &ResearchResult) -> Self {
        Self {
            source_count: result.sources().len(),
            tool_count: result.tools_used().len(),
            summary_words: result.summary().split_whitespace().count(),
        }
    }
}
