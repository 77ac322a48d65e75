//! # Structured Research Agent
//!
//! Console front end: asks for a topic, runs the research agent, prints the
//! structured result, and appends it to the research log.
//!
//! ## Quick Start
//! ```bash
//! GOOGLE_API_KEY=... cargo run -- "Mars colonization"
//! cargo run -- --provider ollama          # prompts for the topic
//! cargo run -- --serve                    # start the dashboard API
//! ```

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use research_agent::export::{self, ExportFormat};
use research_agent::{
    dashboard, Config, LlmProvider, ResearchError, ResearchResult, ResearchService,
};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
/// # Rust Concept: Derive Macros with Clap
///
/// Clap's derive feature lets us define CLI arguments as a struct.
/// - #[command(...)]: Configures the overall program
/// - #[arg(...)]: Configures individual arguments
#[derive(Parser, Debug)]
#[command(
    name = "research-agent",
    version,
    about = "An AI research assistant that returns structured, sourced summaries",
    long_about = r#"
Structured Research Agent

Uses a tool-calling LLM (Gemini or a local Ollama model) with web search,
Wikipedia, and a save-to-file tool. The model is asked for a fixed JSON
report (topic, summary, sources, tools used), which is validated, printed,
and appended to the research log.

EXAMPLES:
  # Research a topic
  research-agent "Quantum computing"

  # Prompt for the topic interactively
  research-agent

  # Use a local model and write Markdown/JSON reports
  research-agent --provider ollama --export-dir reports "Climate change"

  # Serve the dashboard API
  research-agent --serve --addr 0.0.0.0:3000
"#
)]
struct Args {
    /// The research topic; prompted for when omitted
    #[arg(value_name = "QUERY", conflicts_with = "serve")]
    query: Option<String>,

    /// Model provider (overrides LLM_PROVIDER)
    #[arg(short = 'p', long = "provider")]
    provider: Option<LlmProvider>,

    /// Model name (overrides LLM_MODEL)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Do not append the result to the research log
    #[arg(long = "no-save", default_value = "false")]
    no_save: bool,

    /// Write Markdown and JSON reports into this directory
    #[arg(short = 'e', long = "export-dir", value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Start the dashboard API instead of running a single query
    #[arg(long = "serve", default_value = "false")]
    serve: bool,

    /// Dashboard listen address (overrides DASHBOARD_ADDR)
    #[arg(long = "addr", requires = "serve")]
    addr: Option<String>,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;

    init_logging(args.verbose, &config.log_level)?;

    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    info!(
        provider = %config.provider,
        model = %config.model,
        log = %config.output_file.display(),
        "Configuration loaded"
    );

    let service =
        ResearchService::from_config(&config).context("Failed to initialise the research agent")?;

    if args.serve {
        dashboard::serve(service, &config.dashboard_addr)
            .await
            .with_context(|| format!("Dashboard failed on {}", config.dashboard_addr))?;
        return Ok(());
    }

    let topic = match args.query.clone() {
        Some(query) => query,
        None => prompt_for_topic()?,
    };

    run_query(&service, &topic, &args).await
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(provider) = args.provider {
        config.provider = provider;
        if args.model.is_none() {
            config.model = provider.default_model().to_string();
        }
    }

    if let Some(model) = &args.model {
        info!(model = %model, "Using model from command line");
        config.model = model.clone();
    }

    if let Some(addr) = &args.addr {
        config.dashboard_addr = addr.clone();
    }
}

/// Ask for a topic on stdin.
fn prompt_for_topic() -> Result<String> {
    print!("What can i help you research? ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read the research topic")?;
    Ok(line.trim().to_string())
}

// =============================================================================
// SINGLE QUERY
// =============================================================================
async fn run_query(service: &ResearchService, topic: &str, args: &Args) -> Result<()> {
    let outcome = if args.no_save {
        service.research_only(topic).await.map(|result| (result, None))
    } else {
        service
            .research(topic)
            .await
            .map(|outcome| (outcome.result, Some(outcome.persisted)))
    };

    let (result, persisted) = match outcome {
        Ok(ok) => ok,
        Err(e) => {
            error!(error = %e, "Research failed");
            report_failure(&e);
            return Err(anyhow::Error::new(e).context("Research failed"));
        }
    };

    print_result(&result);

    match persisted {
        Some(Ok(record)) => println!("\nSaved: {}", record.confirmation),
        Some(Err(e)) => eprintln!("\nWarning: {e}. The result above is still valid."),
        None => {}
    }

    if let Some(dir) = &args.export_dir {
        let written = write_exports(&result, dir)?;
        for path in written {
            println!("Exported: {}", path.display());
        }
    }

    info!("Research completed successfully");
    Ok(())
}

fn print_result(result: &ResearchResult) {
    println!("\n{}", "=".repeat(60));
    println!("RESEARCH RESULTS");
    println!("{}\n", "=".repeat(60));
    println!("Topic: {}\n", result.topic());
    println!("Summary:\n{}\n", result.summary());
    println!("Sources: {}", result.sources().join(", "));
    println!("Tools Used: {}", result.tools_used().join(", "));
    println!("\n{}", "=".repeat(60));
}

/// Print what the error message alone does not show: the model output at
/// fault, or a hint for an unreachable model server.
///
/// The error itself is printed once, by `main`'s return.
fn report_failure(err: &ResearchError) {
    match err {
        ResearchError::Extraction(e) => {
            if let Some(raw) = e.diagnostic() {
                eprintln!("\nRaw response:\n{raw}");
            }
        }
        ResearchError::Agent(e) => {
            let message = e.to_string();
            if message.contains("connection refused") || message.contains("Connection refused") {
                eprintln!("\nTip: make sure the model server is running (ollama serve).");
            }
        }
        ResearchError::InvalidQuery(_) => {}
    }
}

fn write_exports(result: &ResearchResult, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let now = Local::now();
    [ExportFormat::Markdown, ExportFormat::Json]
        .into_iter()
        .map(|format| {
            let path = dir.join(export::file_name(result, now, format));
            std::fs::write(&path, format.render(result, now))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber for structured logging.
///
/// Logs go to stderr so stdout only carries the research output.
fn init_logging(verbose: bool, log_level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
