use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use braid_config::PipelineDef;
use braid_orchestrator::{Orchestrator, RuntimeConfig};
use braid_resolver::{Resolver, StandardResolver};
use braid_steps::builtin_registry;
use braid_workflow::Pipeline;

/// Braid - run trees of sequential and parallel steps over a shared context
#[derive(Parser)]
#[command(name = "braid")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a pipeline and print the final context
  Run {
    /// Path to the pipeline definition (JSON)
    pipeline_file: PathBuf,

    /// Read the input payload from a file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Maximum number of steps executing at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Context key to persist after a successful run
    #[arg(long, requires = "output")]
    output_key: Option<String>,

    /// File the value of --output-key is written to
    #[arg(long, requires = "output_key")]
    output: Option<PathBuf>,
  },

  /// Resolve and validate a pipeline without running it
  Validate {
    /// Path to the pipeline definition (JSON)
    pipeline_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("braid=info,warn")),
    )
    .with_writer(io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();
  let rt = tokio::runtime::Runtime::new()?;

  match cli.command {
    Commands::Run {
      pipeline_file,
      input,
      concurrency,
      output_key,
      output,
    } => rt.block_on(run_pipeline(
      pipeline_file,
      input,
      concurrency,
      output_key.zip(output),
    )),
    Commands::Validate { pipeline_file } => rt.block_on(validate_pipeline(pipeline_file)),
  }
}

async fn load_pipeline(pipeline_file: &Path) -> Result<Pipeline> {
  let content = tokio::fs::read_to_string(pipeline_file)
    .await
    .with_context(|| format!("failed to read pipeline file: {}", pipeline_file.display()))?;

  let def: PipelineDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse pipeline file: {}", pipeline_file.display()))?;

  StandardResolver::new(builtin_registry())
    .resolve(&def)
    .with_context(|| format!("failed to resolve pipeline '{}'", def.name))
}

async fn run_pipeline(
  pipeline_file: PathBuf,
  input: Option<PathBuf>,
  concurrency: Option<usize>,
  persist: Option<(String, PathBuf)>,
) -> Result<()> {
  let pipeline = load_pipeline(&pipeline_file).await?;
  info!(pipeline = %pipeline.name(), steps = pipeline.step_count(), "loaded pipeline");

  let payload = match input {
    Some(path) => read_payload_from_file(&path).await?,
    None => read_payload_from_stdin()?,
  };

  let mut config = RuntimeConfig::default();
  if let Some(n) = concurrency {
    config.max_concurrency = n;
  }
  let orchestrator = Orchestrator::new(config);

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received, cancelling run");
      on_interrupt.cancel();
    }
  });

  let outcome = orchestrator
    .run(&pipeline, payload, cancel)
    .await
    .context("pipeline run failed")?;

  info!(
    execution_id = %outcome.execution_id,
    keys = outcome.context.len(),
    elapsed_ms = outcome.elapsed.as_millis() as u64,
    "run finished"
  );

  if let Some((key, path)) = persist {
    let Some(value) = outcome.context.get(&key) else {
      bail!("output key '{}' is not in the final context", key);
    };
    tokio::fs::write(&path, serde_json::to_string_pretty(value)?)
      .await
      .with_context(|| format!("failed to write output file: {}", path.display()))?;
    info!(key = %key, path = %path.display(), "wrote output");
  }

  println!("{}", serde_json::to_string_pretty(&outcome.context)?);

  Ok(())
}

async fn validate_pipeline(pipeline_file: PathBuf) -> Result<()> {
  let pipeline = load_pipeline(&pipeline_file).await?;

  println!(
    "pipeline '{}' is valid: {} steps, {} output keys",
    pipeline.name(),
    pipeline.step_count(),
    pipeline.output_keys().len()
  );

  Ok(())
}

async fn read_payload_from_file(path: &Path) -> Result<serde_json::Value> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read input file: {}", path.display()))?;

  parse_payload(&content)
    .with_context(|| format!("failed to parse input file: {}", path.display()))
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  parse_payload(&input).context("failed to parse payload JSON from stdin")
}

/// Empty input means an empty object.
fn parse_payload(content: &str) -> Result<serde_json::Value> {
  if content.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    Ok(serde_json::from_str(content)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_payload() {
    assert_eq!(parse_payload("  \n").unwrap(), serde_json::json!({}));
    assert_eq!(
      parse_payload(r#"{"invoice": 42}"#).unwrap(),
      serde_json::json!({ "invoice": 42 })
    );
    assert!(parse_payload("{").is_err());
  }

  #[test]
  fn test_cli_requires_output_pair() {
    let parsed = Cli::try_parse_from(["braid", "run", "p.json", "--output-key", "report"]);
    assert!(parsed.is_err());

    let parsed = Cli::try_parse_from([
      "braid",
      "run",
      "p.json",
      "--output-key",
      "report",
      "--output",
      "out.json",
    ]);
    assert!(parsed.is_ok());
  }

  #[tokio::test]
  async fn test_sample_pipeline_validates() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/invoice.json");
    let pipeline = load_pipeline(&path).await.unwrap();
    assert_eq!(pipeline.name(), "invoice-report");
    assert_eq!(pipeline.step_count(), 15);
  }

  #[tokio::test]
  async fn test_run_delivers_and_persists_report() {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let input = temp_dir.path().join("input.json");
    let output = temp_dir.path().join("report.json");
    let delivered = temp_dir.path().join("delivery/invoice_report.json");
    tokio::fs::write(&input, r#"{"invoice": 42, "customer": "acme"}"#)
      .await
      .unwrap();

    // Point the delivery step of the sample pipeline into the temp dir.
    let sample = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/invoice.json");
    let mut def: serde_json::Value =
      serde_json::from_str(&tokio::fs::read_to_string(&sample).await.unwrap()).unwrap();
    let children = def["root"]["children"].as_array_mut().unwrap();
    let deliver = children.last_mut().unwrap();
    assert_eq!(deliver["uses"], "write_json");
    deliver["params"]["path"] = serde_json::json!(delivered.display().to_string());
    let pipeline_file = temp_dir.path().join("pipeline.json");
    tokio::fs::write(&pipeline_file, def.to_string()).await.unwrap();

    run_pipeline(
      pipeline_file,
      Some(input),
      Some(2),
      Some(("formatted_report".to_string(), output.clone())),
    )
    .await
    .unwrap();

    let persisted: serde_json::Value =
      serde_json::from_str(&tokio::fs::read_to_string(&output).await.unwrap()).unwrap();
    assert_eq!(persisted["stored_raw_data"]["customer"], "acme");
    assert_eq!(
      persisted["consolidated"]["validated_risk_assessment"]["level"],
      "low"
    );
    assert_eq!(persisted["consolidated"].as_object().unwrap().len(), 5);

    let delivered: serde_json::Value =
      serde_json::from_str(&tokio::fs::read_to_string(&delivered).await.unwrap()).unwrap();
    assert_eq!(delivered, persisted);
  }
}
