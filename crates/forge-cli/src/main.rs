//! Forge CLI entry point.
//!
//! Binary name: `forge`
//!
//! Runs agent workflows from YAML files or built-in templates, validates
//! definitions, and lists available templates. Workflows execute against
//! placeholder agents; wire a real `TaskRegistry` to run live agents.

mod agents;
mod config;
mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde_json::Value;

use forge_core::workflow::WorkflowEngine;
use forge_core::workflow::definition::{load_workflow_file, validate};
use forge_core::workflow::templates;
use forge_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
use forge_types::workflow::WorkflowDefinition;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "forge", version, about = "Dependency-driven agent workflow orchestrator")]
struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Export OpenTelemetry spans to stdout.
    #[arg(long, global = true)]
    otel: bool,

    /// Directory holding config.toml (defaults to the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow from a YAML file or a built-in template name.
    Run {
        /// Path to a workflow YAML file, or a template name.
        workflow: String,

        /// Budget ceiling in USD, overriding the definition and session.
        #[arg(long)]
        budget: Option<f64>,

        /// Overall deadline in seconds, overriding the definition.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Workflow input as key=value, addressable via $workflow.key.
        /// May be given multiple times.
        #[arg(long, value_name = "KEY=VALUE")]
        input: Vec<String>,

        /// Keep dispatching steps after a failure.
        #[arg(long)]
        keep_going: bool,
    },

    /// List built-in workflow templates.
    Templates,

    /// Validate a workflow YAML file without running it.
    Validate {
        /// Path to the workflow YAML file.
        file: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        verbosity: cli.verbose,
        otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let outcome = match cli.command {
        Commands::Run {
            ref workflow,
            budget,
            timeout_secs,
            ref input,
            keep_going,
        } => {
            run_workflow(
                workflow,
                budget,
                timeout_secs,
                input,
                keep_going,
                &config_dir,
                cli.json,
            )
            .await
        }
        Commands::Templates => list_templates(cli.json),
        Commands::Validate { ref file } => validate_file(file, cli.json),
    };

    shutdown_tracing();
    outcome
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run_workflow(
    workflow: &str,
    budget: Option<f64>,
    timeout_secs: Option<u64>,
    inputs: &[String],
    keep_going: bool,
    config_dir: &Path,
    json: bool,
) -> Result<()> {
    let mut definition = resolve_workflow(workflow)?;

    if let Some(budget) = budget {
        definition.budget_usd = Some(budget);
    }
    if let Some(timeout) = timeout_secs {
        definition.timeout_secs = Some(timeout);
    }
    if keep_going {
        definition.stop_on_failure = false;
    }
    for pair in inputs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("invalid --input '{pair}', expected key=value"))?;
        definition
            .inputs
            .insert(key.to_string(), Value::String(value.to_string()));
    }

    let session = config::load_session_config(config_dir).await;
    let registry = agents::placeholder_registry(&definition);
    let engine = WorkflowEngine::new(registry, session);

    let result = engine
        .submit(&definition)
        .await
        .with_context(|| format!("workflow '{}' is invalid", definition.name))?;

    output::print_result(&result, json)?;

    if result.success {
        Ok(())
    } else {
        bail!("workflow '{}' did not complete successfully", definition.name)
    }
}

/// A `run` argument is a YAML path if it points at an existing file,
/// otherwise a template name.
fn resolve_workflow(workflow: &str) -> Result<WorkflowDefinition> {
    let path = Path::new(workflow);
    if path.is_file() {
        return load_workflow_file(path)
            .with_context(|| format!("failed to load workflow file {}", path.display()));
    }
    if let Some(def) = templates::template(workflow) {
        return Ok(def);
    }
    bail!(
        "'{workflow}' is neither a workflow file nor a template (templates: {})",
        templates::template_names().join(", ")
    )
}

fn list_templates(json: bool) -> Result<()> {
    let defs: Vec<WorkflowDefinition> = templates::template_names()
        .into_iter()
        .filter_map(templates::template)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&defs)?);
        return Ok(());
    }

    println!();
    println!("  {}", style("Built-in workflow templates").bold());
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Steps").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);
    for def in &defs {
        table.add_row(vec![
            Cell::new(&def.name).fg(Color::Cyan),
            Cell::new(def.steps.len()).fg(Color::White),
            Cell::new(def.description.as_deref().unwrap_or("-")).fg(Color::DarkGrey),
        ]);
    }
    println!("{table}");
    println!();
    Ok(())
}

fn validate_file(file: &Path, json: bool) -> Result<()> {
    let definition = load_workflow_file(file)
        .with_context(|| format!("failed to load workflow file {}", file.display()))?;
    // load_workflow_file already validates; re-derive the graph for the
    // step summary.
    let graph = validate(&definition)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "name": definition.name,
                "steps": definition.steps.len(),
                "execution_order": graph.topo_order(),
                "valid": true,
            }))?
        );
        return Ok(());
    }

    println!();
    println!(
        "  {} '{}' is valid: {} step{}, order {}",
        style("✓").green().bold(),
        style(&definition.name).cyan(),
        definition.steps.len(),
        if definition.steps.len() == 1 { "" } else { "s" },
        graph.topo_order().join(" -> ")
    );
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
