// crates/greencli/src/main.rs

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use greencore::{Checkpoint, Decision, ExecutionEvent, NodeEvent, Policies, RunId, RunState, Telemetry};
use greennodes::{scenarios, GreenhouseSettings, StaticTelemetry, TelemetrySource, Toolbox};
use greenruntime::{
    diagram, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore, RunResult, RuntimeConfig,
    WorkflowRuntime,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "greenflow")]
#[command(about = "Greenhouse planning workflow with a human approval gate", long_about = None)]
struct Cli {
    /// Settings JSON file (risk threshold, revision limit, ...)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding run checkpoints
    #[arg(long, global = true, default_value = ".greenflow/checkpoints")]
    store: PathBuf,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the canned scenarios in memory
    Demo {
        #[arg(value_enum, default_value = "all")]
        scenario: Scenario,
    },

    /// Start a new run; it stops at the approval gate if one is needed
    Start {
        /// Run identifier; generated when omitted
        #[arg(long)]
        run_id: Option<String>,

        /// Telemetry as a JSON object of sensor -> reading
        #[arg(short, long)]
        telemetry: String,

        /// Policies as JSON, e.g. '{"fertigation_lockout_min": 20}'
        #[arg(short, long)]
        policies: Option<String>,

        /// Pre-supply the reviewer decision so the gate does not suspend
        #[arg(short, long, value_enum)]
        decision: Option<DecisionArg>,
    },

    /// Resume a suspended run with a reviewer decision
    Resume {
        run_id: String,

        #[arg(value_enum)]
        decision: DecisionArg,
    },

    /// Cancel a run so it can no longer be resumed
    Cancel { run_id: String },

    /// Print the latest checkpoint of a run
    Show {
        run_id: String,

        /// Dump the raw checkpoint JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored runs
    List,

    /// List available node types
    Nodes,

    /// Export the graph topology
    Diagram {
        #[arg(short, long, value_enum, default_value = "mermaid")]
        format: DiagramFormat,

        /// Output file; `graph.mmd` or `graph.dot` when omitted
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<PathBuf>,

        /// Print to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Scenario {
    /// Suspend, reject, suspend, approve, commit
    Approval,
    /// Low risk, commits without suspending
    Auto,
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionArg {
    Approved,
    Rejected,
}

impl From<DecisionArg> for Decision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Approved => Decision::Approved,
            DecisionArg::Rejected => Decision::Rejected,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum DiagramFormat {
    Mermaid,
    Dot,
}

impl DiagramFormat {
    fn default_file(self) -> &'static str {
        match self {
            DiagramFormat::Mermaid => "graph.mmd",
            DiagramFormat::Dot => "graph.dot",
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo { scenario } => run_demo(&settings, scenario).await,
        Commands::Start {
            run_id,
            telemetry,
            policies,
            decision,
        } => {
            let runtime = file_runtime(&settings, &cli.store).await?;
            let run_id = match run_id {
                Some(id) => RunId::parse(id)?,
                None => RunId::generate(),
            };
            let state = parse_state(&telemetry, policies.as_deref(), decision.map(Into::into)).await?;
            let mut events = runtime.subscribe_events();

            let result = runtime.start(run_id, state).await?;
            print_events(&mut events);
            report(&runtime, result).await
        }
        Commands::Resume { run_id, decision } => {
            let runtime = file_runtime(&settings, &cli.store).await?;
            let run_id = RunId::parse(run_id)?;
            let mut events = runtime.subscribe_events();

            let result = runtime.resume(&run_id, decision.into()).await?;
            print_events(&mut events);
            report(&runtime, result).await
        }
        Commands::Cancel { run_id } => {
            let runtime = file_runtime(&settings, &cli.store).await?;
            let checkpoint = runtime.cancel(&RunId::parse(run_id)?).await?;
            println!("🛑 Run {} cancelled", checkpoint.run_id);
            Ok(())
        }
        Commands::Show { run_id, json } => {
            let runtime = file_runtime(&settings, &cli.store).await?;
            let checkpoint = runtime.checkpoint(&RunId::parse(run_id)?).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&checkpoint)?);
            } else {
                print_checkpoint(&checkpoint);
            }
            Ok(())
        }
        Commands::List => {
            let store = FileCheckpointStore::open(&cli.store).await?;
            for run_id in store.list().await? {
                if let Some(checkpoint) = store.get(&run_id).await? {
                    println!(
                        "  • {} [{}] pending={} step={}",
                        run_id,
                        checkpoint.status,
                        checkpoint.pending_node.as_deref().unwrap_or("-"),
                        checkpoint.step
                    );
                }
            }
            Ok(())
        }
        Commands::Nodes => {
            list_nodes();
            Ok(())
        }
        Commands::Diagram { format, output, stdout } => {
            let graph = greennodes::compile_greenhouse(&settings, &Toolbox::default())?;
            let text = match format {
                DiagramFormat::Mermaid => diagram::to_mermaid(&graph),
                DiagramFormat::Dot => diagram::to_dot(&graph),
            };
            if stdout {
                print!("{text}");
                return Ok(());
            }
            let path = output.unwrap_or_else(|| PathBuf::from(format.default_file()));
            std::fs::write(&path, text).with_context(|| format!("writing diagram to {}", path.display()))?;
            info!(path = %path.display(), ?format, "diagram written");
            println!("✨ Wrote diagram to {}", path.display());
            Ok(())
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<GreenhouseSettings> {
    let settings = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading settings from {}", path.display()))?;
            GreenhouseSettings::from_json(&json)?
        }
        None => GreenhouseSettings::default(),
    };
    settings.validate()?;
    debug!(?settings, "settings loaded");
    Ok(settings)
}

fn build_runtime(settings: &GreenhouseSettings, store: Arc<dyn CheckpointStore>) -> Result<WorkflowRuntime> {
    let graph = greennodes::compile_greenhouse(settings, &Toolbox::default())?;
    Ok(WorkflowRuntime::with_config(graph, store, RuntimeConfig::default()))
}

async fn file_runtime(settings: &GreenhouseSettings, dir: &Path) -> Result<WorkflowRuntime> {
    let store = FileCheckpointStore::open(dir)
        .await
        .with_context(|| format!("opening checkpoint store at {}", dir.display()))?;
    debug!(dir = %dir.display(), "checkpoint store opened");
    build_runtime(settings, Arc::new(store))
}

async fn parse_state(telemetry: &str, policies: Option<&str>, decision: Option<Decision>) -> Result<RunState> {
    let readings: Telemetry = serde_json::from_str(telemetry).context("telemetry must be a JSON object of numbers")?;
    let readings = StaticTelemetry(readings).read().await?;

    let policies: Policies = match policies {
        Some(json) => serde_json::from_str(json).context("invalid policies JSON")?,
        None => Policies::default(),
    };

    let mut state = RunState::new(readings).with_policies(policies);
    state.decision = decision;
    Ok(state)
}

async fn report(runtime: &WorkflowRuntime, result: RunResult) -> Result<()> {
    match result {
        RunResult::Suspended(run_id) => {
            let checkpoint = runtime.checkpoint(&run_id).await?;
            print_checkpoint(&checkpoint);
            println!();
            println!("⏸️  Run {run_id} is waiting for approval. Resume with:");
            println!("  greenflow resume {run_id} approved|rejected");
            Ok(())
        }
        RunResult::Completed(state) => {
            print_log(&state);
            println!();
            println!("✨ Plan committed");
            Ok(())
        }
        RunResult::Failed(failure) => {
            warn!(run_id = %failure.run_id, node = %failure.node, "run failed");
            Err(anyhow!(failure))
        }
    }
}

async fn run_demo(settings: &GreenhouseSettings, scenario: Scenario) -> Result<()> {
    let runtime = build_runtime(settings, Arc::new(InMemoryCheckpointStore::new()))?;
    let mut events = runtime.subscribe_events();

    if matches!(scenario, Scenario::Approval | Scenario::All) {
        println!("=== DEMO A (pause → reject → pause → approve → commit) ===");
        let run_id = RunId::parse("demo-a")?;
        let state = RunState::new(scenarios::needs_approval()).with_policies(scenarios::default_policies());

        let steps = [None, Some(Decision::Rejected), Some(Decision::Approved)];
        let mut result = None;
        for decision in steps {
            let step = match decision {
                None => runtime.start(run_id.clone(), state.clone()).await?,
                Some(decision) => {
                    println!("👤 Reviewer: {decision}");
                    runtime.resume(&run_id, decision).await?
                }
            };
            print_events(&mut events);
            if let RunResult::Failed(failure) = step {
                bail!(failure);
            }
            result = Some(step);
        }

        match result {
            Some(RunResult::Completed(state)) => {
                println!();
                print_log(&state);
            }
            other => bail!("demo A did not complete: {other:?}"),
        }
        println!();
    }

    if matches!(scenario, Scenario::Auto | Scenario::All) {
        println!("=== DEMO B (auto-commit) ===");
        let state = RunState::new(scenarios::easy_conditions()).with_policies(scenarios::default_policies());
        let result = runtime.start(RunId::parse("demo-b")?, state).await?;
        print_events(&mut events);

        match result {
            RunResult::Completed(state) => {
                println!();
                print_log(&state);
            }
            RunResult::Suspended(run_id) => bail!("demo B unexpectedly suspended ({run_id})"),
            RunResult::Failed(failure) => bail!(failure),
        }
    }

    Ok(())
}

/// Drain whatever the runtime emitted during the last call
fn print_events(events: &mut broadcast::Receiver<ExecutionEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => print_event(&event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "event receiver lagged");
                println!("  … {skipped} events skipped");
            }
            Err(_) => break,
        }
    }
}

fn print_event(event: &ExecutionEvent) {
    match event {
        ExecutionEvent::RunStarted { run_id, .. } => println!("▶️  Run {run_id} started"),
        ExecutionEvent::RunResumed { run_id, decision, .. } => {
            println!("▶️  Run {run_id} resumed ({decision})")
        }
        ExecutionEvent::NodeStarted { node, .. } => println!("  ⚡ {node}"),
        ExecutionEvent::NodeCompleted { node, next, duration_ms, .. } => match next {
            Some(next) => println!("  ✅ {node} → {next} ({duration_ms}ms)"),
            None => println!("  ✅ {node} ({duration_ms}ms)"),
        },
        ExecutionEvent::NodeFailed { node, error, .. } => println!("  ❌ {node} failed: {error}"),
        ExecutionEvent::RunSuspended { node, revision_count, .. } => {
            println!("⏸️  Suspended before {node} (revisions so far: {revision_count})")
        }
        ExecutionEvent::RunCompleted { run_id, .. } => println!("🏁 Run {run_id} completed"),
        ExecutionEvent::RunFailed { reason, .. } => println!("💥 {reason}"),
        ExecutionEvent::RunCancelled { run_id, .. } => println!("🛑 Run {run_id} cancelled"),
        ExecutionEvent::NodeEvent { node, event, .. } => match event {
            NodeEvent::Info { message } => println!("     ℹ️  [{node}] {message}"),
            NodeEvent::Warning { message } => println!("     ⚠️  [{node}] {message}"),
        },
    }
}

fn print_log(state: &RunState) {
    println!("📜 Log:");
    for entry in &state.log {
        println!("   {entry}");
    }
}

fn print_checkpoint(checkpoint: &Checkpoint) {
    println!("📋 Run {}", checkpoint.run_id);
    println!("   Status: {}", checkpoint.status);
    println!("   Pending node: {}", checkpoint.pending_node.as_deref().unwrap_or("-"));
    println!("   Steps: {}", checkpoint.step);
    println!("   Revisions: {}", checkpoint.state.revision_count);
    if let Some(risk) = checkpoint.state.risk_index() {
        println!("   Risk index: {risk:.1}");
    }
    if let Some(failure) = &checkpoint.failure {
        println!("   Failure: {failure}");
    }
    print_log(&checkpoint.state);
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let mut registry = greenruntime::NodeRegistry::new();
    greennodes::register_all(&mut registry, &Toolbox::default());

    for node_type in registry.list_node_types() {
        if let Some(metadata) = registry.get_metadata(&node_type) {
            println!("  • {} ({})", node_type, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", node_type);
        }
    }
}
