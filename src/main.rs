use anyhow::{Context, Result};
use stations::cache::InMemoryCacheStore;
use stations::cli::commands::{HistoryCommand, RunCommand, StationsCommand, ValidateCommand};
use stations::cli::output::*;
use stations::cli::{Cli, Command};
use stations::core::OrchestratorConfig;
use stations::execution::{ExecutionEvent, ExecutionTracker, PipelineOrchestrator};
use stations::model::{GeminiClient, GeminiClientConfig};
use stations::persistence::{create_summary, ExecutionSummary, InMemoryPersistence, PersistenceBackend};
use stations::stations::{
    generate_execution_id, SevenStationsOptions, SevenStationsOrchestrator, StationCatalogue,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const PIPELINE_NAME: &str = "seven-stations";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_stations(cmd, &cli).await?,
        Command::Stations(cmd) => list_stations(cmd, &cli)?,
        Command::Validate(cmd) => validate_config(cmd)?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<OrchestratorConfig> {
    match &cli.config {
        Some(path) => OrchestratorConfig::from_file(path).context("Failed to load config"),
        None => Ok(OrchestratorConfig::default()),
    }
}

async fn open_history() -> Result<Arc<dyn PersistenceBackend>> {
    #[cfg(feature = "sqlite")]
    {
        let store = stations::persistence::SqliteExecutionStore::with_default_path().await?;
        Ok(Arc::new(store))
    }
    #[cfg(not(feature = "sqlite"))]
    {
        Ok(Arc::new(InMemoryPersistence::new()))
    }
}

async fn run_stations(cmd: &RunCommand, cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    if let Some(strategy) = cmd.strategy {
        config.strategy = strategy.into();
        config.validate()?;
    }

    let script_path = Path::new(&cmd.script);
    let script_content = std::fs::read_to_string(script_path)
        .with_context(|| format!("Failed to read script {}", script_path.display()))?;
    let script_id = cmd.script_id.clone().unwrap_or_else(|| {
        script_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script".to_string())
    });

    if let Ok(model) = std::env::var("GEMINI_MODEL") {
        config.model = model;
        config.validate()?;
    }
    let client_config = GeminiClientConfig::from_env()?.with_model(config.model.clone());
    let gateway = Arc::new(GeminiClient::new(client_config)?);

    let store: Arc<dyn PersistenceBackend> = if cmd.no_history {
        Arc::new(InMemoryPersistence::new())
    } else {
        open_history().await?
    };

    let pipeline = PipelineOrchestrator::new(
        gateway,
        Arc::new(InMemoryCacheStore::new()),
        Arc::new(ExecutionTracker::new()),
        &config,
    );
    let orchestrator = Arc::new(SevenStationsOrchestrator::new(pipeline, &config));

    let mut options = SevenStationsOptions::new().with_execution_id(generate_execution_id(&script_id));
    if !cmd.skip.is_empty() {
        options = options.with_skip_stations(cmd.skip.clone());
    }
    if !cmd.priority.is_empty() {
        options = options.with_priority_stations(cmd.priority.clone());
    }
    if let Some(ms) = cmd.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }

    let planned = orchestrator.plan_steps(&options).len();
    if !cmd.json {
        println!(
            "{} Analysing {} through {} stations",
            INFO,
            style(&script_id).bold(),
            style(planned).cyan()
        );

        let progress = create_progress_bar(planned);
        orchestrator
            .add_event_handler(move |event| {
                match &event {
                    ExecutionEvent::StepStarted { step_id, .. } => {
                        progress.set_message(step_id.clone());
                    }
                    ExecutionEvent::StepCompleted { .. } => progress.inc(1),
                    ExecutionEvent::PipelineFinished { .. } => progress.finish_and_clear(),
                    _ => {}
                }
                progress.println(format_execution_event(&event));
            })
            .await;
    }

    // Ctrl-C cancels the run; in-flight stations finish but are not recorded
    let execution_id = options.execution_id.clone().unwrap_or_default();
    let interrupt = {
        let orchestrator = orchestrator.clone();
        let execution_id = execution_id.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling {}", execution_id);
                orchestrator.cancel_execution(&execution_id).await;
            }
        })
    };

    let execution = orchestrator
        .run_seven_stations_pipeline(&script_id, &script_content, options)
        .await;
    interrupt.abort();

    if !cmd.no_history {
        match orchestrator.get_execution(&execution.id).await {
            Some(record) => {
                let summary = create_summary(&record, PIPELINE_NAME);
                store.save_execution(&summary).await?;
            }
            None => warn!("Execution {} missing from tracker; not saved", execution.id),
        }
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&execution)?);
    } else {
        println!("{}", format_seven_stations_report(&execution, 20));
        if !cmd.no_history {
            println!(
                "\n{} Execution saved to history (ID: {})",
                INFO,
                style(&execution.id).dim()
            );
        }
    }

    if !execution.overall_success {
        error!(
            "Analysis failed: {}",
            execution.failure.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }

    Ok(())
}

fn list_stations(cmd: &StationsCommand, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let catalogue = StationCatalogue::from_config(config.stations.as_deref());

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(catalogue.all())?);
        return Ok(());
    }

    println!("{} Stations ({}):", INFO, catalogue.len());
    for (index, station) in catalogue.all().iter().enumerate() {
        println!("{}", format_station(index, station));
    }
    Ok(())
}

fn validate_config(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating configuration...", INFO);

    match OrchestratorConfig::from_file(&cmd.file) {
        Ok(config) => {
            let catalogue = StationCatalogue::from_config(config.stations.as_deref());
            println!("{} Configuration is valid!", CHECK);
            println!("  Model: {}", format_model(&config.model));
            println!("  Strategy: {:?}", config.scheduling_strategy());
            println!("  Stations: {}", style(catalogue.len()).cyan());
            println!(
                "  Cache: ttl {}s, stale {}s, revalidate {}",
                config.cache_ttl_secs, config.stale_ttl_secs, config.stale_while_revalidate
            );

            if cmd.json {
                println!("\n{}", serde_json::to_string_pretty(&config)?);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = open_history().await?;

    if let Some(execution_id) = &cmd.execution_id {
        match store.load_execution(execution_id).await? {
            Some(summary) => print_execution_details(&summary, cmd.json)?,
            None => println!("{} Execution not found", CROSS),
        }
        return Ok(());
    }

    let executions = match &cmd.pipeline {
        Some(pipeline_name) => {
            let mut executions = store.list_executions(pipeline_name).await?;
            executions.reverse();
            executions.truncate(cmd.limit);
            executions
        }
        None => store.list_recent(cmd.limit).await?,
    };

    if cmd.json {
        let data = serde_json::json!({ "executions": executions });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if executions.is_empty() {
        println!("{} No executions found", INFO);
        return Ok(());
    }

    println!("{} Execution history (showing latest {}):", INFO, cmd.limit);
    for summary in &executions {
        println!("  {}", format_execution_summary(summary));
    }

    Ok(())
}

fn print_execution_details(summary: &ExecutionSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("{} Execution Details", INFO);
    println!("  ID: {}", style(&summary.execution_id).cyan());
    println!("  Pipeline: {}", style(&summary.pipeline_name).bold());
    println!("  Status: {}", format_status(summary.status));
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Progress: {} ({} ok, {} failed of {})",
        style(format!("{:.0}%", summary.progress)).cyan(),
        summary.completed_steps,
        summary.failed_steps,
        summary.total_steps
    );
    if let Some(failure) = &summary.failure {
        println!("  Failure: {}", style(failure).red());
    }

    Ok(())
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
