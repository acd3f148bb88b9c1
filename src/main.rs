use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context as AnyhowContext, Result, anyhow};
use clap::Parser;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use contextsweep::{
    adapters::llm::RigCompletionClient,
    batch::BatchRunner,
    cli::{Cli, Commands, LlmProvider, ModelArgs, ProbeArgs, RunArgs, StatusArgs},
    config::SweepConfig,
    core::{CompletionRequest, ports::CompletionClient},
    paths,
    retry::ResilientCaller,
    status_export::OutputSummary,
};

mod tracing_setup;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = tracing_setup::StdoutFormat::from_flags(cli.verbose, cli.log_json, cli.pretty);
    let task = Task::new(cli.command);
    let _guard = tracing_setup::init(format, cli.verbose, task.run_log());

    match task.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Command failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// A parsed command, with `run` resolved far enough to know where its log goes.
enum Task {
    Run(RunSetup),
    Status(StatusArgs),
    Probe(ProbeArgs),
}

impl Task {
    fn new(command: Commands) -> Self {
        match command {
            Commands::Run(args) => Task::Run(RunSetup::prepare(args)),
            Commands::Status(args) => Task::Status(args),
            Commands::Probe(args) => Task::Probe(args),
        }
    }

    fn run_log(&self) -> Option<&Path> {
        match self {
            Task::Run(setup) => Some(setup.log_path.as_path()),
            _ => None,
        }
    }

    async fn execute(self) -> Result<()> {
        match self {
            Task::Run(setup) => {
                let span = info_span!("run", run_id = %setup.run_id);
                run_command(setup).instrument(span).await
            }
            Task::Status(args) => status_command(args),
            Task::Probe(args) => probe_command(args).await,
        }
    }
}

struct RunSetup {
    run_id: String,
    /// Kept unresolved so a bad configuration is reported through the run log.
    config: Result<SweepConfig>,
    model_args: ModelArgs,
    log_path: PathBuf,
}

impl RunSetup {
    fn prepare(args: RunArgs) -> Self {
        let run_id = Uuid::new_v4().to_string();
        let config = SweepConfig::for_run(&args);
        let output = match &config {
            Ok(config) => config.output.clone(),
            Err(_) => args
                .output
                .clone()
                .unwrap_or_else(|| SweepConfig::default().output),
        };
        Self {
            log_path: paths::run_log_path(&output, &run_id),
            run_id,
            config,
            model_args: args.model,
        }
    }
}

async fn run_command(setup: RunSetup) -> Result<()> {
    let config = setup.config?;
    let caller = build_caller(&config, &setup.model_args)?;

    info!(
        provider = config.provider.as_str(),
        model = %config.model,
        questions = %config.questions.display(),
        contexts = %config.contexts.display(),
        output = %config.output.display(),
        log = %setup.log_path.display(),
        "Starting sweep"
    );

    let runner = BatchRunner::new(caller, config.batch_options());
    let summary = runner
        .run()
        .await
        .with_context(|| format!("Sweep into {} aborted", config.output.display()))?;

    println!(
        "Wrote {} records to {} ({} skipped, {} prompt tokens, {} response tokens).",
        summary.records_written,
        config.output.display(),
        summary.pairs_skipped,
        summary.prompt_tokens,
        summary.response_tokens
    );
    Ok(())
}

fn status_command(args: StatusArgs) -> Result<()> {
    let output = match args.output {
        Some(path) => path,
        None => SweepConfig::load(args.config.as_deref())?.output,
    };
    let summary = OutputSummary::from_path(&output)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Output: {}", summary.path);
    println!("Records: {}", summary.records);
    println!("Distinct questions: {}", summary.distinct_questions);
    println!(
        "Tokens: {} prompt / {} response",
        summary.prompt_tokens, summary.response_tokens
    );
    if summary.by_special_context.is_empty() {
        println!("No records yet.");
    } else {
        println!("Records per special context:");
        for (special_context, count) in &summary.by_special_context {
            println!("- {special_context}: {count}");
        }
        println!("Records per model:");
        for (model, count) in &summary.by_model {
            println!("- {model}: {count}");
        }
    }
    Ok(())
}

async fn probe_command(args: ProbeArgs) -> Result<()> {
    let config = SweepConfig::for_model_args(&args.model)?;
    let caller = build_caller(&config, &args.model)?;

    println!("[probe] sending prompt to model '{}'...", config.model);
    let request = CompletionRequest::new(args.prompt, &config.generation());
    let completion = caller.call(&request).await?;
    let text = completion
        .first_text()
        .ok_or_else(|| anyhow!("Response did not start with a text segment"))?;
    println!("--- LLM Response Start ---\n{text}\n--- LLM Response End ---");
    println!(
        "Tokens: {} prompt / {} response",
        completion.usage.input_tokens, completion.usage.output_tokens
    );
    Ok(())
}

fn build_caller(config: &SweepConfig, args: &ModelArgs) -> Result<ResilientCaller> {
    let api_key = resolve_api_key(args.api_key.clone(), config.provider)?;
    let client: Arc<dyn CompletionClient> =
        Arc::new(RigCompletionClient::new(config.provider, api_key)?);
    Ok(ResilientCaller::new(client, config.backoff_policy()))
}

/// `--api-key`, then the provider's variable, then that variable in the home `.env`.
fn resolve_api_key(cli_value: Option<String>, provider: LlmProvider) -> Result<String> {
    let env_var = provider.env_var();
    normalize_key(cli_value)
        .or_else(|| normalize_key(std::env::var(env_var).ok()))
        .or_else(|| paths::home_env_path().and_then(|path| env_file_value(&path, env_var)))
        .ok_or_else(|| anyhow!("Missing API key: pass --api-key or set {env_var}"))
}

fn normalize_key(value: Option<String>) -> Option<String> {
    value
        .map(|candidate| candidate.trim().to_string())
        .filter(|candidate| !candidate.is_empty())
}

/// Reads `name` from a `.env` file without exporting anything into the environment.
fn env_file_value(path: &Path, name: &str) -> Option<String> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(err) if err.not_found() => return None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Ignoring unreadable env file");
            return None;
        }
    };
    for entry in entries {
        match entry {
            Ok((key, value)) if key == name => return normalize_key(Some(value)),
            Ok(_) => {}
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Ignoring malformed env file");
                return None;
            }
        }
    }
    None
}
