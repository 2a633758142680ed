use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use audiocat::config::{Config, ExecutionMode};
use audiocat::dispatch::HttpJobRunner;
use audiocat::execution::{DeferredDispatcher, ExecutionStrategy, InlineExecutor};
use audiocat::job::{ConcatenateRequest, Job};
use audiocat::pipeline::{FfmpegMerger, HttpFetcher, Pipeline};
use audiocat::server::{self, AppState};
use audiocat::storage::S3Store;

#[derive(Parser)]
#[command(name = "audiocat", version, about = "Concatenate remote audio files and publish the result")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Emit logs as JSON (for containerized deployments).
    #[arg(long, global = true, env = "AUDIOCAT_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve,
    /// Execute a single concatenation job and exit.
    ///
    /// The payload is the original request JSON, read from the
    /// JOB_INPUT_DATA environment variable (as handed over by the job
    /// runner) unless --payload-file is given.
    RunJob {
        #[arg(long)]
        payload_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = Config::from_env().context("failed to load configuration")?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::RunJob { payload_file } => run_job(config, payload_file).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let strategy = build_strategy(&config).await?;
    let state = Arc::new(AppState {
        strategy,
        api_key: config.server.api_key.clone(),
    });
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    tracing::info!(
        addr = %config.server.bind_addr,
        mode = %config.execution.mode,
        "audiocat listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn run_job(config: Config, payload_file: Option<PathBuf>) -> anyhow::Result<()> {
    let raw = match payload_file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read payload file {}", path.display()))?,
        None => std::env::var("JOB_INPUT_DATA")
            .context("JOB_INPUT_DATA is not set and no --payload-file was given")?,
    };

    let request: ConcatenateRequest =
        serde_json::from_str(&raw).context("job payload is not a valid concatenation request")?;
    let job = Job::try_new(request)?;
    let job_id = job.id;

    let pipeline = build_pipeline(&config).await?;
    let output_url = pipeline.run(&job).await?;

    // The runner captures stdout; keep it to the one-line result.
    println!(
        "{}",
        serde_json::json!({ "job_id": job_id, "status": "success", "output_url": output_url })
    );
    Ok(())
}

async fn build_strategy(config: &Config) -> anyhow::Result<Arc<dyn ExecutionStrategy>> {
    match config.execution.mode {
        ExecutionMode::Inline => {
            let pipeline = build_pipeline(config).await?;
            Ok(Arc::new(InlineExecutor::new(Arc::new(pipeline))))
        }
        ExecutionMode::Deferred => {
            let runner = HttpJobRunner::new(&config.runner)?;
            Ok(Arc::new(DeferredDispatcher::new(
                Arc::new(runner),
                config.runner.job_name.clone(),
            )))
        }
    }
}

async fn build_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let store = S3Store::connect(&config.storage).await?;
    Ok(Pipeline::new(
        Arc::new(HttpFetcher::new()),
        Arc::new(FfmpegMerger::new(&config.merge)),
        Arc::new(store),
        config.scratch.root.clone(),
        config.storage.key_prefix.clone(),
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
