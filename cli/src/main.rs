//! CLI entrypoint for tool-relay
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use relay_application::{
    CallbackIntake, Dispatcher, ExecutionLedger, ExecutionLogger, InvocationProgress,
    KeyValueStore, MultiBackendAggregator, NoExecutionLogger, NoInvocationProgress,
    NotificationMediator, ToolBackend, ToolRegistry, WorkerExecutor,
};
use relay_domain::{BackendEndpoint, ExecutionOutcome, ToolDescriptor};
use relay_infrastructure::{
    BackendState, ConfigLoader, FileConfig, HttpBackendClient, HttpCallbackSender, HttpServer,
    JsonlExecutionLogger, LocalTaskQueue, MemoryKeyValueStore, backend_router, builtin_catalog,
    callback_router,
};
use relay_presentation::{
    Cli, Command, ConsoleFormatter, OutputFormat, ProgressReporter, parse_call_args,
};
use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(ExitCode::SUCCESS);
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())?
    };

    let log_dir = cli.log_dir.clone().or_else(|| config.logging.log_dir.clone());
    let _log_guard = init_tracing(cli.verbose, log_dir.as_deref());

    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            warn!("Invalid configuration: {}", issue);
        }
        bail!(
            "invalid configuration:\n  {}",
            issues
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join("\n  ")
        );
    }

    info!("Starting tool-relay");

    match cli.command {
        Command::Serve { bind, slots } => serve(&config, bind, slots).await,
        Command::Tools => list_tools(&config, cli.output).await,
        Command::Call { tool, args, json } => {
            let args = parse_call_args(&args, json.as_deref()).map_err(anyhow::Error::msg)?;
            call(&config, &tool, args, cli.quiet, cli.output).await
        }
        Command::Status { execution_id } => status(&config, &execution_id, cli.output).await,
        Command::Register { descriptor } => register(&config, &descriptor, cli.output).await,
    }
}

/// Stderr logging filtered by verbosity (`RUST_LOG` wins), plus an optional
/// daily-rolling file sink. The guard must live until exit.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "tool-relay.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn execution_logger(config: &FileConfig) -> Arc<dyn ExecutionLogger> {
    match config
        .logging
        .audit_log
        .as_ref()
        .and_then(JsonlExecutionLogger::open)
    {
        Some(logger) => {
            info!("Execution audit log: {}", logger.path().display());
            Arc::new(logger)
        }
        None => Arc::new(NoExecutionLogger),
    }
}

fn backend_client(config: &FileConfig, endpoint: BackendEndpoint) -> Result<Arc<HttpBackendClient>> {
    let timeout = Duration::from_secs(config.client.request_timeout_secs);
    let client = HttpBackendClient::with_timeout(endpoint, timeout)
        .context("failed to create HTTP client")?;
    Ok(Arc::new(client))
}

fn backend_clients(config: &FileConfig) -> Result<Vec<Arc<HttpBackendClient>>> {
    let endpoints = config.client.endpoints()?;
    if endpoints.is_empty() {
        bail!("no backends configured; set [client].backends");
    }
    endpoints
        .into_iter()
        .map(|endpoint| backend_client(config, endpoint))
        .collect()
}

fn primary_backend(config: &FileConfig) -> Result<Arc<HttpBackendClient>> {
    backend_clients(config)?
        .into_iter()
        .next()
        .context("no backends configured")
}

// === serve ===

async fn serve(config: &FileConfig, bind: Option<String>, slots: Option<usize>) -> Result<ExitCode> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid listen address '{}'", bind))?;
    let logger = execution_logger(config);

    // === Dependency Injection ===
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let catalog = Arc::new(builtin_catalog());

    let mut registry = ToolRegistry::new(Arc::clone(&store));
    if let Some(url) = &config.registry.discovery_url {
        let discovery: Arc<dyn ToolBackend> = backend_client(config, BackendEndpoint::parse(url)?)?;
        registry = registry.with_discovery(discovery);
    }
    let registry = Arc::new(registry);
    for descriptor in catalog.descriptors() {
        registry.register(descriptor).await?;
    }

    let ledger = Arc::new(ExecutionLedger::new(store));
    let callbacks = HttpCallbackSender::with_timeout(config.notification.send_timeout())
        .context("failed to create HTTP client")?;
    let worker = Arc::new(
        WorkerExecutor::new(Arc::clone(&catalog), Arc::clone(&ledger), Arc::new(callbacks))
            .with_logger(Arc::clone(&logger)),
    );

    let queue = Arc::new(LocalTaskQueue::with_capacity(config.workers.queue_capacity));
    let mut bound = Vec::new();
    for name in catalog.queues() {
        let n = slots.unwrap_or_else(|| config.workers.slots_for(&name));
        queue.bind(&name, worker.clone(), n);
        bound.push((name, n));
    }

    let dispatcher = Arc::new(
        Dispatcher::new(Arc::clone(&registry), ledger, queue.clone()).with_logger(logger),
    );
    let server = HttpServer::start(addr, backend_router(BackendState { dispatcher, registry }))
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let base_url = config
        .server
        .public_url
        .clone()
        .unwrap_or_else(|| server.base_url());
    println!("{}", ConsoleFormatter::format_serve_banner(&base_url, &bound));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutting down");

    server.stop().await;
    queue.shutdown().await;
    Ok(ExitCode::SUCCESS)
}

// === client commands ===

async fn list_tools(config: &FileConfig, output: OutputFormat) -> Result<ExitCode> {
    let backends: Vec<Arc<dyn ToolBackend>> = backend_clients(config)?
        .into_iter()
        .map(|b| b as Arc<dyn ToolBackend>)
        .collect();
    let aggregator = MultiBackendAggregator::new(backends, Arc::new(NotificationMediator::new()));

    let report = aggregator.discover().await;
    let text = match output {
        OutputFormat::Text => ConsoleFormatter::format_tools(&report.tools, &report.failed_backends),
        OutputFormat::Json => ConsoleFormatter::tools_json(&report.tools, &report.failed_backends),
    };
    println!("{}", text);
    Ok(ExitCode::SUCCESS)
}

async fn call(
    config: &FileConfig,
    tool: &str,
    args: serde_json::Value,
    quiet: bool,
    output: OutputFormat,
) -> Result<ExitCode> {
    let clients = backend_clients(config)?;
    let primary = Arc::clone(&clients[0]);
    let logger = execution_logger(config);

    // Callback listener: only results for executions the backend has finished
    // are accepted.
    let mediator = Arc::new(NotificationMediator::new());
    let intake = CallbackIntake::new(Arc::clone(&mediator))
        .with_lookup(primary)
        .with_logger(logger);
    let callback_addr: SocketAddr = config
        .client
        .callback_bind
        .parse()
        .with_context(|| format!("invalid callback address '{}'", config.client.callback_bind))?;
    let listener = HttpServer::start(callback_addr, callback_router(Arc::new(intake)))
        .await
        .with_context(|| format!("failed to bind callback listener on {}", callback_addr))?;
    let callback_url = config
        .client
        .callback_url
        .clone()
        .unwrap_or_else(|| format!("{}/callback", listener.base_url()));

    let backends: Vec<Arc<dyn ToolBackend>> =
        clients.into_iter().map(|b| b as Arc<dyn ToolBackend>).collect();
    let aggregator = MultiBackendAggregator::new(backends, mediator)
        .with_callback_url(callback_url)
        .with_wait_params(config.notification.to_wait_params());

    let progress: Box<dyn InvocationProgress> = if quiet {
        Box::new(NoInvocationProgress)
    } else {
        Box::new(ProgressReporter::new())
    };
    let result = aggregator
        .invoke_with_progress(tool, args, progress.as_ref())
        .await;
    listener.stop().await;
    let outcome = result?;

    let text = match output {
        OutputFormat::Text => ConsoleFormatter::format_outcome(tool, &outcome),
        OutputFormat::Json => ConsoleFormatter::outcome_json(&outcome),
    };
    println!("{}", text);

    Ok(match outcome {
        ExecutionOutcome::Completed(_) => ExitCode::SUCCESS,
        ExecutionOutcome::Failed(_) => ExitCode::FAILURE,
    })
}

async fn status(config: &FileConfig, execution_id: &str, output: OutputFormat) -> Result<ExitCode> {
    let backend = primary_backend(config)?;
    let Some(record) = backend.status(execution_id).await? else {
        bail!("execution {} not found on {}", execution_id, backend.endpoint());
    };

    let text = match output {
        OutputFormat::Text => ConsoleFormatter::format_record(execution_id, &record),
        OutputFormat::Json => ConsoleFormatter::record_json(execution_id, &record),
    };
    println!("{}", text);
    Ok(ExitCode::SUCCESS)
}

async fn register(config: &FileConfig, path: &Path, output: OutputFormat) -> Result<ExitCode> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let descriptor: ToolDescriptor = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a tool descriptor", path.display()))?;
    descriptor.validate()?;

    let backend = primary_backend(config)?;
    backend.register(&descriptor).await?;

    match output {
        OutputFormat::Text => println!(
            "{}",
            ConsoleFormatter::format_registered(&descriptor.name, backend.endpoint())
        ),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({"ok": true, "name": descriptor.name, "backend": backend.endpoint().as_str()})
        ),
    }
    Ok(ExitCode::SUCCESS)
}
