//! # docqueue CLI
//!
//! Command-line interface for the docqueue document-store queue.
//!
//! This module provides CLI commands for:
//! - Sending messages into the configured store
//! - Listing pending (unprocessed) messages
//! - Running the watcher and consumers until interrupted
//! - A scripted demonstration run against an in-memory store
//! - Showing the resolved configuration

use clap::{Parser, Subcommand};
use docqueue_core::stores::{FilesystemStore, InMemoryStore};
use docqueue_core::{
    ConfigurationError, DocumentQueue, LoggingHandler, Message, MessageHandler, MessageId,
    MessageStore, MetricsSnapshot, QueueError, RoleName, StoreError, Supervisor,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod settings;

pub use settings::{
    load_settings, load_settings_from, LogFormat, LoggingSettings, Settings, SettingsError,
    StoreKind, StoreSettings,
};

// ============================================================================
// CLI Structure
// ============================================================================

/// docqueue CLI - at-least-once work queue over a document store
#[derive(Parser)]
#[command(name = "docqueue")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "At-least-once work queue over a document store")]
#[command(
    long_about = "docqueue stores messages as documents, polls for unprocessed ones and hands each to a consumer that marks it processed"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DOCQUEUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level, overrides `logging.level`
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Insert one message per body into the store
    Send {
        /// Message bodies
        #[arg(required = true, num_args = 1..)]
        bodies: Vec<String>,
    },

    /// List unprocessed messages
    Pending {
        /// Maximum number of messages to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run the watcher and consumers until Ctrl-C or the duration elapses
    Work {
        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Number of consumers, overrides `consumers.count`
        #[arg(long)]
        consumers: Option<usize>,
    },

    /// Run a scripted producer, watcher and consumer against an in-memory store
    Demo {
        /// Seconds before the demo is cancelled
        #[arg(short, long, default_value = "15")]
        deadline: u64,
    },

    /// Show the resolved configuration
    Config {
        /// Output format for configuration
        #[arg(short = 'f', long, default_value = "yaml")]
        format: ConfigFormat,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

/// Configuration format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

// ============================================================================
// Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] SettingsError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {message}")]
    Output { message: String },

    #[error("Failed to initialize logging: {message}")]
    Logging { message: String },
}

impl From<ConfigurationError> for CliError {
    fn from(error: ConfigurationError) -> Self {
        CliError::Configuration(SettingsError::Invalid(error))
    }
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Configuration(_) => 1,
            CliError::Queue(_) => 2,
            CliError::Store(_) => 3,
            CliError::InvalidArgument { .. } => 4,
            CliError::Io(_) => 5,
            CliError::Output { .. } => 6,
            CliError::Logging { .. } => 7,
        }
    }
}

// ============================================================================
// CLI Implementation
// ============================================================================

/// Parse the command line and run the selected command
pub async fn run_cli() -> Result<(), CliError> {
    run(Cli::parse()).await
}

/// Run an already-parsed command line
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    if cli.json_logs {
        settings.logging.format = LogFormat::Json;
    }

    init_logging(&settings.logging)?;

    match cli.command {
        Commands::Send { bodies } => {
            let store = open_store(&settings.store).await?;
            for id in send_messages(store, &bodies).await? {
                println!("{id}");
            }
        }
        Commands::Pending { limit, format } => {
            let store = open_store(&settings.store).await?;
            let messages = pending_messages(store.as_ref(), limit).await?;
            println!("{}", render_pending(&messages, format)?);
        }
        Commands::Work {
            duration,
            consumers,
        } => {
            if let Some(count) = consumers {
                if count == 0 {
                    return Err(CliError::InvalidArgument {
                        message: "--consumers must be at least 1".to_string(),
                    });
                }
                settings.consumers.count = count;
            }

            let store = open_store(&settings.store).await?;
            let shutdown = shutdown_signal(duration.map(Duration::from_secs));
            let metrics = run_work(store, &settings, shutdown).await?;
            println!("{}", render_metrics(&metrics));
        }
        Commands::Demo { deadline } => {
            let shutdown = shutdown_signal(Some(Duration::from_secs(deadline)));
            let metrics = run_demo(&settings, DEMO_SCRIPT, shutdown).await?;
            println!("{}", render_metrics(&metrics));
        }
        Commands::Config { format } => {
            println!("{}", render_settings(&settings, format)?);
        }
    }

    Ok(())
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr so
/// command output on stdout stays machine-readable.
pub fn init_logging(logging: &LoggingSettings) -> Result<(), CliError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| CliError::Logging {
            message: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| CliError::Logging {
        message: e.to_string(),
    })
}

/// Open the store selected by the settings
pub async fn open_store(settings: &StoreSettings) -> Result<Arc<dyn MessageStore>, StoreError> {
    match settings.kind {
        StoreKind::Memory => {
            warn!("Using in-memory store; messages are discarded on exit");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreKind::Filesystem => {
            let store = FilesystemStore::new(settings.path.clone()).await?;
            info!(path = %settings.path.display(), "Opened filesystem store");
            Ok(Arc::new(store))
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Insert one message per body, returning the assigned ids in order
pub async fn send_messages(
    store: Arc<dyn MessageStore>,
    bodies: &[String],
) -> Result<Vec<MessageId>, CliError> {
    let queue = DocumentQueue::new(store, Default::default())?;
    let producer = queue.producer();

    let mut ids = Vec::with_capacity(bodies.len());
    for body in bodies {
        ids.push(producer.send(body.clone()).await?);
    }

    info!(count = ids.len(), "Messages sent");
    Ok(ids)
}

pub async fn pending_messages(
    store: &dyn MessageStore,
    limit: usize,
) -> Result<Vec<Message>, CliError> {
    if limit == 0 {
        return Err(CliError::InvalidArgument {
            message: "--limit must be at least 1".to_string(),
        });
    }

    Ok(store.find_unprocessed(limit).await?)
}

/// Run the watcher and the configured number of consumers until `shutdown` resolves
///
/// A failing role cancels the others and its error is returned.
pub async fn run_work<F>(
    store: Arc<dyn MessageStore>,
    settings: &Settings,
    shutdown: F,
) -> Result<MetricsSnapshot, CliError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let queue = DocumentQueue::new(store, settings.watcher.to_config())?;
    let mut supervisor = Supervisor::new();

    supervisor.spawn_watcher(queue.watcher());
    let handler: Arc<dyn MessageHandler> = Arc::new(LoggingHandler);
    for index in 0..settings.consumers.count {
        supervisor.spawn_consumer(
            format!("consumer-{index}"),
            queue.consumer(Arc::clone(&handler)),
        );
    }
    spawn_shutdown(&mut supervisor, shutdown);

    info!(
        consumers = settings.consumers.count,
        page_size = settings.watcher.page_size,
        poll_interval_ms = settings.watcher.poll_interval_ms,
        "Queue running"
    );

    supervisor.wait().await?;
    Ok(queue.metrics())
}

/// One step of the demo producer: wait `delay`, then send `body`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoStep {
    pub body: &'static str,
    pub delay: Duration,
}

impl DemoStep {
    pub const fn new(body: &'static str, delay_ms: u64) -> Self {
        Self {
            body,
            delay: Duration::from_millis(delay_ms),
        }
    }
}

/// Lifecycle messages emitted by the demo producer
pub const DEMO_SCRIPT: &[DemoStep] = &[
    DemoStep::new("uninitialized", 750),
    DemoStep::new("starting", 500),
    DemoStep::new("started", 1250),
    DemoStep::new("processing 1", 250),
    DemoStep::new("processing 2", 250),
    DemoStep::new("processing 3", 250),
    DemoStep::new("processing 4", 50),
    DemoStep::new("processing 5", 50),
    DemoStep::new("processing 6", 50),
    DemoStep::new("processing 7", 50),
    DemoStep::new("processing 8", 50),
    DemoStep::new("processing 9", 50),
    DemoStep::new("processing 10", 50),
    DemoStep::new("processing 11", 50),
    DemoStep::new("processing 12", 50),
    DemoStep::new("processing 13", 50),
    DemoStep::new("processing 14", 50),
    DemoStep::new("stopping", 750),
    DemoStep::new("stopped", 1000),
];

/// Run `script` through a producer, watcher and consumers on an in-memory store
pub async fn run_demo<F>(
    settings: &Settings,
    script: &'static [DemoStep],
    shutdown: F,
) -> Result<MetricsSnapshot, CliError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let queue = DocumentQueue::new(Arc::new(InMemoryStore::new()), settings.watcher.to_config())?;
    let mut supervisor = Supervisor::new();

    let producer = queue.producer();
    let token = supervisor.token();
    supervisor.spawn(RoleName::new("producer"), async move {
        for step in script {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                _ = tokio::time::sleep(step.delay) => {}
            }
            producer.send(step.body).await?;
        }
        info!(count = script.len(), "Demo script complete");
        Ok(())
    });

    supervisor.spawn_watcher(queue.watcher());
    let handler: Arc<dyn MessageHandler> = Arc::new(LoggingHandler);
    for index in 0..settings.consumers.count {
        supervisor.spawn_consumer(
            format!("consumer-{index}"),
            queue.consumer(Arc::clone(&handler)),
        );
    }
    spawn_shutdown(&mut supervisor, shutdown);

    supervisor.wait().await?;
    Ok(queue.metrics())
}

/// Cancel every role once `shutdown` resolves
fn spawn_shutdown<F>(supervisor: &mut Supervisor, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = supervisor.token();
    supervisor.spawn(RoleName::new("shutdown"), async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = shutdown => {
                info!("Shutdown requested");
                token.cancel();
            }
        }
        Ok(())
    });
}

/// Resolves on Ctrl-C or once `duration` has elapsed
async fn shutdown_signal(duration: Option<Duration>) {
    let elapsed = async move {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(elapsed);

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Received Ctrl-C"),
            Err(e) => {
                warn!(error = %e, "Unable to listen for Ctrl-C");
                (&mut elapsed).await;
            }
        },
        _ = &mut elapsed => info!("Run duration elapsed"),
    }
}

// ============================================================================
// Output
// ============================================================================

pub fn render_pending(messages: &[Message], format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(messages).map_err(|e| {
            CliError::Output {
                message: e.to_string(),
            }
        }),
        OutputFormat::Text => {
            if messages.is_empty() {
                return Ok("No pending messages".to_string());
            }

            let lines: Vec<String> = messages
                .iter()
                .map(|message| {
                    let body = match message.body_str() {
                        Some(body) => body.to_string(),
                        None => format!("<{} bytes>", message.body.len()),
                    };
                    format!("{}  {}  {}", message.id, message.created_at, body)
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

pub fn render_settings(settings: &Settings, format: ConfigFormat) -> Result<String, CliError> {
    let rendered = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(settings).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::to_string_pretty(settings).map_err(|e| e.to_string()),
    };
    rendered.map_err(|message| CliError::Output { message })
}

pub fn render_metrics(metrics: &MetricsSnapshot) -> String {
    format!(
        "sent: {}, scans: {}, dispatched: {}, processed: {}",
        metrics.messages_sent, metrics.scans, metrics.messages_dispatched, metrics.messages_processed
    )
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
