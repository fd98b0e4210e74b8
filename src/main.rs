use anyhow::{Context, Result};
use azrg::azure::auth::{WorkloadIdentityOptions, GRAPH_SCOPE};
use azrg::azure::client::ArmClient;
use azrg::azure::http::{format_azure_error, AzureHttpClient};
use azrg::azure::resource_groups::{self, ListOptions, ResourceGroup};
use azrg::config::{Config, Overrides, Settings};
use azure_core::auth::TokenCredential;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

/// Exit status for any error
const EXIT_FAILURE: u8 = 1;
/// Exit status after Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

/// List Azure resource groups using a workload identity
#[derive(Parser, Debug)]
#[command(name = "azrg", version = azrg::VERSION, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Workload identity client id (overrides WI_CLIENT_ID / AZURE_CLIENT_ID)
    #[arg(long, global = true)]
    client_id: Option<String>,

    /// Resource Manager endpoint
    #[arg(long, global = true)]
    arm_endpoint: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Config file (defaults to <config dir>/azrg/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List resource groups in the subscription (default)
    List(ListArgs),
    /// Print an access token for a scope
    Token(TokenArgs),
}

#[derive(ClapArgs, Debug, Default)]
struct ListArgs {
    /// Subscription id (overrides SUB_ID / AZURE_SUBSCRIPTION_ID)
    #[arg(short, long)]
    subscription: Option<String>,

    /// OData filter, e.g. "tagName eq 'env'"
    #[arg(long)]
    filter: Option<String>,

    /// Page size hint
    #[arg(long)]
    top: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(ClapArgs, Debug)]
struct TokenArgs {
    /// Scope to request
    #[arg(long, default_value = GRAPH_SCOPE)]
    scope: String,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Logs go to stderr, and to `log_file` when given. RUST_LOG overrides `level`
/// for both.
fn setup_logging(
    level: LogLevel,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(tracing_level).into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            (Some(file_layer(non_blocking)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    tracing::debug!("azrg {} started with log level: {:?}", azrg::VERSION, level);
    if let Some(path) = log_file {
        tracing::debug!("Log file: {:?}", path);
    }

    Ok(guard)
}

/// Plain-text layer for the log file; the registry's filter decides what reaches it
fn file_layer<S, W>(writer: W) -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    tokio::select! {
        result = run(args) => ExitCode::from(exit_status(result)),
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

/// Report a fatal error on stderr and map the outcome to an exit status
fn exit_status(result: Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            tracing::debug!("{err:?}");
            eprintln!("Error: {}", format_azure_error(&err));
            EXIT_FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    let command = args.command.unwrap_or(Command::List(ListArgs::default()));
    let subscription_id = match &command {
        Command::List(list) => list.subscription.clone(),
        Command::Token(_) => None,
    };

    let settings = config.resolve(
        Overrides {
            subscription_id,
            client_id: args.client_id,
            arm_endpoint: args.arm_endpoint,
            timeout_secs: args.timeout,
        },
        |key| std::env::var(key).ok(),
    )?;

    let credential = WorkloadIdentityOptions::from_env(settings.client_id.clone())
        .context("Failed to configure workload identity credential")?
        .credential()
        .await?;

    match command {
        Command::List(list) => list_groups(&settings, credential, &list).await,
        Command::Token(token) => print_token(credential.as_ref(), &token.scope).await,
    }
}

async fn list_groups(
    settings: &Settings,
    credential: Arc<dyn TokenCredential>,
    args: &ListArgs,
) -> Result<()> {
    let subscription_id = settings.require_subscription()?;
    tracing::info!("Using subscription: {}", subscription_id);

    let client = ArmClient::new(
        subscription_id,
        credential,
        AzureHttpClient::new(settings.timeout)?,
        settings.arm_endpoint.clone(),
    )?;

    let options = ListOptions {
        filter: args.filter.clone(),
        top: args.top,
    };
    let groups = resource_groups::list_resource_groups(&client, &options).await?;

    let mut stdout = std::io::stdout().lock();
    render(&groups, args.output, &mut stdout)?;
    stdout.flush()?;

    tracing::info!("done");
    Ok(())
}

/// Write the listing in the requested format
fn render(groups: &[ResourceGroup], format: OutputFormat, out: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for group in groups {
                writeln!(out, "Resource Group Name: {}", group.name)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, groups)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

async fn print_token(credential: &dyn TokenCredential, scope: &str) -> Result<()> {
    let token = credential
        .get_token(&[scope])
        .await
        .with_context(|| format!("Failed to acquire token for {}", scope))?;
    tracing::info!("Token for {} expires at {}", scope, token.expires_on);
    println!("{}", token.token.secret());
    Ok(())
}
