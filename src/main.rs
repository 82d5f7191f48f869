#![forbid(unsafe_code)]

//! `line-client` — one-shot local IPC client binary.
//!
//! Loads configuration, connects to the Unix domain socket, sends the
//! request line, and prints the response line (or an EOF notice) to stdout.
//! Diagnostics go to stderr.

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use line_client::{AppError, ClientConfig, ConfigOverrides, LineClient, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "line-client",
    about = "Send one line to a local socket and print the reply",
    version,
    long_about = None
)]
struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Unix domain socket path (overrides `socket_path`).
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Request line to send; a trailing newline is added when missing.
    #[arg(long)]
    request: Option<String>,

    /// Read deadline in seconds, 0 to wait forever (overrides
    /// `read_timeout_seconds`).
    #[arg(long)]
    timeout_seconds: Option<u64>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Log progress at info level.
    #[arg(short, long, conflicts_with_all = ["quiet", "debug"])]
    verbose: bool,

    /// Log errors only.
    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,

    /// Log everything down to debug level.
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    /// Default filter directive when `RUST_LOG` is not set.
    fn default_log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    /// Command-line values that take precedence over the config file.
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            socket_path: self.socket.clone(),
            request: self.request.clone(),
            read_timeout_seconds: self.timeout_seconds,
        }
    }
}

fn main() {
    let args = Cli::parse();

    if let Err(err) = init_tracing(args.log_format, args.default_log_level()) {
        eprintln!("Error: {err}");
        process::exit(1);
    }

    let outcome = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(&args)));

    if let Err(err) = outcome {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

async fn run(args: &Cli) -> Result<()> {
    let config = ClientConfig::resolve(args.config.as_deref(), &args.overrides())?;
    let request = config.request_payload()?;
    let client = LineClient::new(&config);
    info!(socket = %client.socket_path().display(), "configuration loaded");

    let ct = CancellationToken::new();
    let signals = cancel_on_signal(ct.clone())?;

    let line = client.exchange(&request, &ct).await;
    ct.cancel();
    let _ = signals.await;
    let line = line?;

    if line.saw_eof {
        info!(partial_bytes = line.bytes.len(), "peer closed the connection");
    }
    println!("{}", line.render());
    Ok(())
}

/// Cancel `ct` on SIGINT or SIGTERM so a stalled read can be abandoned.
///
/// The task exits on its own once `ct` is cancelled by the caller.
fn cancel_on_signal(ct: CancellationToken) -> Result<JoinHandle<()>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        let received = tokio::select! {
            () = ct.cancelled() => return,
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        };
        warn!(signal = received, "cancelling exchange");
        ct.cancel();
    }))
}

fn init_tracing(log_format: LogFormat, default_level: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
