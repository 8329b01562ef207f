mod debounce;
mod decoder;
mod devices;
mod ingest;
mod recognizer;

use barcode_worker_common::config::{
    default_debounce_ms, default_max_dimension, default_max_probe, FramePolicy, WorkerConfig,
};
use barcode_worker_common::event::OutputEvent;
use clap::Parser;
use debounce::DebounceFilter;
use decoder::FrameDecoder;
use ingest::IngestLoop;
use recognizer::Recognizer;
use tokio::io::BufReader;
use tracing::{error, info};

/// Decode barcodes from base64 JPEG frames on stdin; emit JSON lines on stdout.
#[derive(Debug, Parser)]
#[command(name = "barcode-worker", version)]
struct Cli {
    /// List capture devices as one JSON array line, then exit.
    #[arg(long)]
    list: bool,

    /// Recognition backend: auto, rxing or rqrr.
    #[arg(long, default_value = "auto")]
    backend: String,

    /// Cooldown before the same payload is reported again.
    #[arg(long, default_value_t = default_debounce_ms())]
    debounce_ms: u64,

    /// Which detections of a frame are offered to the debounce filter.
    #[arg(long, default_value = "first-accepted")]
    frame_policy: FramePolicy,

    /// Frames wider or taller than this are skipped.
    #[arg(long, default_value_t = default_max_dimension())]
    max_dimension: u32,

    /// Number of device indices probed by --list.
    #[arg(long, default_value_t = default_max_probe())]
    max_devices: u32,

    /// Log filter for stderr diagnostics (tracing EnvFilter syntax).
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn into_config(self) -> (bool, WorkerConfig) {
        let mut config = WorkerConfig::default();
        config.recognizer.backend = self.backend;
        config.recognizer.frame_policy = self.frame_policy;
        config.debounce.window_ms = self.debounce_ms;
        config.decoder.max_dimension = self.max_dimension;
        config.devices.max_probe = self.max_devices;
        config.logging.level = self.log_level;
        (self.list, config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version are not failures.
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => std::process::exit(fatal(&mut tokio::io::stdout(), &usage_error(&e)).await),
    };
    let (list, config) = cli.into_config();

    let filter = match log_filter(&config.logging.level) {
        Ok(filter) => filter,
        Err(message) => std::process::exit(fatal(&mut tokio::io::stdout(), &message).await),
    };

    // stdout carries the line protocol; diagnostics go to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if list {
        run_listing(&config).await;
        return;
    }

    let code = run_scanner(config).await;
    std::process::exit(code);
}

/// First line of a clap error, without its `error: ` prefix.
fn usage_error(e: &clap::Error) -> String {
    let rendered = e.to_string();
    let first = rendered.lines().next().unwrap_or_default().trim();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

fn log_filter(level: &str) -> Result<tracing_subscriber::EnvFilter, String> {
    tracing_subscriber::EnvFilter::try_new(level)
        .map_err(|e| format!("invalid log level {level:?}: {e}"))
}

async fn run_listing(config: &WorkerConfig) {
    let probe = devices::platform_probe(&config.devices).await;
    let mut stdout = tokio::io::stdout();
    if let Err(e) =
        devices::write_listing(probe.as_ref(), config.devices.max_probe, &mut stdout).await
    {
        error!(error = %e, "failed to write device list");
        std::process::exit(1);
    }
}

/// Build the pipeline and run it. Returns the process exit code.
async fn run_scanner(config: WorkerConfig) -> i32 {
    let mut stdout = tokio::io::stdout();

    if let Err(e) = config.validate() {
        return fatal(&mut stdout, &e.to_string()).await;
    }

    let backend = match recognizer::build_backend(&config.recognizer.backend) {
        Ok(b) => b,
        Err(e) => return fatal(&mut stdout, &e.to_string()).await,
    };

    info!(
        backend = backend.name(),
        debounce_ms = config.debounce.window_ms,
        max_dimension = config.decoder.max_dimension,
        "starting barcode worker"
    );

    let ingest = IngestLoop::new(
        FrameDecoder::new(&config.decoder),
        Recognizer::new(backend),
        DebounceFilter::new(config.debounce.window()),
        config.recognizer.frame_policy,
    );

    let stdin = BufReader::with_capacity(256 * 1024, tokio::io::stdin());
    match ingest.run(stdin, stdout, shutdown_signal()).await {
        Ok(_) => 0,
        Err(e) => {
            error!(error = %e, "ingest loop failed");
            1
        }
    }
}

/// Report a startup failure on the protocol channel. No `ready` is ever sent.
async fn fatal(stdout: &mut tokio::io::Stdout, message: &str) -> i32 {
    error!(error = message, "startup failed");
    if let Err(e) = ingest::emit(stdout, &OutputEvent::error(message)).await {
        error!(error = %e, "failed to write error event");
    }
    1
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
