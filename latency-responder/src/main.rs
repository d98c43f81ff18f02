#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

use std::{path::PathBuf, time::Duration};

use rama::{
    error::BoxError,
    graceful::{self, ShutdownGuard},
    net::{address::SocketAddress, socket::Interface},
    telemetry::tracing::{self, Instrument as _},
};

#[cfg(target_family = "unix")]
use rama::error::ErrorContext as _;

use clap::Parser;

pub mod config;
pub mod server;
pub mod utils;

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;


pub const DEFAULT_BIND_INTERFACE: &str = "0.0.0.0:8080";

/// CLI arguments for configuring the latency responder.
#[derive(Debug, Clone, Parser)]
#[command(name = "latency-responder")]
#[command(bin_name = "latency-responder")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// network interface to bind the responder to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        default_value = DEFAULT_BIND_INTERFACE
    )]
    pub bind: Interface,

    #[command(flatten)]
    pub config: config::ConfigOverrides,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 1.)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,

    #[cfg(target_family = "unix")]
    /// Set the limit of max open file descriptors for this process.
    #[arg(long, value_name = "N", default_value_t = 262_144)]
    pub ulimit: u64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(Some(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    }))?;

    #[cfg(target_family = "unix")]
    utils::os::raise_nofile(args.ulimit).context("set file descriptor limit")?;

    let base_shutdown_signal = graceful::default_signal();
    if let Err(err) = run_with_args(base_shutdown_signal, args, None).await {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}

/// Runs the latency responder and blocks until
/// a critical error occurs or the (graceful) shutdown has been initiated.
///
/// This entry point is used by both the (binary) `main` function as well as
/// for the e2e test suite found in the test module.
async fn run_with_args<F>(
    base_shutdown_signal: F,
    args: Args,
    bound_addr_tx: Option<tokio::sync::oneshot::Sender<SocketAddress>>,
) -> Result<(), BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    let graceful_timeout = (args.graceful > 0.).then(|| Duration::from_secs_f64(args.graceful));

    let cfg = config::ResponderConfig::resolve(args.config.clone());

    let (error_tx, error_rx) = tokio::sync::mpsc::channel::<BoxError>(1);
    let (fatal_tx, mut fatal_rx) = tokio::sync::oneshot::channel::<BoxError>();
    let graceful = graceful::Shutdown::new(new_shutdown_signal(
        error_rx,
        fatal_tx,
        base_shutdown_signal,
    ));

    graceful.spawn_task_fn(move |guard| {
        run_responder_server(args.bind, guard, cfg, error_tx, bound_addr_tx)
    });

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };

    tracing::info!("gracefully shutdown with a delay of: {delay:?}");

    match fatal_rx.try_recv() {
        Ok(err) => Err(err),
        Err(_) => Ok(()),
    }
}

async fn run_responder_server(
    bind: Interface,
    guard: ShutdownGuard,
    cfg: config::ResponderConfig,
    error_tx: tokio::sync::mpsc::Sender<BoxError>,
    bound_addr_tx: Option<tokio::sync::oneshot::Sender<SocketAddress>>,
) {
    tracing::info!("spawning latency responder server...");
    if let Err(err) = server::run_responder_server(bind, guard, cfg, bound_addr_tx)
        .instrument(tracing::debug_span!(
            "responder server lifetime",
            server.service.name = utils::env::project_name(),
            otel.kind = "server",
            network.protocol.name = "http",
        ))
        .await
    {
        tracing::error!("responder server exited with an error: {err}");
        let _ = error_tx.send(err).await;
    }
}

fn new_shutdown_signal(
    error_rx: tokio::sync::mpsc::Receiver<BoxError>,
    fatal_tx: tokio::sync::oneshot::Sender<BoxError>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        let mut mut_error_rx = error_rx;
        let mut signal = Box::pin(base_shutdown_signal);

        tokio::select! {
            _ = signal.as_mut() => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            err = mut_error_rx.recv() => {
                if let Some(err) = err {
                    tracing::error!("fatal err received: {err}; abort");
                    let _ = fatal_tx.send(err);
                } else {
                    tracing::info!("wait for default signal, no error was received");
                    signal.await;
                    tracing::debug!("default signal triggered: init graceful shutdown");
                }
            }
        }
    }
}
