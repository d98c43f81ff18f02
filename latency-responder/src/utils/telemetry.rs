use std::{io::IsTerminal as _, path::Path};

use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing::{
        self,
        metadata::LevelFilter,
        subscriber::{EnvFilter, fmt::writer::BoxMakeWriter},
    },
};

#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig<'a> {
    /// DEBUG instead of INFO as the default directive
    pub verbose: bool,
    /// human friendly (multi-line) format
    pub pretty: bool,
    /// append to this file instead of writing to stderr
    pub output: Option<&'a Path>,
}

/// Set up the global tracing subscriber.
///
/// `RUST_LOG` always takes precedence over the default directive.
/// `None` is the same as the default [`TelemetryConfig`].
pub fn init_tracing(cfg: Option<TelemetryConfig<'_>>) -> Result<(), BoxError> {
    let cfg = cfg.unwrap_or_default();

    let default_level = if cfg.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let ansi = cfg.output.is_none() && std::io::stderr().is_terminal();

    let subscriber = tracing::subscriber::fmt()
        .with_ansi(ansi)
        .with_env_filter(env_filter)
        .with_writer(new_make_writer(cfg.output)?);

    if cfg.pretty {
        subscriber.pretty().try_init()?;
    } else {
        subscriber.try_init()?;
    }

    tracing::info!(?default_level, "tracing is set up");
    Ok(())
}

fn new_make_writer(output: Option<&Path>) -> Result<BoxMakeWriter, BoxError> {
    let Some(path) = output else {
        return Ok(BoxMakeWriter::new(std::io::stderr));
    };

    let file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .context("open log file")
        .with_context_debug_field("path", || path.to_owned())?;

    Ok(BoxMakeWriter::new(file))
}
