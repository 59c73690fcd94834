use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Marksheet sidecar: newline-delimited JSON requests on stdin, responses on stdout.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// Workspace directory to open at startup (same as `workspace.select`).
    #[arg(long, env = "MARKSHEETD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log filter directive, e.g. `info` or `marksheetd=debug`. Falls back to RUST_LOG.
    #[arg(long, env = "MARKSHEETD_LOG")]
    pub log_filter: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "MARKSHEETD_LOG_JSON")]
    pub log_json: bool,
}

/// Logs go to stderr; stdout carries the protocol.
pub fn init_tracing(config: &Config) {
    let filter = match config.log_filter.as_deref() {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
