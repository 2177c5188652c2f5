//! Logging setup.
//!
//! The crate logs through `tracing`; every event carries the local `rank` as a
//! field. Call [`init`] once early in `main` to print events to stderr.
//!
//! Filters are read from the `LOSSY_MPI_LOG` environment variable using
//! `EnvFilter` syntax (for example `LOSSY_MPI_LOG=lossy_mpi=debug`) and
//! default to `info`.

use std::sync::Once;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const FILTER_ENV: &str = "LOSSY_MPI_LOG";

static INIT: Once = Once::new();

/// Initialize the logger. Later calls are no-ops.
pub fn init() {
    INIT.call_once(setup_logging);
}

fn setup_logging() {
    let layer = fmt::layer()
        .event_format(fmt::format().compact())
        .with_writer(std::io::stderr)
        .with_filter(filters());
    // Another subscriber may already be installed by the host application.
    let _ = tracing_subscriber::registry().with(layer).try_init();
}

fn filters() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(FILTER_ENV)
        .from_env_lossy()
}
