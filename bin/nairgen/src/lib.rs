//! nairgen CLI Library
//!
//! Command implementations for the `nairgen` binary, which renders the Nair
//! site templates into a static site for GitHub Pages.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, check)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use nairgen::cmd::build::{self, BuildOverrides};
//!
//! build::run(Path::new("nairgen.toml"), &BuildOverrides::default()).unwrap();
//! ```

pub mod cmd;

pub use nairgen_core::{Config, PageSpec};
pub use nairgen_generator::{BuildStats, Builder};

/// Initialize tracing with the specified verbosity level.
///
/// `RUST_LOG` is honoured when no `-v` flag is given; any `-v` flag wins over
/// it.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter(verbose, rust_log.as_deref()))
        .init();
}

fn env_filter(verbose: u8, rust_log: Option<&str>) -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    match rust_log {
        Some(directives) if verbose == 0 && !directives.trim().is_empty() => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(level))
        }
        _ => EnvFilter::new(level),
    }
}
