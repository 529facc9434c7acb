//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Default filter level for the given verbosity flags.
pub fn default_level(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Installs a stderr `fmt` subscriber. `RUST_LOG` takes precedence over the
/// flags. Calling this twice is a no-op.
pub fn init(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
