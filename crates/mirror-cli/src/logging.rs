use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize diagnostics on stderr.
///
/// `RUST_LOG` decides the level, defaulting to "info"; `--verbose` forces
/// "debug". Diagnostics are separate from the pass log in the destination.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true)
        .compact();

    // A subscriber may already be installed when running under a test harness
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
