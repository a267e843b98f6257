//! Logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize tracing from verbosity flags
///
/// `-q` limits output to errors; each `-v` widens the filter one step.
/// `RUST_LOG` overrides the flag-derived default when set.
pub fn init_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("clipferry={0},clipferry_net={0},clipferry_store={0},clipferry_protocol={0},clipferry_crypto={0}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
