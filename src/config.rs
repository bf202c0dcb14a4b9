//! Logging setup for the command-line front-end.

use tracing_subscriber::EnvFilter;

/// Installs a stderr `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the level is `debug` when
/// `debug` is set and `info` for this crate (`warn` for dependencies).
pub fn setup_logging(debug: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let default_directives = if debug {
        "novaart=debug,info"
    } else {
        "novaart=info,warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .try_init()
}
