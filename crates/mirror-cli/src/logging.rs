use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "dirmirror=info,mirror_core=info";
const VERBOSE_FILTER: &str = "dirmirror=debug,mirror_core=debug,mirror_fs=debug";

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over the defaults; `verbose` raises them
/// to debug. Stdout is left to hook output and command results.
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact();

    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
