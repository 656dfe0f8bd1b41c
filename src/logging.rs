use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` wins when set. Otherwise the crate logs at `info`, or `debug`
/// when `verbose` is set. Calling this twice is a no-op.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,mpc_design_eval=debug"
    } else {
        "warn,mpc_design_eval=info"
    };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
