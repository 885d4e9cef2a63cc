use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout stays clean for `--simple` output.
/// Verbosity comes from `EARSHOT_LOG` (e.g. `EARSHOT_LOG=earshot_api=debug`).
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_env("EARSHOT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
