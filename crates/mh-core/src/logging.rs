//! Logging initialization.

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG` when set; otherwise defaults to debug for mh crates
/// and info for everything else (or trace when `verbose` is requested).
/// Safe to call more than once; later calls are no-ops.
pub fn init(verbose: bool) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            "mh_core=trace,mh_av=trace,mh_rules=trace,mh_pipeline=trace,info".to_string()
        } else {
            "mh_core=debug,mh_av=debug,mh_rules=debug,mh_pipeline=debug,info".to_string()
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}
