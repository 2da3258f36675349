use tracing_subscriber::EnvFilter;

/// Filter used by `--debug`: crate internals at debug, dependencies quiet.
const DEBUG_DIRECTIVES: &str = "brandcrop=debug,warn";

/// Route `tracing` events (and `log` records from the raster loader) to
/// stderr, leaving stdout for command output. Safe to call more than once.
pub fn init_tracing(enable_debug: bool) {
    let _ = tracing_log::LogTracer::init();

    let filter = match enable_debug {
        true => EnvFilter::new(DEBUG_DIRECTIVES),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
