use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "plainword=info,tower_http=info";

/// Installs the global subscriber. Output goes to stderr so stdout stays
/// reserved for annotated text and JSON.
///
/// `RUST_LOG` overrides the default filter. Calling this twice is harmless.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "plainword=debug,tower_http=debug"
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
