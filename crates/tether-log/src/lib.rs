// ABOUTME: Shared logging setup for tether binaries
// ABOUTME: Two functions: init() for quiet interactive use, init_verbose() for --debug runs

use tracing_subscriber::EnvFilter;

/// Crates whose diagnostics are raised to DEBUG by `init_verbose()`.
const VERBOSE_CRATES: &[&str] = &["tether_link"];

/// Logging to stderr for interactive binaries. Default: WARN level, RUST_LOG override.
/// Kept quiet so log lines do not interleave with prompts and the spinner.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Verbose logging to stderr. Default: DEBUG for tether crates, WARN for everything else.
/// Used when a binary runs with its debug flag.
pub fn init_verbose() {
    tracing_subscriber::fmt()
        .with_env_filter(verbose_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn verbose_filter() -> EnvFilter {
    VERBOSE_CRATES.iter().fold(
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        |filter, krate| {
            let directive = format!("{krate}=debug");
            filter.add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| tracing::Level::DEBUG.into()),
            )
        },
    )
}
