use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Installs the global subscriber, writing to stderr.
///
/// Levels come from `REGEX_LINT_LOG` (for example
/// `REGEX_LINT_LOG=regex_lint::analyzers=trace`), falling back to
/// `regex_lint=warn`. Later calls do nothing.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("REGEX_LINT_LOG")
            .unwrap_or_else(|_| EnvFilter::new("regex_lint=warn"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .init();
    });
}
