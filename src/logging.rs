//! Logging setup: stderr output, third-party client crates limited to errors.

use tracing_subscriber::EnvFilter;

/// Crates of the storage client stack. Only their errors are shown.
const QUIET_TARGETS: &[&str] = &[
    "aws_config",
    "aws_sdk_s3",
    "aws_smithy_runtime",
    "aws_smithy_runtime_api",
    "aws_smithy_http",
    "hyper",
    "hyper_util",
    "rustls",
];

/// Process-wide log configuration, built once by the entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    /// Emit debug-level events for this crate.
    pub verbose: bool,
}

impl LogConfig {
    /// Filter directives used when `RUST_LOG` is not set.
    pub fn directives(&self) -> String {
        let level = if self.verbose { "debug" } else { "info" };
        let mut directives = format!("hotel_dump={}", level);
        for target in QUIET_TARGETS {
            directives.push_str(&format!(",{}=error", target));
        }
        directives
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
    }

    /// Installs the global subscriber writing to stderr.
    pub fn init(&self) {
        tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_writer(std::io::stderr)
            .init();
    }
}
