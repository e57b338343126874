//! Diagnostics output for `jlaunch`.
//!
//! Log lines go to stderr so table and `--json` output on stdout can be piped.
//! The `-q`/`-v` flags pick a [`Verbosity`]; `RUST_LOG`, when set, replaces
//! the derived filter entirely.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crate targets whose level follows the command-line flags.
const OWN_TARGETS: [&str; 2] = ["journey_launcher", "jlaunch"];

/// How chatty the launcher is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Launches, discovery summaries and warnings.
    #[default]
    Normal,
    /// Adds per-folder decisions and check commands.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Map `-q` and the number of `-v` flags. `-q` wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Level for the launcher's own targets.
    #[must_use]
    pub fn level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::ERROR,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    /// Filter directives used when `RUST_LOG` is not set.
    ///
    /// Dependencies stay at `warn` (or `error` when quiet) whatever the flags.
    #[must_use]
    pub fn directives(self) -> String {
        let level = self.level();
        let base = level.min(LevelFilter::WARN);
        OWN_TARGETS
            .iter()
            .fold(base.to_string(), |acc, target| format!("{acc},{target}={level}"))
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(verbosity: Verbosity) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(matches!(verbosity, Verbosity::Trace)),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::trace!("Logging at {}", verbosity.level());
    }
}

/// Route warnings from code under test to the test harness output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
