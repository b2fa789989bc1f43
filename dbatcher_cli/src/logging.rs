//! Log configuration for the `dbatcher` binary.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// CLI config for logging
#[derive(Debug, Clone, clap::Parser)]
pub(crate) struct LoggingConfig {
    /// Logs: filter directive
    ///
    /// Configures log severity level filter, by target. Takes precedence over `-v`.
    ///
    /// Example values: `info`, `dbatcher_client=debug,warn`
    #[clap(long = "log-filter", env = "LOG_FILTER", global = true)]
    pub(crate) log_filter: Option<String>,

    /// Logs: increase verbosity, `-v` for `info` and `-vv` for `debug`
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub(crate) log_verbose_count: u8,
}

impl LoggingConfig {
    fn filter_directive(&self) -> &str {
        match (&self.log_filter, self.log_verbose_count) {
            (Some(filter), _) => filter,
            (None, 0) => "warn",
            (None, 1) => "info",
            (None, _) => "debug",
        }
    }
}

/// Install a global subscriber writing logs to stderr
pub(crate) fn init_logs(config: &LoggingConfig) -> anyhow::Result<()> {
    let directive = config.filter_directive();
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log filter: {directive}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to install the log subscriber")
}
