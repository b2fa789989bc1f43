use std::time::Duration;

use clap::Parser;

#[derive(Debug, Parser)]
pub(crate) struct DbatcherConfig {
    /// The base URL of the running Dbatcher server
    ///
    /// Used as is, so it should not end with a `/`.
    #[clap(
        short = 'H',
        long = "host",
        env = "DBATCHER_HOST_URL",
        default_value = "http://127.0.0.1:8124"
    )]
    pub(crate) host_url: String,

    /// The maximum duration of the request to the server, e.g., `500ms`, `10s`
    #[clap(
        long = "timeout",
        env = "DBATCHER_TIMEOUT",
        default_value = "10s",
        value_parser = humantime::parse_duration
    )]
    pub(crate) timeout: Duration,

    /// The table to deliver the rows to
    #[clap(short = 't', long = "table", env = "DBATCHER_TABLE")]
    pub(crate) table: String,

    /// The comma separated field list of the rows, e.g., `id,name,created_at`
    #[clap(long = "fields", env = "DBATCHER_FIELDS")]
    pub(crate) fields: String,
}
