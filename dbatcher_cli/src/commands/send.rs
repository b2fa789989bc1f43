use clap::Parser;
use dbatcher_client::{Client, DeliveryParams};
use serde_json::Value;
use tokio::{
    fs::File,
    io::{self, AsyncRead, AsyncReadExt},
};
use tracing::info;

use super::common::DbatcherConfig;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Client(#[from] dbatcher_client::Error),

    #[error("error reading rows: {0}")]
    Io(#[from] io::Error),

    #[error("rows must be a JSON array: {0}")]
    ParseRows(#[source] serde_json::Error),

    #[error("delivery failed: {0}")]
    Delivery(#[source] dbatcher_client::Error),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Parser)]
#[clap(visible_alias = "s")]
pub(crate) struct Config {
    /// Common Dbatcher config
    #[clap(flatten)]
    dbatcher_config: DbatcherConfig,

    /// Have the server process the rows immediately instead of buffering them
    #[clap(long = "sync", default_value_t = false)]
    sync: bool,

    /// Buffered mode: flush the table once this many rows are collected
    #[clap(long = "max-rows", required_unless_present = "sync")]
    max_rows: Option<u64>,

    /// Buffered mode: flush the table once this many milliseconds have passed
    #[clap(long = "timeout-ms", required_unless_present = "sync")]
    timeout_ms: Option<u64>,

    /// Buffered mode: ask the server to persist the rows before acknowledging them
    #[clap(long = "persist", default_value_t = false, conflicts_with = "sync")]
    persist: bool,

    /// File path to load the rows from, a JSON array with one element per row
    ///
    /// The rows are read from stdin if no file is given.
    #[clap(short = 'f', long = "file")]
    file_path: Option<String>,
}

impl Config {
    fn delivery_params(&self) -> DeliveryParams {
        let DbatcherConfig { table, fields, .. } = &self.dbatcher_config;
        if self.sync {
            DeliveryParams::sync(table, fields)
        } else {
            DeliveryParams::buffered(
                table,
                fields,
                self.max_rows.unwrap_or_default(),
                self.timeout_ms.unwrap_or_default(),
            )
            .with_persist(self.persist)
        }
    }
}

pub(crate) async fn command(config: Config) -> Result<()> {
    let params = config.delivery_params();
    let rows = match &config.file_path {
        Some(path) => read_rows(File::open(path).await?).await?,
        None => read_rows(io::stdin()).await?,
    };

    let DbatcherConfig {
        host_url, timeout, ..
    } = config.dbatcher_config;
    let client = Client::new(host_url, timeout)?;
    info!(
        table = %params.table,
        rows = rows.len(),
        sync = params.sync,
        "sending rows"
    );

    let outcome = client.send(&params, &rows).await?;
    outcome.into_result().map_err(Error::Delivery)?;

    println!("success");

    Ok(())
}

async fn read_rows(mut reader: impl AsyncRead + Unpin + Send) -> Result<Vec<Value>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    serde_json::from_slice(&buf).map_err(Error::ParseRows)
}
