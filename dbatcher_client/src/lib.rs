//! Client for submitting rows to a Dbatcher server over HTTP
//!
//! A [`Client`] owns a single HTTP connection pool that is configured once and reused by
//! every call to [`Client::send`]. Use [`send_once`] for one-off deliveries.
pub mod query;

use std::time::Duration;

use reqwest::{
    Method, StatusCode,
    header::{self, HeaderMap, HeaderValue},
};
use serde::Serialize;
use tracing::debug;

pub use crate::query::{DeliveryParams, build_url};

/// Idle lifetime, in seconds, advertised for kept-alive connections
const KEEP_ALIVE_SECS: u64 = 300;

/// Primary error type for the [`Client`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build the HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("failed to encode rows as JSON: {0}")]
    EncodeRows(#[source] serde_json::Error),

    #[error("failed to send {method} {url} request: {message}")]
    Transport {
        method: Method,
        url: String,
        message: String,
    },

    #[error("server responded with error [{code}]: {message}")]
    ApiError { code: StatusCode, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The Dbatcher client
///
/// Holds the server address and the underlying [`reqwest::Client`]. The connection is
/// released when the [`Client`] is dropped.
#[derive(Debug)]
pub struct Client {
    /// The base URL of the Dbatcher server, used verbatim
    address: String,
    /// The maximum duration of a single request/response exchange
    request_timeout: Duration,
    /// A [`reqwest::Client`] for handling HTTP requests
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new [`Client`]
    ///
    /// The address is not validated here; an unusable address surfaces as a transport
    /// failure on [`Client::send`].
    pub fn new(address: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from(KEEP_ALIVE_SECS));
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .gzip(true)
            .deflate(true)
            .default_headers(headers)
            .pool_idle_timeout(Duration::from_secs(KEEP_ALIVE_SECS))
            .pool_max_idle_per_host(1)
            .build()
            .map_err(Error::Build)?;
        Ok(Self {
            address: address.into(),
            request_timeout,
            http_client,
        })
    }

    /// The base address of the server
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The timeout applied to each exchange
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Compose a delivery of rows to `table`
    ///
    /// # Example
    /// ```no_run
    /// # use std::time::Duration;
    /// # use dbatcher_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// let client = Client::new("http://127.0.0.1:8124", Duration::from_secs(5))?;
    /// let outcome = client
    ///     .deliver("events", "id,name")
    ///     .buffered(1_000, 500)
    ///     .persist(true)
    ///     .send(&[(1, "a"), (2, "b")])
    ///     .await?;
    /// assert!(outcome.is_success());
    /// # Ok(())
    /// # }
    /// ```
    pub fn deliver(
        &self,
        table: impl Into<String>,
        fields: impl Into<String>,
    ) -> DeliveryRequestBuilder<'_> {
        DeliveryRequestBuilder {
            client: self,
            params: DeliveryParams::sync(table, fields),
        }
    }

    /// Send `rows` to the server using the delivery `params`
    ///
    /// Only a failure to encode the rows is returned as an `Err`, in which case nothing is
    /// sent. Transport failures and non-200 responses are reported through the returned
    /// [`SendOutcome`].
    pub async fn send<R>(&self, params: &DeliveryParams, rows: &[R]) -> Result<SendOutcome>
    where
        R: Serialize + Sync,
    {
        let url = build_url(&self.address, params);
        let body = serde_json::to_vec(rows).map_err(Error::EncodeRows)?;
        debug!(%url, rows = rows.len(), "sending rows to dbatcher");

        let resp = match self
            .http_client
            .post(url.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                debug!(%url, error = %e, "dbatcher request failed");
                return Ok(SendOutcome {
                    url,
                    status: None,
                    error: Some(e.to_string()),
                });
            }
        };

        let status = resp.status();
        // the body is always read out so the connection can go back to the pool
        let error = match resp.text().await {
            Ok(_) if status == StatusCode::OK => None,
            Ok(text) if text.is_empty() => None,
            Ok(text) => Some(text),
            Err(e) => Some(e.to_string()),
        };
        debug!(%url, %status, "dbatcher responded");

        Ok(SendOutcome { url, status: Some(status), error })
    }

    /// Create a short-lived [`Client`], send `rows` with it, and drop it
    pub async fn send_once<R>(
        address: impl Into<String> + Send,
        request_timeout: Duration,
        params: &DeliveryParams,
        rows: &[R],
    ) -> Result<SendOutcome>
    where
        R: Serialize + Sync,
    {
        Self::new(address, request_timeout)?.send(params, rows).await
    }
}

/// Send `rows` without keeping a [`Client`] around
///
/// Equivalent to [`Client::new`] followed by [`Client::send`]; the connection is not reused.
pub async fn send_once<R>(
    address: impl Into<String> + Send,
    request_timeout: Duration,
    params: &DeliveryParams,
    rows: &[R],
) -> Result<SendOutcome>
where
    R: Serialize + Sync,
{
    Client::send_once(address, request_timeout, params, rows).await
}

/// Builder type for composing a delivery
///
/// Produced by [`Client::deliver`]. Defaults to sync mode.
#[derive(Debug)]
pub struct DeliveryRequestBuilder<'c> {
    client: &'c Client,
    params: DeliveryParams,
}

impl DeliveryRequestBuilder<'_> {
    /// Ask the server to process the rows immediately
    pub fn sync(mut self) -> Self {
        self.params.sync = true;
        self
    }

    /// Let the server buffer the rows until `max_rows` are collected or `timeout_ms` passes
    pub fn buffered(mut self, max_rows: u64, timeout_ms: u64) -> Self {
        self.params.sync = false;
        self.params.max_rows = max_rows;
        self.params.timeout_ms = timeout_ms;
        self
    }

    /// Set the `persist` flag; ignored in sync mode
    pub fn persist(mut self, set_to: bool) -> Self {
        self.params.persist = set_to;
        self
    }

    /// The parameters composed so far
    pub fn params(&self) -> &DeliveryParams {
        &self.params
    }

    /// Send the rows to the server
    pub async fn send<R>(self, rows: &[R]) -> Result<SendOutcome>
    where
        R: Serialize + Sync,
    {
        self.client.send(&self.params, rows).await
    }
}

/// The result of a single exchange with the server
///
/// `error` carries whatever diagnostic the exchange produced: the transport error when no
/// response was received, otherwise the response body of a non-200 response. It is `None`
/// for a clean 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    url: String,
    status: Option<StatusCode>,
    error: Option<String>,
}

impl SendOutcome {
    /// `true` if and only if the server answered with `200 OK`
    pub fn is_success(&self) -> bool {
        self.status == Some(StatusCode::OK)
    }

    /// The URL the rows were sent to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The response status, if a response was received
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// The diagnostic of the exchange, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Convert into a [`Result`], turning any failure into an [`Error`]
    pub fn into_result(self) -> Result<()> {
        match self.status {
            Some(StatusCode::OK) => Ok(()),
            Some(code) => Err(Error::ApiError {
                code,
                message: self.error.unwrap_or_default(),
            }),
            None => Err(Error::Transport {
                method: Method::POST,
                url: self.url,
                message: self.error.unwrap_or_default(),
            }),
        }
    }
}
