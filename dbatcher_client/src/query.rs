//! Mapping of delivery parameters onto the Dbatcher query string.

use url::form_urlencoded;

/// The delivery parameters of a single request to a Dbatcher server
///
/// `table` and `fields` are opaque to the client and are only percent-encoded. The
/// `max_rows`, `timeout_ms` and `persist` values are hints for the server's buffering and
/// are never sent in sync mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryParams {
    /// The destination table
    pub table: String,
    /// The field list of the rows, e.g., `"a,b,c"`
    pub fields: String,
    /// Buffered mode: flush once this many rows are accumulated
    pub max_rows: u64,
    /// Buffered mode: flush once this many milliseconds have passed
    pub timeout_ms: u64,
    /// Process the rows immediately instead of buffering them
    pub sync: bool,
    /// Buffered mode: ask the server to durably store the rows before acknowledging
    pub persist: bool,
}

impl DeliveryParams {
    /// Parameters for a sync mode delivery
    pub fn sync(table: impl Into<String>, fields: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: fields.into(),
            max_rows: 0,
            timeout_ms: 0,
            sync: true,
            persist: false,
        }
    }

    /// Parameters for a buffered mode delivery, without persistence
    pub fn buffered(
        table: impl Into<String>,
        fields: impl Into<String>,
        max_rows: u64,
        timeout_ms: u64,
    ) -> Self {
        Self {
            table: table.into(),
            fields: fields.into(),
            max_rows,
            timeout_ms,
            sync: false,
            persist: false,
        }
    }

    /// Set the `persist` flag
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Produce the query string for these parameters
    ///
    /// In sync mode this is `table=..&fields=..&sync=1`; otherwise it is
    /// `table=..&fields=..&max_rows=..&timeout_ms=..`, followed by `&persist=1` only when
    /// `persist` is set.
    pub fn query_string(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("table", &self.table)
            .append_pair("fields", &self.fields);
        if self.sync {
            query.append_pair("sync", "1");
            return query.finish();
        }
        query
            .append_pair("max_rows", &self.max_rows.to_string())
            .append_pair("timeout_ms", &self.timeout_ms.to_string());
        if self.persist {
            query.append_pair("persist", "1");
        }
        query.finish()
    }
}

/// Build the full request URL, `<address>/?<query>`
///
/// The address is used verbatim: a trailing slash on it is not stripped.
pub fn build_url(address: &str, params: &DeliveryParams) -> String {
    format!("{address}/?{query}", query = params.query_string())
}
