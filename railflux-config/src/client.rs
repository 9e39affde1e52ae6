use railflux_common::TimePrecision;
use serde::{Deserialize, Serialize};

/// Connection options of the metrics client.
///
/// railflux does not connect to the metrics backend itself. These options are carried for the
/// client the host hands to the reporter, except for [`time_precision`](Self::time_precision),
/// which determines the timestamps of all points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Hosts of the metrics backend.
    pub hosts: Vec<String>,
    /// Port of the metrics backend.
    pub port: u16,
    /// Name of the database that receives the points.
    pub database: Option<String>,
    /// User name for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Connect through TLS.
    pub use_ssl: bool,
    /// Write points in the background rather than on the calling thread.
    #[serde(rename = "async")]
    pub async_writes: bool,
    /// Number of retries for failed writes. `None` retries indefinitely.
    pub retry: Option<u32>,
    /// Timeout for opening a connection, in seconds.
    pub open_timeout: u64,
    /// Timeout for reading a response, in seconds.
    pub read_timeout: u64,
    /// Upper bound for the backoff between retries, in seconds.
    pub max_delay: u64,
    /// Precision of point timestamps.
    pub time_precision: TimePrecision,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost".to_owned()],
            port: 8086,
            database: None,
            username: None,
            password: None,
            use_ssl: false,
            async_writes: true,
            retry: None,
            open_timeout: 5,
            read_timeout: 300,
            max_delay: 30,
            time_precision: TimePrecision::Seconds,
        }
    }
}
