use std::time::Duration;
use thiserror::Error;

/// Error types for Lidarr operations.
///
/// Every failure the gateway sees on the wire is reported as
/// [`LidarrError::Transport`], with the underlying cause in
/// [`TransportFailure`]. Bodies that are not the JSON the caller expected
/// are reported separately as [`LidarrError::Decode`].
///
/// # Error Handling Examples
///
/// ```rust,no_run
/// use lidarr_api::{ConnectionConfig, LidarrApi, LidarrClient, LidarrError, TransportFailure};
///
/// #[tokio::main]
/// async fn main() -> lidarr_api::Result<()> {
///     let config = ConnectionConfig::new("http://localhost:8686", "api-key")?;
///     let client = LidarrClient::new(Box::new(http_client::native::NativeClient::new()), config);
///
///     match client.get_system_status().await {
///         Ok(status) => println!("Lidarr {}", status["version"]),
///         Err(LidarrError::Transport { failure: TransportFailure::Status { status, .. }, .. }) => {
///             eprintln!("Server answered with HTTP {status}");
///         }
///         Err(e) => eprintln!("Other error: {e}"),
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum LidarrError {
    /// Missing or invalid connection settings.
    ///
    /// Raised when the client is constructed or the first request is
    /// prepared. Never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request could not be completed.
    ///
    /// Covers connection failures, timeouts and any non-2xx status left
    /// over once the gateway's own status retries are exhausted.
    #[error("Request to {url} failed: {failure}")]
    Transport {
        /// Full URL of the failed request
        url: String,
        /// What went wrong
        failure: TransportFailure,
    },

    /// A body was expected to be JSON of a certain shape and was not.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The user interrupted the operation.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Input that parsed fine but does not have the expected structure.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// File system I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding errors from the export tools.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Underlying cause of a [`LidarrError::Transport`] error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// DNS, connect or I/O failure before a status line was received.
    #[error("connection error: {0}")]
    Connection(String),

    /// No complete response within the effective timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Final response carried a non-success status.
    #[error("HTTP {status} after {attempts} attempt(s)")]
    Status {
        /// HTTP status code of the last response
        status: u16,
        /// Number of times the request was sent
        attempts: u32,
        /// Body of the last response, as text
        body: String,
    },
}

impl LidarrError {
    pub(crate) fn transport(url: impl Into<String>, failure: TransportFailure) -> Self {
        LidarrError::Transport {
            url: url.into(),
            failure,
        }
    }

    /// Whether a caller-level retry has any chance of succeeding.
    ///
    /// Only transport failures qualify. Configuration, decode and
    /// cancellation errors fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LidarrError::Transport { .. })
    }

    /// HTTP status of a terminal status failure, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            LidarrError::Transport {
                failure: TransportFailure::Status { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LidarrError {
    fn from(err: serde_json::Error) -> Self {
        LidarrError::Decode(err.to_string())
    }
}
