use crate::{LidarrError, Result};
use http_types::Url;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Default request rate for one client.
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 2.0;
/// Default number of status-code retries per request.
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default seed for the transport backoff schedule, in seconds.
pub const DEFAULT_RETRY_BACKOFF_FACTOR: f64 = 0.3;

/// Connection settings for one Lidarr instance.
///
/// Built once and then handed to a [`RequestGateway`](crate::RequestGateway),
/// which owns it for its whole lifetime. The `with_*` methods consume and
/// return the config so it can be finished in one expression:
///
/// ```rust
/// use lidarr_api::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new("http://localhost:8686/", "0123456789abcdef")
///     .unwrap()
///     .with_timeout(Duration::from_secs(30))
///     .with_requests_per_second(4.0)
///     .unwrap();
///
/// assert_eq!(config.base_url(), "http://localhost:8686");
/// assert_eq!(config.rate_limit_interval(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    base_url: String,
    api_key: String,
    timeout: Duration,
    rate_limit_interval: Duration,
    retry_count: u32,
    retry_backoff_factor: f64,
}

impl ConnectionConfig {
    /// Create a config with default timeout, rate and retry settings.
    ///
    /// Trailing slashes are stripped from `base_url`. Fails with
    /// [`LidarrError::Config`] if the API key is blank or the URL does
    /// not parse as an absolute http(s) URL.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let api_key = api_key.trim().to_string();

        if api_key.is_empty() {
            return Err(LidarrError::Config("API key is required".to_string()));
        }

        let parsed = Url::parse(&base_url)
            .map_err(|e| LidarrError::Config(format!("Invalid base URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LidarrError::Config(format!(
                "Unsupported URL scheme '{}' in '{base_url}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            base_url,
            api_key,
            timeout: DEFAULT_TIMEOUT,
            rate_limit_interval: Duration::from_secs_f64(1.0 / DEFAULT_REQUESTS_PER_SECOND),
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff_factor: DEFAULT_RETRY_BACKOFF_FACTOR,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum request rate; the gateway spaces calls at least
    /// `1 / requests_per_second` apart.
    pub fn with_requests_per_second(mut self, requests_per_second: f64) -> Result<Self> {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(LidarrError::Config(format!(
                "Request rate must be positive, got {requests_per_second}"
            )));
        }
        self.rate_limit_interval = Duration::try_from_secs_f64(1.0 / requests_per_second)
            .map_err(|e| {
                LidarrError::Config(format!(
                    "Request rate {requests_per_second} gives an unusable interval: {e}"
                ))
            })?;
        Ok(self)
    }

    /// Set the minimum spacing between requests directly.
    pub fn with_rate_limit_interval(mut self, interval: Duration) -> Self {
        self.rate_limit_interval = interval;
        self
    }

    pub fn with_retries(mut self, retry_count: u32, backoff_factor: f64) -> Result<Self> {
        if !backoff_factor.is_finite() || backoff_factor < 0.0 {
            return Err(LidarrError::Config(format!(
                "Backoff factor must be non-negative, got {backoff_factor}"
            )));
        }
        self.retry_count = retry_count;
        self.retry_backoff_factor = backoff_factor;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn rate_limit_interval(&self) -> Duration {
        self.rate_limit_interval
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn retry_backoff_factor(&self) -> f64 {
        self.retry_backoff_factor
    }
}
