//! # Request gateway
//!
//! Every call to the Lidarr API goes through [`RequestGateway::execute`]. The
//! gateway spaces consecutive calls at least `rate_limit_interval` apart,
//! attaches the API key, re-sends requests that come back with a transient
//! status and decodes the JSON body.

use crate::{ConnectionConfig, LidarrError, Result, TransportFailure};
use chrono::{DateTime, Utc};
use http_client::{HttpClient, Request, Response};
use http_types::{Method, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Fixed prefix between the base URL and every endpoint path.
pub const API_PREFIX: &str = "api/v1";

/// Statuses the gateway re-sends automatically.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Methods eligible for status retries. POST is included, so writes may be
/// applied more than once if the server fails after committing them.
pub const RETRYABLE_METHODS: [Method; 7] = [
    Method::Head,
    Method::Get,
    Method::Put,
    Method::Delete,
    Method::Options,
    Method::Trace,
    Method::Post,
];

/// Statuses for which a `Retry-After` header overrides the backoff schedule.
const RETRY_AFTER_STATUSES: [u16; 3] = [413, 429, 503];

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// One API call, described independently of the transport so it can be
/// rebuilt for every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    endpoint: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Put, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    /// Append a query parameter. Booleans render as `true`/`false`.
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a query parameter only when a value is present.
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Attach a JSON request body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Override the configured timeout for this call only.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Mutable bookkeeping for rate limiting.
#[derive(Debug, Default)]
pub struct RequestState {
    /// Completion time of the last successful request; `None` until one
    /// has completed.
    pub last_request: Option<Instant>,
}

/// Body and metadata of one received response.
struct RawResponse {
    status: u16,
    retry_after: Option<Duration>,
    body: String,
}

/// Authenticated, rate-limited access to one Lidarr instance.
///
/// The request state sits behind an async mutex that is held for the whole
/// of [`execute`](Self::execute), so calls issued through one gateway are
/// strictly sequential. Separate gateways share nothing.
pub struct RequestGateway {
    client: Arc<dyn HttpClient + Send + Sync>,
    config: ConnectionConfig,
    state: Mutex<RequestState>,
}

impl std::fmt::Debug for RequestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGateway")
            .field("base_url", &self.config.base_url())
            .field("timeout", &self.config.timeout())
            .field("rate_limit_interval", &self.config.rate_limit_interval())
            .field("retry_count", &self.config.retry_count())
            .finish_non_exhaustive()
    }
}

impl RequestGateway {
    pub fn new(client: Box<dyn HttpClient + Send + Sync>, config: ConnectionConfig) -> Self {
        Self {
            client: Arc::from(client),
            config,
            state: Mutex::new(RequestState::default()),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Full URL for an endpoint path, including query parameters.
    pub fn endpoint_url(&self, request: &ApiRequest) -> Result<Url> {
        let raw = format!(
            "{}/{}/{}",
            self.config.base_url(),
            API_PREFIX,
            request.endpoint.trim_start_matches('/')
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| LidarrError::Config(format!("Invalid request URL '{raw}': {e}")))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                request
                    .query
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
        }
        Ok(url)
    }

    /// Perform one API call and return its decoded body.
    ///
    /// Returns `Ok(None)` when the server answers with an empty body, as
    /// delete endpoints do.
    pub async fn execute(&self, request: ApiRequest) -> Result<Option<Value>> {
        let url = self.endpoint_url(&request)?;
        let timeout = request.timeout.unwrap_or_else(|| self.config.timeout());
        let body = match &request.body {
            Some(body) => Some(serde_json::to_string(body)?),
            None => None,
        };

        let mut state = self.state.lock().await;
        self.wait_for_rate_limit(&state).await;

        log::debug!("Making {} request to {}", request.method, url);

        let max_retries = if RETRYABLE_METHODS.contains(&request.method) {
            self.config.retry_count()
        } else {
            0
        };
        let mut attempt: u32 = 0;

        let response = loop {
            attempt += 1;
            let http_request = self.build_request(request.method, &url, body.as_deref());
            let response = match tokio::time::timeout(timeout, self.send(http_request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(message)) => {
                    log::error!("Request failed: {message}");
                    return Err(LidarrError::transport(
                        url.as_str(),
                        TransportFailure::Connection(message),
                    ));
                }
                Err(_) => {
                    log::error!("Request failed: {} timed out after {timeout:?}", url);
                    return Err(LidarrError::transport(
                        url.as_str(),
                        TransportFailure::Timeout(timeout),
                    ));
                }
            };

            let retries_used = attempt - 1;
            if RETRYABLE_STATUSES.contains(&response.status) && retries_used < max_retries {
                let delay = backoff_delay(
                    self.config.retry_backoff_factor(),
                    attempt,
                    response.status,
                    response.retry_after,
                );
                log::debug!(
                    "{} {} returned {}, retrying in {:.2}s (retry {}/{})",
                    request.method,
                    url,
                    response.status,
                    delay.as_secs_f64(),
                    attempt,
                    max_retries
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            break response;
        };

        if !(200..300).contains(&response.status) {
            log::error!(
                "Request failed: {} {} returned {}",
                request.method,
                url,
                response.status
            );
            return Err(LidarrError::transport(
                url.as_str(),
                TransportFailure::Status {
                    status: response.status,
                    attempts: attempt,
                    body: response.body,
                },
            ));
        }

        state.last_request = Some(Instant::now());
        drop(state);

        if response.body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&response.body)
            .map(Some)
            .map_err(|e| LidarrError::Decode(format!("{} {}: {e}", request.method, url)))
    }

    async fn wait_for_rate_limit(&self, state: &RequestState) {
        let Some(last) = state.last_request else {
            return;
        };
        let interval = self.config.rate_limit_interval();
        let elapsed = last.elapsed();
        if elapsed < interval {
            let sleep_time = interval - elapsed;
            log::debug!("Rate limiting - sleeping for {:.2}s", sleep_time.as_secs_f64());
            tokio::time::sleep(sleep_time).await;
        }
    }

    fn build_request(&self, method: Method, url: &Url, body: Option<&str>) -> Request {
        let mut request = Request::new(method, url.clone());
        request.insert_header("X-Api-Key", self.config.api_key());
        request.insert_header("Content-Type", "application/json");
        request.insert_header("Accept", "application/json");
        if let Some(body) = body {
            request.set_body(body);
        }
        request
    }

    async fn send(&self, request: Request) -> std::result::Result<RawResponse, String> {
        let mut response: Response = self
            .client
            .send(request)
            .await
            .map_err(|e| e.to_string())?;
        let status: u16 = response.status().into();
        let retry_after = parse_retry_after(&response);
        let body = response.body_string().await.map_err(|e| e.to_string())?;
        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    let values = response.header("Retry-After")?;
    retry_after_delay(values.get(0)?.as_str(), Utc::now())
}

/// Delay named by a `Retry-After` value: either delta-seconds or an
/// HTTP-date. A date in the past means retry now.
fn retry_after_delay(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let retry_at = DateTime::parse_from_rfc2822(value).ok()?;
    Some(
        (retry_at.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}

/// Sleep before retry number `retry` (1-based).
///
/// The first retry goes out immediately, later ones wait
/// `factor * 2^(retry - 1)` seconds, capped at two minutes. A `Retry-After`
/// header on 413/429/503 responses takes precedence.
pub fn backoff_delay(
    factor: f64,
    retry: u32,
    status: u16,
    retry_after: Option<Duration>,
) -> Duration {
    if RETRY_AFTER_STATUSES.contains(&status) {
        if let Some(retry_after) = retry_after {
            return retry_after;
        }
    }
    if retry <= 1 {
        return Duration::ZERO;
    }
    let exponent = (retry - 1).min(32) as i32;
    let seconds = factor * 2f64.powi(exponent);
    Duration::from_secs_f64(seconds.min(MAX_BACKOFF.as_secs_f64()))
}
