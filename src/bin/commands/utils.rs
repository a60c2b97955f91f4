use clap::Args;
use inquire::{Confirm, InquireError};
use lidarr_api::config::DEFAULT_RETRY_BACKOFF_FACTOR;
use lidarr_api::{ConnectionConfig, LidarrClient, LidarrError, SettingsStore};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Used when neither a flag, the environment nor the settings file names a server.
pub const DEFAULT_URL: &str = "http://localhost:8686";

/// Connection and behaviour flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Lidarr server URL (default: from config or http://localhost:8686)
    #[arg(long, env = "LIDARR_URL", global = true)]
    pub url: Option<String>,

    /// Lidarr API key (default: from config)
    #[arg(long, env = "LIDARR_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to the settings file (default: ~/.config/lidarr-api/defaults.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Timeout in seconds for API requests
    #[arg(long, default_value = "60", global = true)]
    pub timeout: u64,

    /// Number of retries for failed requests
    #[arg(long, default_value = "3", global = true)]
    pub retries: u32,

    /// Answer yes to every confirmation prompt
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

/// Everything a command needs once the connection is resolved.
pub struct Context {
    pub client: LidarrClient,
    pub store: SettingsStore,
    pub retries: u32,
    pub assume_yes: bool,
}

impl Context {
    /// Ask before a destructive action. Always true with `--yes`.
    pub fn confirm(&self, message: &str) -> Result<bool, LidarrError> {
        if self.assume_yes {
            return Ok(true);
        }
        Confirm::new(message)
            .with_default(false)
            .prompt()
            .map_err(prompt_error)
    }
}

/// Resolve the base URL and API key and build a client.
///
/// Flags and environment variables win over the settings file, and the
/// URL falls back to [`DEFAULT_URL`]. There is no fallback for the key.
pub fn build_context(args: &GlobalArgs) -> Result<Context, LidarrError> {
    let store = SettingsStore::open(args.config.clone())?;
    let (base_url, api_key) = resolve_connection(args, &store)?;

    let config = ConnectionConfig::new(&base_url, &api_key)?
        .with_timeout(Duration::from_secs(args.timeout))
        .with_retries(args.retries, DEFAULT_RETRY_BACKOFF_FACTOR)?;
    log::debug!("Using Lidarr at {}", config.base_url());

    Ok(Context {
        client: LidarrClient::connect(config),
        store,
        retries: args.retries,
        assume_yes: args.yes,
    })
}

pub fn resolve_connection(
    args: &GlobalArgs,
    store: &SettingsStore,
) -> Result<(String, String), LidarrError> {
    let saved = store.connection();
    let base_url = args
        .url
        .clone()
        .or_else(|| saved.map(|c| c.base_url.clone()))
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    let api_key = args
        .api_key
        .clone()
        .or_else(|| saved.map(|c| c.api_key.clone()))
        .ok_or_else(|| {
            LidarrError::Config(
                "API key is required. Provide it via --api-key, LIDARR_API_KEY or `lidarr config save-connection`"
                    .to_string(),
            )
        })?;
    Ok((base_url, api_key))
}

/// Map a failed prompt onto the library error type.
pub fn prompt_error(err: InquireError) -> LidarrError {
    match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            LidarrError::Cancelled
        }
        InquireError::IO(e) => LidarrError::Io(e),
        InquireError::NotTTY => LidarrError::Config(
            "Interactive input needs a terminal; pass --yes or the matching option instead"
                .to_string(),
        ),
        other => LidarrError::InvalidData(format!("Failed to read input: {other}")),
    }
}

/// String field of a JSON object, or `"Unknown"`.
pub fn text<'a>(value: &'a Value, field: &str) -> &'a str {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
}

/// String field of a nested object such as `item.artist.artistName`.
pub fn nested_text<'a>(value: &'a Value, object: &str, field: &str) -> &'a str {
    value
        .get(object)
        .and_then(|inner| inner.get(field))
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
}

/// The `id` field for display, or `N/A`.
pub fn id_text(value: &Value) -> String {
    value
        .get("id")
        .and_then(Value::as_i64)
        .map_or_else(|| "N/A".to_string(), |id| id.to_string())
}

/// Shorten `value` to at most `max` characters, marking the cut with `...`.
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let kept: String = value.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// `YYYY-MM-DD` for an RFC 3339 timestamp, the input unchanged otherwise.
pub fn short_date(value: &str) -> String {
    lidarr_api::health::parse_timestamp(value)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| value.to_string())
}

pub fn total_pages(total_records: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_records.div_ceil(u64::from(page_size))
}
