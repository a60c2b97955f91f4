//! # lidarr-api
//!
//! Async client for the [Lidarr](https://lidarr.audio) v1 REST API, plus the
//! maintenance tooling built on it: health checks, bulk artist edits and
//! library import/export.
//!
//! Every call goes through a [`RequestGateway`], which rate-limits requests
//! per client, retries transient server errors and decodes JSON bodies.
//! Operations that span several calls can be retried as a whole with
//! [`retry_with_backoff`].
//!
//! ```rust,no_run
//! use lidarr_api::{ConnectionConfig, LidarrApi, LidarrClient};
//!
//! # tokio_test::block_on(async {
//! let config = ConnectionConfig::new("http://localhost:8686", "api-key")?;
//! let client = LidarrClient::new(Box::new(http_client::native::NativeClient::new()), config);
//!
//! let status = client.get_system_status().await?;
//! println!("Lidarr {}", status["version"]);
//! # Ok::<(), lidarr_api::LidarrError>(())
//! # }).unwrap();
//! ```

pub mod bulk;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod gateway;
pub mod health;
pub mod iterator;
pub mod retry;
pub mod settings;
pub mod r#trait;
pub mod types;

pub use client::{all_blocklist, all_history, all_queue, all_wanted, LidarrClient};
pub use config::ConnectionConfig;
pub use error::{LidarrError, TransportFailure};
pub use gateway::{ApiRequest, RequestGateway, RequestState};
pub use health::{HealthReport, HealthStatus};
pub use iterator::{
    collect_pages, AsyncPaginatedIterator, Page, PageRequest, PagedIterator, SortDirection,
};
pub use r#trait::LidarrApi;
pub use retry::{retry_operation, retry_with_backoff, RetryConfig, RetryResult};
pub use settings::{ArtistDefaults, ConnectionSettings, SettingsStore};
pub use types::{AlbumMonitor, NewArtist};

#[cfg(feature = "mock")]
pub use r#trait::MockLidarrApi;

pub type Result<T> = std::result::Result<T, LidarrError>;
