//! # Health checks
//!
//! Point-in-time checks of a Lidarr instance. A check that cannot be run
//! degrades the overall status instead of aborting the report, so a report
//! is always produced as long as the caller can reach this code.

use crate::iterator::PageRequest;
use crate::r#trait::LidarrApi;
use crate::{LidarrError, Result, SortDirection};
use chrono::{DateTime, Duration as ChronoDuration, Local, Utc};
use serde::Serialize;
use serde_json::Value;

/// Used-space percentage above which a disk is a warning.
pub const DISK_WARNING_PERCENT: f64 = 80.0;
/// Used-space percentage above which a disk is an error.
pub const DISK_ERROR_PERCENT: f64 = 90.0;
/// More stalled downloads than this is a warning.
pub const STALLED_WARNING_THRESHOLD: usize = 5;
/// Number of queue items inspected by a check.
pub const QUEUE_SAMPLE_SIZE: u32 = 100;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Overall verdict, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Error,
}

impl HealthStatus {
    /// Process exit code for this status.
    pub fn exit_code(&self) -> i32 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Warning => 1,
            HealthStatus::Error => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
    pub version: Option<String>,
    pub build_time: Option<String>,
    pub start_time: Option<String>,
    pub runtime: String,
    pub os: String,
}

impl SystemInfo {
    fn from_status(status: &Value) -> Self {
        Self {
            version: str_field(status, "version"),
            build_time: str_field(status, "buildTime"),
            start_time: str_field(status, "startTime"),
            runtime: format!(
                "{} {}",
                str_field(status, "runtimeName").unwrap_or_default(),
                str_field(status, "runtimeVersion").unwrap_or_default()
            ),
            os: format!(
                "{} {}",
                str_field(status, "osName").unwrap_or_default(),
                str_field(status, "osVersion").unwrap_or_default()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskUsage {
    pub path: String,
    pub free_gb: f64,
    pub total_gb: f64,
    pub used_percent: f64,
}

impl DiskUsage {
    /// `None` for disks reporting no total size.
    pub fn from_disk(disk: &Value) -> Option<Self> {
        let free = disk.get("freeSpace").and_then(Value::as_f64).unwrap_or(0.0);
        let total = disk.get("totalSpace").and_then(Value::as_f64).unwrap_or(0.0);
        if total <= 0.0 {
            return None;
        }
        Some(Self {
            path: str_field(disk, "path").unwrap_or_else(|| "Unknown".to_string()),
            free_gb: round1(free / GIB),
            total_gb: round1(total / GIB),
            used_percent: round1((total - free) / total * 100.0),
        })
    }
}

/// Counts over a sample of the download queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub total_items: u64,
    pub active_downloads: usize,
    pub failed_downloads: usize,
    pub stalled_downloads: usize,
}

impl QueueSummary {
    pub fn from_records(records: &[Value], total_items: u64) -> Self {
        let count = |statuses: &[&str]| {
            records
                .iter()
                .filter(|item| {
                    item.get("status")
                        .and_then(Value::as_str)
                        .is_some_and(|status| statuses.contains(&status))
                })
                .count()
        };
        Self {
            total_items,
            active_downloads: count(&["downloading", "queued"]),
            failed_downloads: count(&["failed", "warning"]),
            stalled_downloads: count(&["delay"]),
        }
    }

    /// Queue items that count as failed.
    pub fn failed_items(records: &[Value]) -> Vec<&Value> {
        records
            .iter()
            .filter(|item| {
                matches!(
                    item.get("status").and_then(Value::as_str),
                    Some("failed" | "warning")
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileCounts {
    pub quality_profiles_count: usize,
    pub metadata_profiles_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportListCounts {
    pub total_lists: usize,
    pub enabled_lists: usize,
}

/// Results of the individual checks. Checks that did not run are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthChecks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_info: Option<SystemInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_space: Option<Vec<DiskUsage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wanted_albums: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_artists: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitored_artists: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles: Option<ProfileCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_lists: Option<ImportListCounts>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Local>,
    pub status: HealthStatus,
    pub checks: HealthChecks,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl HealthReport {
    fn new() -> Self {
        Self {
            timestamp: Local::now(),
            status: HealthStatus::Healthy,
            checks: HealthChecks::default(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Raise the status to at least `status`.
    fn escalate(&mut self, status: HealthStatus) {
        self.status = self.status.max(status);
    }

    fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.warnings.push(message);
        self.escalate(HealthStatus::Warning);
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

/// System, disk, queue and wanted checks.
pub async fn system_status_check<C: LidarrApi + ?Sized>(client: &C) -> HealthReport {
    let mut report = HealthReport::new();

    match client.get_system_status().await {
        Ok(status) => {
            let info = SystemInfo::from_status(&status);
            if let Some(start_time) = &info.start_time {
                report.checks.uptime = Some(
                    uptime_since(start_time, Utc::now()).unwrap_or_else(|| "Unknown".to_string()),
                );
            }
            report.checks.system_info = Some(info);
        }
        Err(e) => {
            log::error!("System status check failed: {e}");
            report.errors.push(format!("Failed to get system status: {e}"));
            report.escalate(HealthStatus::Error);
        }
    }

    match client.get_disk_space().await {
        Ok(disks) => {
            let usage: Vec<DiskUsage> = disks.iter().filter_map(DiskUsage::from_disk).collect();
            for disk in &usage {
                if disk.used_percent > DISK_ERROR_PERCENT {
                    report.errors.push(format!(
                        "Critical: Disk {} is {:.1}% full",
                        disk.path, disk.used_percent
                    ));
                    report.escalate(HealthStatus::Error);
                } else if disk.used_percent > DISK_WARNING_PERCENT {
                    report.warn(format!(
                        "Warning: Disk {} is {:.1}% full",
                        disk.path, disk.used_percent
                    ));
                }
            }
            report.checks.disk_space = Some(usage);
        }
        Err(e) => {
            report.errors.push(format!("Failed to check disk space: {e}"));
            report.escalate(HealthStatus::Warning);
        }
    }

    match client.get_queue(PageRequest::new(1, QUEUE_SAMPLE_SIZE)).await {
        Ok(page) => {
            let summary = QueueSummary::from_records(&page.records, page.total_records);
            if summary.failed_downloads > 0 {
                report.warn(format!(
                    "Warning: {} failed downloads in queue",
                    summary.failed_downloads
                ));
            }
            if summary.stalled_downloads > STALLED_WARNING_THRESHOLD {
                report.warn(format!(
                    "Warning: {} stalled downloads",
                    summary.stalled_downloads
                ));
            }
            report.checks.queue = Some(summary);
        }
        Err(e) => {
            report.errors.push(format!("Failed to check queue: {e}"));
            report.escalate(HealthStatus::Warning);
        }
    }

    match client.get_wanted(PageRequest::new(1, 1)).await {
        Ok(page) => report.checks.wanted_albums = Some(page.total_records),
        Err(e) => report.warn(format!("Failed to check wanted albums: {e}")),
    }

    report
}

/// [`system_status_check`] plus library, profile and import list counts.
///
/// Failures of the extra sections are noted as warnings but leave the
/// status alone.
pub async fn full_health_report<C: LidarrApi + ?Sized>(client: &C) -> HealthReport {
    let mut report = system_status_check(client).await;

    match client.get_all_artists().await {
        Ok(artists) => {
            report.checks.total_artists = Some(artists.len());
            report.checks.monitored_artists = Some(
                artists
                    .iter()
                    .filter(|a| a.get("monitored").and_then(Value::as_bool) == Some(true))
                    .count(),
            );
        }
        Err(e) => {
            log::warn!("Artist statistics unavailable: {e}");
            report
                .warnings
                .push("Failed to get artist statistics".to_string());
        }
    }

    let profiles = async {
        let quality = client.get_quality_profiles().await?;
        let metadata = client.get_metadata_profiles().await?;
        Ok::<_, LidarrError>(ProfileCounts {
            quality_profiles_count: quality.len(),
            metadata_profiles_count: metadata.len(),
        })
    };
    match profiles.await {
        Ok(counts) => report.checks.profiles = Some(counts),
        Err(e) => {
            log::warn!("Profile information unavailable: {e}");
            report
                .warnings
                .push("Failed to get profile information".to_string());
        }
    }

    match client.get_import_lists().await {
        Ok(lists) => {
            report.checks.import_lists = Some(ImportListCounts {
                total_lists: lists.len(),
                enabled_lists: lists
                    .iter()
                    .filter(|l| l.get("enabled").and_then(Value::as_bool) == Some(true))
                    .count(),
            });
        }
        Err(e) => {
            log::warn!("Import list information unavailable: {e}");
            report
                .warnings
                .push("Failed to get import list information".to_string());
        }
    }

    report
}

/// Download activity within a recent window of history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub grabbed: usize,
    pub imported: usize,
    pub failed: usize,
    /// Failed records, newest first
    pub failures: Vec<Value>,
}

impl HistorySummary {
    /// Summarize the records dated at or after `since`. Records without a
    /// parseable date are skipped.
    pub fn from_records(records: &[Value], since: DateTime<Utc>) -> Self {
        let mut summary = Self::default();
        for record in records {
            let Some(date) = record
                .get("date")
                .and_then(Value::as_str)
                .and_then(parse_timestamp)
            else {
                continue;
            };
            if date < since {
                continue;
            }
            match record.get("eventType").and_then(Value::as_str) {
                Some("grabbed") => summary.grabbed += 1,
                Some("trackFileImported") => summary.imported += 1,
                Some("downloadFailed") => {
                    summary.failed += 1;
                    summary.failures.push(record.clone());
                }
                _ => {}
            }
        }
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.grabbed == 0 && self.imported == 0 && self.failed == 0
    }

    /// Imports per grab, as a percentage. Zero when nothing was grabbed.
    pub fn success_rate(&self) -> f64 {
        if self.grabbed == 0 {
            return 0.0;
        }
        self.imported as f64 / self.grabbed as f64 * 100.0
    }
}

/// Start of a window of `hours` hours ending at `now`.
///
/// Fails with [`LidarrError::InvalidData`] for negative spans and for spans
/// that reach outside the representable date range.
pub fn history_cutoff(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    if hours < 0 {
        return Err(LidarrError::InvalidData(format!(
            "History window must not be negative, got {hours} hours"
        )));
    }
    ChronoDuration::try_hours(hours)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| {
            LidarrError::InvalidData(format!("History window of {hours} hours is too large"))
        })
}

/// Summarize the newest page of history over the last `hours` hours.
pub async fn recent_history<C: LidarrApi + ?Sized>(client: &C, hours: i64) -> Result<HistorySummary> {
    let since = history_cutoff(Utc::now(), hours)?;
    let page = client
        .get_history(
            PageRequest::new(1, QUEUE_SAMPLE_SIZE).sorted_by("date", SortDirection::Descending),
        )
        .await?;
    Ok(HistorySummary::from_records(&page.records, since))
}

/// Human readable size with one decimal, using 1024 steps.
pub fn format_bytes(bytes: f64) -> String {
    let mut value = bytes;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} PB")
}

/// Compact duration such as `45s`, `3m 7s`, `5h 12m` or `2d 4h`.
pub fn format_duration(seconds: u64) -> String {
    match seconds {
        0..=59 => format!("{seconds}s"),
        60..=3599 => format!("{}m {}s", seconds / 60, seconds % 60),
        3600..=86399 => format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60),
        _ => format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600),
    }
}

/// Uptime for a server started at `start_time` (RFC 3339).
pub fn uptime_since(start_time: &str, now: DateTime<Utc>) -> Option<String> {
    let started = parse_timestamp(start_time)?;
    let seconds = (now - started).num_seconds().max(0) as u64;
    Some(format_duration(seconds))
}

/// Lidarr timestamps are RFC 3339, usually with a `Z` suffix.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterator::Page;
    use crate::r#trait::MockLidarrApi;
    use crate::TransportFailure;
    use serde_json::json;

    fn server_error(endpoint: &str) -> LidarrError {
        LidarrError::Transport {
            url: format!("http://localhost:8686/api/v1/{endpoint}"),
            failure: TransportFailure::Status {
                status: 500,
                attempts: 4,
                body: String::new(),
            },
        }
    }

    fn disk(used_percent: u64) -> Value {
        let total: u64 = 1000 * 1024 * 1024 * 1024;
        json!({
            "path": "/music",
            "freeSpace": total / 100 * (100 - used_percent),
            "totalSpace": total,
        })
    }

    fn healthy_mock(disk_used: u64, queue: Vec<Value>) -> MockLidarrApi {
        let mut mock = MockLidarrApi::new();
        mock.expect_get_system_status().returning(|| {
            Ok(json!({
                "version": "2.0.7.3849",
                "startTime": "2024-01-01T00:00:00Z",
                "runtimeName": ".NET",
                "runtimeVersion": "6.0.13",
                "osName": "ubuntu",
                "osVersion": "22.04"
            }))
        });
        mock.expect_get_disk_space()
            .returning(move || Ok(vec![disk(disk_used)]));
        mock.expect_get_queue().returning(move |_| {
            let total = queue.len() as u64;
            Ok(Page::new(queue.clone(), total))
        });
        mock.expect_get_wanted()
            .returning(|_| Ok(Page::new(vec![json!({"id": 1})], 42)));
        mock
    }

    #[tokio::test]
    async fn test_healthy_system() {
        let mock = healthy_mock(50, vec![json!({"status": "downloading"})]);
        let report = system_status_check(&mock).await;

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.exit_code(), 0);
        assert!(report.warnings.is_empty());
        assert!(report.errors.is_empty());
        assert_eq!(report.checks.wanted_albums, Some(42));
        let info = report.checks.system_info.unwrap();
        assert_eq!(info.runtime, ".NET 6.0.13");
        assert_eq!(info.os, "ubuntu 22.04");
        assert!(report.checks.uptime.is_some());
        let queue = report.checks.queue.unwrap();
        assert_eq!(queue.active_downloads, 1);
    }

    #[tokio::test]
    async fn test_disk_thresholds() {
        let report = system_status_check(&healthy_mock(85, vec![])).await;
        assert_eq!(report.status, HealthStatus::Warning);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.warnings, vec!["Warning: Disk /music is 85.0% full"]);

        let report = system_status_check(&healthy_mock(95, vec![])).await;
        assert_eq!(report.status, HealthStatus::Error);
        assert_eq!(report.exit_code(), 2);
        assert_eq!(report.errors, vec!["Critical: Disk /music is 95.0% full"]);
    }

    #[tokio::test]
    async fn test_queue_problems_are_warnings() {
        let mut queue = vec![json!({"status": "failed"}), json!({"status": "queued"})];
        queue.extend((0..6).map(|_| json!({"status": "delay"})));

        let report = system_status_check(&healthy_mock(10, queue)).await;

        assert_eq!(report.status, HealthStatus::Warning);
        assert_eq!(report.warnings.len(), 2);
        let summary = report.checks.queue.unwrap();
        assert_eq!(summary.failed_downloads, 1);
        assert_eq!(summary.stalled_downloads, 6);
        assert_eq!(summary.active_downloads, 1);
    }

    #[tokio::test]
    async fn test_failed_status_check_does_not_abort_report() {
        let mut mock = MockLidarrApi::new();
        mock.expect_get_system_status()
            .returning(|| Err(server_error("system/status")));
        mock.expect_get_disk_space().returning(|| Ok(vec![disk(10)]));
        mock.expect_get_queue()
            .returning(|_| Ok(Page::new(Vec::new(), 0)));
        mock.expect_get_wanted()
            .returning(|_| Err(server_error("wanted/missing")));

        let report = system_status_check(&mock).await;

        assert_eq!(report.status, HealthStatus::Error);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Failed to get system status"));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.checks.disk_space.as_ref().map(Vec::len), Some(1));
        assert!(report.checks.wanted_albums.is_none());
    }

    #[tokio::test]
    async fn test_full_report_adds_counts() {
        let mut mock = healthy_mock(10, vec![]);
        mock.expect_get_all_artists().returning(|| {
            Ok(vec![
                json!({"monitored": true}),
                json!({"monitored": false}),
                json!({"monitored": true}),
            ])
        });
        mock.expect_get_quality_profiles()
            .returning(|| Ok(vec![json!({"id": 1}), json!({"id": 2})]));
        mock.expect_get_metadata_profiles()
            .returning(|| Ok(vec![json!({"id": 1})]));
        mock.expect_get_import_lists()
            .returning(|| Err(server_error("importlist")));

        let report = full_health_report(&mock).await;

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.checks.total_artists, Some(3));
        assert_eq!(report.checks.monitored_artists, Some(2));
        assert_eq!(
            report.checks.profiles,
            Some(ProfileCounts {
                quality_profiles_count: 2,
                metadata_profiles_count: 1
            })
        );
        assert_eq!(report.warnings, vec!["Failed to get import list information"]);
    }

    #[test]
    fn test_history_summary() {
        let since = parse_timestamp("2024-03-01T00:00:00Z").unwrap();
        let records = vec![
            json!({"eventType": "grabbed", "date": "2024-03-02T10:00:00Z"}),
            json!({"eventType": "grabbed", "date": "2024-03-02T11:00:00Z"}),
            json!({"eventType": "trackFileImported", "date": "2024-03-02T12:00:00Z"}),
            json!({"eventType": "downloadFailed", "date": "2024-03-02T13:00:00Z"}),
            json!({"eventType": "grabbed", "date": "2024-02-01T00:00:00Z"}),
            json!({"eventType": "grabbed", "date": "not a date"}),
        ];

        let summary = HistorySummary::from_records(&records, since);

        assert_eq!(summary.grabbed, 2);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures.len(), 1);
        assert!((summary.success_rate() - 50.0).abs() < f64::EPSILON);
        assert_eq!(HistorySummary::default().success_rate(), 0.0);
    }

    #[test]
    fn test_history_cutoff() {
        let now = parse_timestamp("2024-03-02T12:00:00Z").unwrap();
        assert_eq!(
            history_cutoff(now, 24).unwrap(),
            parse_timestamp("2024-03-01T12:00:00Z").unwrap()
        );
        assert_eq!(history_cutoff(now, 0).unwrap(), now);
        assert!(matches!(
            history_cutoff(now, -1),
            Err(LidarrError::InvalidData(_))
        ));
        assert!(matches!(
            history_cutoff(now, i64::MAX / 2),
            Err(LidarrError::InvalidData(_))
        ));
        assert!(matches!(
            history_cutoff(now, 10_000_000_000),
            Err(LidarrError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_history_window_sends_nothing() {
        let mut mock = MockLidarrApi::new();
        mock.expect_get_history().never();

        let result = recent_history(&mock, i64::MAX).await;

        assert!(matches!(result, Err(LidarrError::InvalidData(_))));
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_bytes(512.0), "512.0 B");
        assert_eq!(format_bytes(1536.0), "1.5 KB");
        assert_eq!(format_bytes(3.0 * GIB), "3.0 GB");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(187), "3m 7s");
        assert_eq!(format_duration(5 * 3600 + 12 * 60), "5h 12m");
        assert_eq!(format_duration(2 * 86400 + 4 * 3600), "2d 4h");
    }

    #[test]
    fn test_uptime() {
        let now = parse_timestamp("2024-01-02T01:00:00Z").unwrap();
        assert_eq!(
            uptime_since("2024-01-01T00:00:00Z", now),
            Some("1d 1h".to_string())
        );
        assert_eq!(uptime_since("yesterday", now), None);
    }
}
