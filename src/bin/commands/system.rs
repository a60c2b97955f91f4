use super::utils::{nested_text, text, Context};
use chrono::Local;
use lidarr_api::data::write_json;
use lidarr_api::health::{
    self, format_bytes, HealthReport, QueueSummary, DISK_ERROR_PERCENT, DISK_WARNING_PERCENT,
    QUEUE_SAMPLE_SIZE, STALLED_WARNING_THRESHOLD,
};
use lidarr_api::{LidarrApi, LidarrClient, LidarrError, Page, PageRequest};
use serde_json::Value;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Number of failed queue items listed under an alert.
const ALERT_DETAIL_LIMIT: usize = 5;
/// Number of failures listed by the history summary.
const FAILURE_DETAIL_LIMIT: usize = 10;

/// Run the status checks and return the exit code for the overall verdict.
pub async fn handle_status_command(
    client: &LidarrClient,
    details: bool,
    json: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    let report = health::system_status_check(client).await;

    if json {
        write_json(&report, std::io::stdout().lock())?;
        return Ok(report.exit_code());
    }

    if details {
        print_check_details(&report);
        println!();
    }
    println!("Overall Status: {}", report.status.as_str().to_uppercase());
    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  ⚠️  {warning}");
        }
    }
    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for error in &report.errors {
            println!("  ❌ {error}");
        }
    }

    Ok(report.exit_code())
}

fn print_check_details(report: &HealthReport) {
    let checks = &report.checks;
    if let Some(info) = &checks.system_info {
        println!(
            "✅ Lidarr {} is running",
            info.version.as_deref().unwrap_or("(unknown version)")
        );
        println!(
            "   Uptime: {}",
            checks.uptime.as_deref().unwrap_or("Unknown")
        );
        println!("   Runtime: {}", info.runtime.trim());
        println!("   OS: {}", info.os.trim());
    }
    for disk in checks.disk_space.iter().flatten() {
        let icon = if disk.used_percent > DISK_ERROR_PERCENT {
            "❌"
        } else if disk.used_percent > DISK_WARNING_PERCENT {
            "⚠️ "
        } else {
            "✅"
        };
        println!(
            "{icon} Disk {}: {:.1} GB free of {:.1} GB ({:.1}% used)",
            disk.path, disk.free_gb, disk.total_gb, disk.used_percent
        );
    }
    if let Some(queue) = &checks.queue {
        let icon = if queue.failed_downloads > 0
            || queue.stalled_downloads > STALLED_WARNING_THRESHOLD
        {
            "⚠️ "
        } else {
            "✅"
        };
        println!(
            "{icon} Queue: {} total, {} active, {} failed, {} stalled",
            queue.total_items,
            queue.active_downloads,
            queue.failed_downloads,
            queue.stalled_downloads
        );
    }
    if let Some(wanted) = checks.wanted_albums {
        println!("ℹ️  Wanted albums: {wanted}");
    }
}

/// Poll the download queue forever, alerting when too many items fail.
///
/// Errors from a single poll are printed and the loop carries on. The
/// loop ends only when the process is interrupted.
pub async fn handle_monitor_command(
    client: &LidarrClient,
    interval_secs: u64,
    max_failed: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if interval_secs == 0 {
        return Err(LidarrError::InvalidData("--interval must be at least 1 second".to_string()).into());
    }

    println!("👀 Starting continuous queue monitoring (checking every {interval_secs} seconds)");
    println!("   Will alert if failed downloads exceed {max_failed}");
    println!("   Press Ctrl+C to stop...");

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        match client
            .get_queue(PageRequest::new(1, QUEUE_SAMPLE_SIZE))
            .await
        {
            Ok(page) => {
                for line in queue_report(&page, max_failed, &timestamp) {
                    println!("{line}");
                }
            }
            Err(e) => eprintln!("❌ Error monitoring queue: {e}"),
        }
    }
}

/// Lines printed for one poll of the queue.
fn queue_report(page: &Page<Value>, max_failed: usize, timestamp: &str) -> Vec<String> {
    let summary = QueueSummary::from_records(&page.records, page.total_records);

    if summary.failed_downloads > max_failed {
        let mut lines = vec![format!(
            "🚨 ALERT [{timestamp}]: {} failed downloads (threshold: {max_failed})",
            summary.failed_downloads
        )];
        let failed = QueueSummary::failed_items(&page.records);
        for item in failed.iter().take(ALERT_DETAIL_LIMIT) {
            let message = item
                .get("errorMessage")
                .and_then(Value::as_str)
                .unwrap_or("No error message");
            lines.push(format!(
                "  ❌ {} - {}: {message}",
                nested_text(item, "artist", "artistName"),
                nested_text(item, "album", "title")
            ));
        }
        if failed.len() > ALERT_DETAIL_LIMIT {
            lines.push(format!(
                "  ... and {} more failed items",
                failed.len() - ALERT_DETAIL_LIMIT
            ));
        }
        return lines;
    }

    let mut status = format!(
        "[{timestamp}] Queue: {} total, {} active",
        summary.total_items, summary.active_downloads
    );
    if summary.failed_downloads > 0 {
        status.push_str(&format!(", {} failed", summary.failed_downloads));
    }
    if summary.stalled_downloads > 0 {
        status.push_str(&format!(", {} stalled", summary.stalled_downloads));
    }
    vec![status]
}

/// Summarize grabs, imports and failures over the last `hours` hours.
pub async fn handle_history_command(
    client: &LidarrClient,
    hours: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let summary = health::recent_history(client, hours).await?;

    if summary.is_empty() {
        println!("No history items found in the last {hours} hours");
        return Ok(());
    }

    println!("📊 Recent Activity (last {hours} hours):");
    println!("  Grabbed: {}", summary.grabbed);
    println!("  Imported: {}", summary.imported);
    println!("  Failed: {}", summary.failed);

    if summary.failed > 0 {
        println!("\nRecent Failures:");
        for item in summary.failures.iter().take(FAILURE_DETAIL_LIMIT) {
            let date = item
                .get("date")
                .and_then(Value::as_str)
                .map(|raw| {
                    health::parse_timestamp(raw)
                        .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| raw.to_string())
                })
                .unwrap_or_else(|| "Unknown".to_string());
            println!(
                "  ❌ [{date}] {} - {}",
                nested_text(item, "artist", "artistName"),
                nested_text(item, "album", "title")
            );
        }
    }

    println!(
        "\nSuccess Rate: {:.1}% ({}/{})",
        summary.success_rate(),
        summary.imported,
        summary.grabbed
    );
    Ok(())
}

/// Write the full health report as JSON to `output`.
pub async fn handle_health_report_command(
    client: &LidarrClient,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Generating comprehensive health report...");
    let report = health::full_health_report(client).await;

    write_json(&report, BufWriter::new(File::create(output)?))?;

    println!("💾 Health report exported to {}", output.display());
    println!("Overall status: {}", report.status.as_str().to_uppercase());
    if !report.warnings.is_empty() {
        println!("Warnings: {}", report.warnings.len());
    }
    if !report.errors.is_empty() {
        println!("Errors: {}", report.errors.len());
    }
    Ok(())
}

pub async fn handle_backup_list(client: &LidarrClient) -> Result<(), Box<dyn std::error::Error>> {
    let backups = client.get_system_backups().await?;
    if backups.is_empty() {
        println!("No backups found");
        return Ok(());
    }

    println!("{:<45} {:<10} {:<12} {:<20}", "Name", "Type", "Size", "Created");
    println!("{}", "-".repeat(90));
    for backup in &backups {
        let size = backup
            .get("size")
            .and_then(Value::as_f64)
            .map(format_bytes)
            .unwrap_or_else(|| "Unknown".to_string());
        println!(
            "{:<45} {:<10} {:<12} {:<20}",
            text(backup, "name"),
            text(backup, "type"),
            size,
            text(backup, "time")
        );
    }
    Ok(())
}

pub async fn handle_backup_create(client: &LidarrClient) -> Result<(), Box<dyn std::error::Error>> {
    let command = client.start_backup().await?;
    println!(
        "✅ Backup started (command ID: {})",
        command.get("id").and_then(Value::as_i64).unwrap_or_default()
    );
    Ok(())
}

pub async fn handle_backup_restore(
    ctx: &Context,
    file: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !ctx.confirm(&format!(
        "Restore Lidarr from '{file}'? The current database will be replaced."
    ))? {
        println!("Restore cancelled");
        return Ok(());
    }
    ctx.client.restore_system(file).await?;
    println!("✅ Restore from '{file}' started. Lidarr will restart when it finishes.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn queue_page(statuses: &[&str]) -> Page<Value> {
        let records = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                json!({
                    "id": i,
                    "status": status,
                    "artist": {"artistName": format!("Artist {i}")},
                    "album": {"title": format!("Album {i}")},
                })
            })
            .collect();
        Page::new(records, statuses.len() as u64)
    }

    #[test]
    fn test_queue_report_without_alert() {
        let page = queue_page(&["downloading", "queued", "failed", "delay"]);
        let lines = queue_report(&page, 10, "2024-01-01 12:00:00");
        assert_eq!(
            lines,
            vec!["[2024-01-01 12:00:00] Queue: 4 total, 2 active, 1 failed, 1 stalled"]
        );
    }

    #[test]
    fn test_queue_report_alert_lists_first_failures() {
        let page = queue_page(&["failed"; 7]);
        let lines = queue_report(&page, 3, "now");
        assert_eq!(lines[0], "🚨 ALERT [now]: 7 failed downloads (threshold: 3)");
        assert_eq!(lines[1], "  ❌ Artist 0 - Album 0: No error message");
        assert_eq!(lines.len(), 1 + ALERT_DETAIL_LIMIT + 1);
        assert_eq!(lines[6], "  ... and 2 more failed items");
    }
}
