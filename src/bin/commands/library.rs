use super::utils::{id_text, nested_text, short_date, text, total_pages, truncate, Context};
use super::ExportFormat;
use lidarr_api::data::{self, write_json};
use lidarr_api::{LidarrApi, LidarrClient, PageRequest, SortDirection};
use serde_json::Value;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

fn print_page_footer(page: u32, page_size: u32, total_records: u64, noun: &str) {
    let pages = total_pages(total_records, page_size);
    println!("\nPage {page} of {pages} (Total {noun}: {total_records})");
    if u64::from(page) < pages {
        println!("Use --page {} to see next page", page + 1);
    }
}

pub async fn handle_wanted_list(
    client: &LidarrClient,
    page: u32,
    page_size: u32,
    sort_by: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = client
        .get_wanted(PageRequest::new(page, page_size).sorted_by(sort_by, SortDirection::Descending))
        .await?;

    if result.records.is_empty() {
        println!("No wanted albums found");
        return Ok(());
    }

    println!(
        "Wanted Albums (Page {page}, showing {} of {} total):",
        result.records.len(),
        result.total_records
    );
    println!(
        "{:<30} {:<40} {:<12} {:<15}",
        "Artist", "Album", "Release Date", "Status"
    );
    println!("{}", "-".repeat(100));

    for album in &result.records {
        let status = if album.get("monitored").and_then(Value::as_bool) == Some(true) {
            "Monitored"
        } else {
            "Unmonitored"
        };
        println!(
            "{:<30} {:<40} {:<12} {:<15}",
            truncate(nested_text(album, "artist", "artistName"), 28),
            truncate(text(album, "title"), 38),
            short_date(text(album, "releaseDate")),
            status
        );
    }

    print_page_footer(page, page_size, result.total_records, "wanted");
    Ok(())
}

/// Queue a search for the first `limit` wanted albums.
pub async fn handle_wanted_search(
    client: &LidarrClient,
    limit: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = client.get_wanted(PageRequest::new(1, limit)).await?;
    if result.records.is_empty() {
        println!("No wanted albums to search for");
        return Ok(());
    }

    println!(
        "🔎 Triggering search for {} wanted albums...",
        result.records.len()
    );
    let mut started = 0;
    for album in &result.records {
        let label = format!(
            "{} - {}",
            nested_text(album, "artist", "artistName"),
            text(album, "title")
        );
        let Some(album_id) = album.get("id").and_then(Value::as_i64) else {
            println!("  ❌ {label}: no album id");
            continue;
        };
        match client.search_album(album_id).await {
            Ok(_) => {
                started += 1;
                println!("  ✅ {label}");
            }
            Err(e) => println!("  ❌ Failed to search for album {album_id}: {e}"),
        }
    }
    println!("Search initiated for {started} albums");
    Ok(())
}

pub async fn handle_wanted_export(
    client: &LidarrClient,
    output: &Path,
    format: ExportFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let albums = data::export_wanted(client).await?;
    let writer = BufWriter::new(File::create(output)?);
    match format {
        ExportFormat::Json => write_json(&albums, writer)?,
        ExportFormat::Csv => {
            data::write_wanted_csv(&albums, writer)?;
        }
    }
    println!(
        "💾 Exported {} wanted albums to {}",
        albums.len(),
        output.display()
    );
    Ok(())
}

pub async fn handle_quality_profiles(
    client: &LidarrClient,
) -> Result<(), Box<dyn std::error::Error>> {
    let profiles = client.get_quality_profiles().await?;
    if profiles.is_empty() {
        println!("No quality profiles found");
        return Ok(());
    }

    println!("Quality Profiles:");
    println!("{:<5} {:<30} {:<20} {:<10}", "ID", "Name", "Cutoff", "Items");
    println!("{}", "-".repeat(70));
    for profile in &profiles {
        let cutoff = profile
            .get("cutoff")
            .and_then(|cutoff| cutoff.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        let items = profile
            .get("items")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        println!(
            "{:<5} {:<30} {:<20} {:<10}",
            id_text(profile),
            text(profile, "name"),
            cutoff,
            items
        );
    }
    println!("\nTotal: {} profiles", profiles.len());
    Ok(())
}

pub async fn handle_metadata_profiles(
    client: &LidarrClient,
) -> Result<(), Box<dyn std::error::Error>> {
    let profiles = client.get_metadata_profiles().await?;
    if profiles.is_empty() {
        println!("No metadata profiles found");
        return Ok(());
    }

    println!("Metadata Profiles:");
    println!("{:<5} {:<30}", "ID", "Name");
    println!("{}", "-".repeat(40));
    for profile in &profiles {
        println!("{:<5} {:<30}", id_text(profile), text(profile, "name"));
    }
    println!("\nTotal: {} profiles", profiles.len());
    Ok(())
}

pub async fn handle_import_lists(client: &LidarrClient) -> Result<(), Box<dyn std::error::Error>> {
    let lists = client.get_import_lists().await?;
    if lists.is_empty() {
        println!("No import lists configured");
        return Ok(());
    }

    println!("Import Lists:");
    println!("{:<5} {:<30} {:<20} {:<10}", "ID", "Name", "Type", "Enabled");
    println!("{}", "-".repeat(70));
    for list in &lists {
        let enabled = if list.get("enabled").and_then(Value::as_bool) == Some(true) {
            "Yes"
        } else {
            "No"
        };
        println!(
            "{:<5} {:<30} {:<20} {:<10}",
            id_text(list),
            text(list, "name"),
            text(list, "implementation"),
            enabled
        );
    }
    println!("\nTotal: {} import lists", lists.len());
    Ok(())
}

pub async fn handle_import_list_test(
    client: &LidarrClient,
    list_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🧪 Testing import list {list_id}...");
    let result = client.test_import_list(list_id).await?;

    if result.get("isValid").and_then(Value::as_bool) == Some(true) {
        println!("✅ Import list test successful");
    } else {
        println!("❌ Import list test failed");
        for failure in result
            .get("validationFailures")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            println!(
                "  Error: {}",
                failure
                    .get("errorMessage")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown error")
            );
        }
    }
    Ok(())
}

/// Percentage downloaded, from the total and remaining sizes.
fn progress(item: &Value) -> String {
    let size = item.get("size").and_then(Value::as_f64).unwrap_or(0.0);
    let left = item.get("sizeleft").and_then(Value::as_f64).unwrap_or(0.0);
    if size > 0.0 && left >= 0.0 {
        format!("{:.1}%", (size - left) / size * 100.0)
    } else {
        "N/A".to_string()
    }
}

pub async fn handle_queue_list(
    client: &LidarrClient,
    page: u32,
    page_size: u32,
    include_unknown: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = client
        .get_queue(PageRequest::new(page, page_size).include_unknown_artist_items(include_unknown))
        .await?;

    if result.records.is_empty() {
        println!("Queue is empty");
        return Ok(());
    }

    println!(
        "Download Queue (Page {page}, showing {} of {} total items):",
        result.records.len(),
        result.total_records
    );
    println!(
        "{:<8} {:<25} {:<35} {:<15} {:<10} {:<12}",
        "ID", "Artist", "Album", "Status", "Progress", "Time Left"
    );
    println!("{}", "-".repeat(110));
    for item in &result.records {
        println!(
            "{:<8} {:<25} {:<35} {:<15} {:<10} {:<12}",
            id_text(item),
            truncate(nested_text(item, "artist", "artistName"), 23),
            truncate(nested_text(item, "album", "title"), 33),
            text(item, "status"),
            progress(item),
            truncate(text(item, "timeleft"), 10)
        );
    }

    print_page_footer(page, page_size, result.total_records, "items");
    Ok(())
}

pub async fn handle_queue_remove(
    ctx: &Context,
    queue_id: i64,
    remove_from_client: bool,
    blocklist: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !ctx.confirm(&format!("Remove queue item {queue_id}?"))? {
        println!("Removal cancelled");
        return Ok(());
    }
    ctx.client
        .delete_queue_item(queue_id, blocklist, remove_from_client)
        .await?;

    let mut message = "✅ Removed from queue".to_string();
    if remove_from_client {
        message.push_str(" and download client");
    }
    if blocklist {
        message.push_str(" and added to blocklist");
    }
    println!("{message}: item {queue_id}");
    Ok(())
}

pub async fn handle_blocklist_list(
    client: &LidarrClient,
    page: u32,
    page_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = client
        .get_blocklist(PageRequest::new(page, page_size))
        .await?;

    if result.records.is_empty() {
        println!("Blocklist is empty");
        return Ok(());
    }

    println!(
        "Blocklist (Page {page}, showing {} of {} total items):",
        result.records.len(),
        result.total_records
    );
    println!("{:<8} {:<30} {:<40} {:<12}", "ID", "Artist", "Title", "Date");
    println!("{}", "-".repeat(95));
    for item in &result.records {
        println!(
            "{:<8} {:<30} {:<40} {:<12}",
            id_text(item),
            truncate(nested_text(item, "artist", "artistName"), 28),
            truncate(text(item, "sourceTitle"), 38),
            short_date(text(item, "date"))
        );
    }

    print_page_footer(page, page_size, result.total_records, "items");
    Ok(())
}

pub async fn handle_blocklist_remove(
    client: &LidarrClient,
    item_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    client.delete_blocklist_item(item_id).await?;
    println!("✅ Removed item {item_id} from blocklist");
    Ok(())
}

pub async fn handle_blocklist_clear(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    println!("⚠️  This will remove ALL items from the blocklist.");
    if !ctx.confirm("Clear the blocklist?")? {
        println!("Clear cancelled");
        return Ok(());
    }
    ctx.client.clear_blocklist().await?;
    println!("✅ Blocklist cleared successfully");
    Ok(())
}

pub async fn handle_tags_list(client: &LidarrClient) -> Result<(), Box<dyn std::error::Error>> {
    let tags = client.get_tags().await?;
    if tags.is_empty() {
        println!("No tags defined");
        return Ok(());
    }
    println!("{:<5} {:<30}", "ID", "Label");
    println!("{}", "-".repeat(40));
    for tag in &tags {
        println!("{:<5} {:<30}", id_text(tag), text(tag, "label"));
    }
    println!("\nTotal: {} tags", tags.len());
    Ok(())
}

pub async fn handle_tags_add(
    client: &LidarrClient,
    label: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let tag = client.add_tag(label).await?;
    println!("🏷️  Created tag '{}' (ID: {})", text(&tag, "label"), id_text(&tag));
    Ok(())
}

pub async fn handle_tags_delete(
    ctx: &Context,
    tag_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    if !ctx.confirm(&format!("Delete tag {tag_id}?"))? {
        println!("Delete cancelled");
        return Ok(());
    }
    ctx.client.delete_tag(tag_id).await?;
    println!("✅ Deleted tag {tag_id}");
    Ok(())
}

pub async fn handle_tags_details(
    client: &LidarrClient,
    tag_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let details = client.get_tag_details(tag_id).await?;
    println!("🏷️  Tag {} '{}'", id_text(&details), text(&details, "label"));
    for (field, noun) in [
        ("artistIds", "artists"),
        ("importListIds", "import lists"),
        ("delayProfileIds", "delay profiles"),
        ("notificationIds", "notifications"),
        ("restrictionIds", "release profiles"),
    ] {
        let count = details
            .get(field)
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        println!("   Used by {count} {noun}");
    }
    Ok(())
}
