use super::ExportFormat;
use lidarr_api::data::{self, write_json, ImportSummary};
use lidarr_api::{LidarrApi, LidarrClient, LidarrError};
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

fn read_json(input: &Path) -> Result<Value, LidarrError> {
    let content = fs::read_to_string(input)?;
    serde_json::from_str(&content)
        .map_err(|e| LidarrError::InvalidData(format!("{} is not valid JSON: {e}", input.display())))
}

fn print_summary(summary: &ImportSummary, noun: &str) {
    let added = if summary.dry_run { "Would add" } else { "Added" };
    for name in &summary.added {
        println!("  ➕ {name}");
    }
    for (name, reason) in &summary.skipped {
        println!("  ⏭️  {name}: {reason}");
    }
    for (name, error) in &summary.failed {
        println!("  ❌ {name}: {error}");
    }
    println!(
        "\n{added} {} {noun}, skipped {}, failed {}",
        summary.added.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    if summary.dry_run {
        println!("Dry run: nothing was changed. Run again without --dry-run to apply.");
    }
}

pub async fn handle_export_artists(
    client: &LidarrClient,
    output: &Path,
    format: ExportFormat,
    include_albums: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let writer = BufWriter::new(File::create(output)?);
    let count = match format {
        ExportFormat::Json => {
            let artists = data::export_artists(client, include_albums).await?;
            write_json(&artists, writer)?;
            artists.len()
        }
        ExportFormat::Csv => {
            if include_albums {
                println!("⚠️  Albums are only included in JSON exports");
            }
            let artists = client.get_all_artists().await?;
            data::write_artists_csv(&artists, writer)?
        }
    };
    println!("💾 Exported {count} artists to {}", output.display());
    Ok(())
}

pub async fn handle_import_artists(
    client: &LidarrClient,
    input: &Path,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let artists = read_json(input)?;
    let summary = data::import_artists(client, &artists, dry_run).await?;
    print_summary(&summary, "artists");
    Ok(())
}

pub async fn handle_export_config(
    client: &LidarrClient,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let export = data::export_configuration(client).await?;
    for warning in &export.warnings {
        println!("⚠️  {warning}");
    }
    write_json(&export, BufWriter::new(File::create(output)?))?;
    println!(
        "💾 Exported {} quality profiles, {} metadata profiles, {} tags, {} root folders and {} import lists to {}",
        export.quality_profiles.len(),
        export.metadata_profiles.len(),
        export.tags.len(),
        export.root_folders.len(),
        export.import_lists.len(),
        output.display()
    );
    Ok(())
}

pub async fn handle_import_tags(
    client: &LidarrClient,
    input: &Path,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let configuration = read_json(input)?;
    let summary = data::import_tags(client, &configuration, dry_run).await?;
    print_summary(&summary, "tags");
    Ok(())
}
