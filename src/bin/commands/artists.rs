use super::utils::{id_text, text, Context};
use lidarr_api::bulk::{self, TagChange};
use lidarr_api::LidarrClient;
use serde_json::Value;

pub async fn handle_set_monitored(
    client: &LidarrClient,
    artist_ids: &[i64],
    monitored: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = bulk::set_monitored(client, artist_ids, monitored).await?;
    let action = if monitored { "Monitored" } else { "Unmonitored" };
    match outcome.updated {
        Some(updated) => println!("✅ {action} {updated} of {} artists", outcome.requested),
        None => println!("✅ {action} {} artists", outcome.requested),
    }
    Ok(())
}

pub async fn handle_change_tags(
    ctx: &Context,
    artist_ids: &[i64],
    tag_ids: &[i64],
    change: TagChange,
) -> Result<(), Box<dyn std::error::Error>> {
    let verb = match change {
        TagChange::Add => "Add",
        TagChange::Remove => "Remove",
    };
    if change == TagChange::Remove
        && !ctx.confirm(&format!(
            "{verb} {} tag(s) from {} artist(s)?",
            tag_ids.len(),
            artist_ids.len()
        ))?
    {
        println!("Tag change cancelled");
        return Ok(());
    }

    let updated = bulk::change_tags(&ctx.client, artist_ids, tag_ids, change).await?;
    let past = match change {
        TagChange::Add => "Added tags to",
        TagChange::Remove => "Removed tags from",
    };
    println!("🏷️  {past} {updated} artists");
    Ok(())
}

pub async fn handle_search_albums(
    client: &LidarrClient,
    artist_ids: &[i64],
) -> Result<(), Box<dyn std::error::Error>> {
    let names = bulk::search_albums(client, artist_ids).await?;
    for name in &names {
        println!("  🔎 {name}");
    }
    println!("Album search started for {} artists", names.len());
    Ok(())
}

pub async fn handle_by_tag(
    client: &LidarrClient,
    label: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(artists) = bulk::artists_with_tag(client, label).await? else {
        println!("Tag '{label}' not found");
        return Ok(());
    };

    if artists.is_empty() {
        println!("No artists tagged '{label}'");
        return Ok(());
    }

    println!("Artists tagged '{label}':");
    println!("{:<8} {:<40} {:<10}", "ID", "Name", "Monitored");
    println!("{}", "-".repeat(60));
    for artist in &artists {
        let monitored = if artist.get("monitored").and_then(Value::as_bool) == Some(true) {
            "Yes"
        } else {
            "No"
        };
        println!(
            "{:<8} {:<40} {:<10}",
            id_text(artist),
            text(artist, "artistName"),
            monitored
        );
    }
    println!("\nTotal: {} artists", artists.len());
    Ok(())
}
