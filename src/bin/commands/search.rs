use super::utils::{prompt_error, text, Context};
use inquire::{Confirm, MultiSelect, Select, Text};
use lidarr_api::{
    retry_with_backoff, AlbumMonitor, ArtistDefaults, LidarrApi, LidarrClient, LidarrError,
    NewArtist, RetryConfig,
};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;

const DIVIDER_WIDTH: usize = 80;
const OVERVIEW_WIDTH: usize = 70;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Look an artist up, show which results are already in the library and
/// add one of them.
///
/// Returns the process exit code: 1 when the lookup finds nothing.
pub async fn handle_search_command(
    ctx: &mut Context,
    artist_name: &str,
    select: Option<usize>,
    use_defaults: bool,
    save_defaults: bool,
    force_search: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    println!("\n🔍 Searching for artist: {artist_name}");
    println!("{}", "-".repeat(DIVIDER_WIDTH));

    let results = ctx.client.search_artist(artist_name).await?;
    if results.is_empty() {
        println!("No artists found");
        return Ok(1);
    }

    let existing = existing_foreign_ids(ctx).await;

    println!("\nFound {} results:\n", results.len());
    for (idx, artist) in results.iter().enumerate() {
        print_result(idx + 1, artist, is_added(artist, &existing));
    }

    let index = match select {
        Some(number) if (1..=results.len()).contains(&number) => number - 1,
        Some(number) => {
            return Err(LidarrError::InvalidData(format!(
                "--select {number} is out of range, expected 1-{}",
                results.len()
            ))
            .into());
        }
        None => {
            let labels: Vec<String> = results
                .iter()
                .enumerate()
                .map(|(idx, artist)| result_label(idx + 1, artist))
                .collect();
            Select::new("Select an artist to add:", labels)
                .raw_prompt()
                .map_err(prompt_error)?
                .index
        }
    };

    let selected = &results[index];
    let selected_name = text(selected, "artistName");
    println!("\n✅ Selected artist: {selected_name}");

    if is_added(selected, &existing) {
        println!("ℹ️  {selected_name} is already in your library");
        return Ok(0);
    }

    let saved = if use_defaults {
        ctx.store.artist_defaults().cloned()
    } else {
        None
    };
    let defaults = match saved {
        Some(defaults) => {
            print_defaults(&defaults);
            defaults
        }
        None => {
            if use_defaults {
                println!("⚠️  No saved defaults found, asking instead");
            }
            prompt_defaults(&ctx.client).await?
        }
    };

    if save_defaults {
        ctx.store.save_artist_defaults(defaults.clone())?;
        println!(
            "💾 Saved selections as defaults in {}",
            ctx.store.path().display()
        );
    }

    let payload = NewArtist::from_lookup(selected, &defaults)?;
    let added = ctx.client.add_artist(&payload).await?;
    println!(
        "\n🎉 Added {} (ID: {})",
        text(&added, "artistName"),
        added.get("id").and_then(Value::as_i64).unwrap_or_default()
    );

    if force_search {
        if let Some(artist_id) = added.get("id").and_then(Value::as_i64) {
            ctx.client.search_artist_albums(artist_id).await?;
            println!("🔎 Album search started for {selected_name}");
        }
    }

    Ok(0)
}

/// Foreign ids of the artists already in the library.
///
/// The library listing can be slow on big collections, so it is retried on
/// its own. If it still fails the search goes on without the check.
async fn existing_foreign_ids(ctx: &Context) -> HashSet<String> {
    println!("📚 Fetching existing artists...");
    let client = &ctx.client;
    let fetched = retry_with_backoff(
        RetryConfig::default().with_max_attempts(ctx.retries),
        "Fetch existing artists",
        || client.get_all_artists(),
        |attempt, wait, _| {
            println!(
                "\nAttempt {attempt} failed, retrying in {:.1} seconds...",
                wait.as_secs_f64()
            )
        },
    )
    .await;

    match fetched {
        Ok(retry) => {
            log::debug!("Found {} existing artists", retry.result.len());
            retry
                .result
                .iter()
                .filter_map(|artist| artist.get("foreignArtistId").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        }
        Err(e) => {
            eprintln!("\n⚠️  Error fetching existing artists: {e}");
            eprintln!("Continuing without existing artist check...");
            HashSet::new()
        }
    }
}

fn is_added(artist: &Value, existing: &HashSet<String>) -> bool {
    artist
        .get("foreignArtistId")
        .and_then(Value::as_str)
        .is_some_and(|id| existing.contains(id))
}

fn print_result(number: usize, artist: &Value, added: bool) {
    let status = if added {
        "\x1b[33m[Already added]\x1b[0m"
    } else {
        "\x1b[32m[Not added]\x1b[0m"
    };
    println!("{number}. {status} {}", text(artist, "artistName"));
    if let Some(note) = non_empty(artist, "disambiguation") {
        println!("Note: {note}");
    }
    if let Some(overview) = non_empty(artist, "overview") {
        println!("\nOverview:");
        for line in overview_lines(overview) {
            println!("{line}");
        }
    }
    println!("\n{}\n", "-".repeat(DIVIDER_WIDTH));
}

fn overview_lines(overview: &str) -> Vec<Cow<'_, str>> {
    textwrap::wrap(overview, OVERVIEW_WIDTH)
}

fn result_label(number: usize, artist: &Value) -> String {
    match non_empty(artist, "disambiguation") {
        Some(note) => format!("{number}. {} ({note})", text(artist, "artistName")),
        None => format!("{number}. {}", text(artist, "artistName")),
    }
}

fn non_empty<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn print_defaults(defaults: &ArtistDefaults) {
    println!("\n📋 Using saved defaults:");
    println!("   Root folder: {}", defaults.root_folder_path);
    println!("   Quality profile ID: {}", defaults.quality_profile_id);
    println!("   Metadata profile ID: {}", defaults.metadata_profile_id);
    println!(
        "   Monitored: {}",
        if defaults.monitored { "Yes" } else { "No" }
    );
    println!("   Album monitoring: {}", defaults.album_monitor_option);
    if !defaults.tag_ids.is_empty() {
        let ids: Vec<String> = defaults.tag_ids.iter().map(i64::to_string).collect();
        println!("   Tag IDs: {}", ids.join(", "));
    }
}

/// Pick one entry of a server listing by its display label.
fn pick<'a>(
    message: &str,
    items: &'a [Value],
    label: impl Fn(&Value) -> String,
) -> Result<&'a Value, LidarrError> {
    let labels: Vec<String> = items.iter().map(label).collect();
    let chosen = Select::new(message, labels)
        .raw_prompt()
        .map_err(prompt_error)?;
    Ok(&items[chosen.index])
}

fn id_of(value: &Value) -> Result<i64, LidarrError> {
    value
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| LidarrError::InvalidData(format!("Server entry without an id: {value}")))
}

/// Ask for every setting of a new artist.
async fn prompt_defaults(client: &LidarrClient) -> Result<ArtistDefaults, LidarrError> {
    let root_folders = client.get_root_folders().await?;
    if root_folders.is_empty() {
        return Err(LidarrError::Config(
            "No root folders configured in Lidarr".to_string(),
        ));
    }
    let root_folder = pick("Root folder:", &root_folders, |folder| {
        let free = folder.get("freeSpace").and_then(Value::as_f64).unwrap_or(0.0);
        format!("{} ({:.2} GB free)", text(folder, "path"), free / GIB)
    })?;

    let quality_profiles = client.get_quality_profiles().await?;
    if quality_profiles.is_empty() {
        return Err(LidarrError::Config("No quality profiles found in Lidarr".to_string()));
    }
    let quality_profile = pick("Quality profile:", &quality_profiles, |profile| {
        text(profile, "name").to_string()
    })?;

    let metadata_profiles = client.get_metadata_profiles().await?;
    if metadata_profiles.is_empty() {
        return Err(LidarrError::Config(
            "No metadata profiles found in Lidarr".to_string(),
        ));
    }
    let metadata_profile = pick("Metadata profile:", &metadata_profiles, |profile| {
        text(profile, "name").to_string()
    })?;

    let monitored = Confirm::new("Monitor this artist?")
        .with_default(true)
        .prompt()
        .map_err(prompt_error)?;

    let album_monitor_option =
        Select::new("Which albums should be monitored?", AlbumMonitor::ALL.to_vec())
            .prompt()
            .map_err(prompt_error)?;

    let tag_ids = prompt_tags(client).await?;

    Ok(ArtistDefaults {
        root_folder_path: text(root_folder, "path").to_string(),
        quality_profile_id: id_of(quality_profile)?,
        metadata_profile_id: id_of(metadata_profile)?,
        monitored,
        album_monitor_option,
        tag_ids,
    })
}

/// Choose existing tags and create new ones.
async fn prompt_tags(client: &LidarrClient) -> Result<Vec<i64>, LidarrError> {
    let tags = client.get_tags().await?;
    let mut tag_ids = Vec::new();

    if !tags.is_empty() {
        let labels: Vec<String> = tags.iter().map(|tag| text(tag, "label").to_string()).collect();
        let chosen = MultiSelect::new("Tags:", labels)
            .raw_prompt()
            .map_err(prompt_error)?;
        for option in chosen {
            tag_ids.push(id_of(&tags[option.index])?);
        }
    }

    let new_labels = Text::new("New tags (comma-separated, empty for none):")
        .prompt()
        .map_err(prompt_error)?;
    for label in new_labels.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        match client.add_tag(label).await {
            Ok(tag) => {
                println!("🏷️  Created tag '{label}'");
                tag_ids.push(id_of(&tag)?);
            }
            Err(e) => eprintln!("❌ Error creating tag '{label}': {e}"),
        }
    }

    Ok(tag_ids)
}
