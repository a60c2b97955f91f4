use crate::r#trait::LidarrApi;
use crate::{LidarrError, Result};
use serde_json::Value;
use std::collections::BTreeSet;

/// Whether a bulk tag operation adds or removes tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagChange {
    Add,
    Remove,
}

/// Result of a bulk monitor change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOutcome {
    pub requested: usize,
    /// Count reported by the server, when it reports one
    pub updated: Option<u64>,
}

fn require_ids(artist_ids: &[i64]) -> Result<()> {
    if artist_ids.is_empty() {
        return Err(LidarrError::InvalidData("No artist ids given".to_string()));
    }
    Ok(())
}

/// Monitor or unmonitor many artists with a single editor call.
pub async fn set_monitored<C: LidarrApi + ?Sized>(
    client: &C,
    artist_ids: &[i64],
    monitored: bool,
) -> Result<MonitorOutcome> {
    require_ids(artist_ids)?;
    let result = client
        .update_artists_monitor(artist_ids.to_vec(), monitored)
        .await?;
    Ok(MonitorOutcome {
        requested: artist_ids.len(),
        updated: result.get("updated").and_then(Value::as_u64),
    })
}

/// Add or remove tag ids on every artist.
///
/// All artists are read before any is written, so a failed read leaves the
/// library untouched. There is no bulk tag endpoint; each artist is written
/// back on its own.
pub async fn change_tags<C: LidarrApi + ?Sized>(
    client: &C,
    artist_ids: &[i64],
    tag_ids: &[i64],
    change: TagChange,
) -> Result<usize> {
    require_ids(artist_ids)?;

    let mut updated = Vec::with_capacity(artist_ids.len());
    for &artist_id in artist_ids {
        let mut artist = client.get_artist(artist_id).await?;
        let mut tags: BTreeSet<i64> = artist
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default();
        match change {
            TagChange::Add => tags.extend(tag_ids),
            TagChange::Remove => tags.retain(|tag| !tag_ids.contains(tag)),
        }

        let fields = artist.as_object_mut().ok_or_else(|| {
            LidarrError::Decode(format!("Artist {artist_id} is not a JSON object"))
        })?;
        fields.insert(
            "tags".to_string(),
            Value::Array(tags.into_iter().map(Value::from).collect()),
        );
        updated.push((artist_id, artist));
    }

    for (artist_id, artist) in &updated {
        client.update_artist(*artist_id, artist).await?;
        log::debug!("Updated tags of artist {artist_id}");
    }
    Ok(updated.len())
}

/// Queue an album search for each artist and return their names.
pub async fn search_albums<C: LidarrApi + ?Sized>(
    client: &C,
    artist_ids: &[i64],
) -> Result<Vec<String>> {
    require_ids(artist_ids)?;
    let mut names = Vec::with_capacity(artist_ids.len());
    for &artist_id in artist_ids {
        client.search_artist_albums(artist_id).await?;
        let artist = client.get_artist(artist_id).await?;
        let name = artist
            .get("artistName")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();
        log::info!("Triggered album search for {name} (ID: {artist_id})");
        names.push(name);
    }
    Ok(names)
}

/// Artists carrying the tag with `label` (case-insensitive), or `None`
/// when no such tag exists.
pub async fn artists_with_tag<C: LidarrApi + ?Sized>(
    client: &C,
    label: &str,
) -> Result<Option<Vec<Value>>> {
    let tags = client.get_tags().await?;
    let wanted = label.to_lowercase();
    let Some(tag_id) = tags
        .iter()
        .find(|tag| {
            tag.get("label")
                .and_then(Value::as_str)
                .is_some_and(|l| l.to_lowercase() == wanted)
        })
        .and_then(|tag| tag.get("id").and_then(Value::as_i64))
    else {
        return Ok(None);
    };

    let artists = client.get_all_artists().await?;
    Ok(Some(
        artists
            .into_iter()
            .filter(|artist| {
                artist
                    .get("tags")
                    .and_then(Value::as_array)
                    .is_some_and(|tags| tags.iter().any(|t| t.as_i64() == Some(tag_id)))
            })
            .collect(),
    ))
}
