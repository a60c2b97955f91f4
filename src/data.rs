//! # Data import and export
//!
//! Library snapshots in JSON or CSV, configuration exports, and imports of
//! artists and tags from earlier exports. Functions here never touch the
//! file system themselves: exports return data or write to any
//! [`Write`], imports take already-parsed JSON.

use crate::client::all_wanted;
use crate::r#trait::LidarrApi;
use crate::{LidarrError, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::io::Write;

/// Artist fields kept in a JSON export.
const ARTIST_EXPORT_FIELDS: [&str; 15] = [
    "foreignArtistId",
    "artistName",
    "sortName",
    "disambiguation",
    "overview",
    "artistType",
    "status",
    "ended",
    "genres",
    "tags",
    "monitored",
    "qualityProfileId",
    "metadataProfileId",
    "path",
    "rootFolderPath",
];

const ALBUM_EXPORT_FIELDS: [&str; 6] = [
    "title",
    "releaseDate",
    "monitored",
    "albumType",
    "disambiguation",
    "foreignAlbumId",
];

/// Column order of the artist CSV export.
pub const ARTIST_CSV_COLUMNS: [&str; 13] = [
    "foreignArtistId",
    "artistName",
    "sortName",
    "disambiguation",
    "artistType",
    "status",
    "ended",
    "genres",
    "monitored",
    "qualityProfileId",
    "metadataProfileId",
    "path",
    "tags",
];

/// Column order of the wanted-album CSV export.
pub const WANTED_CSV_COLUMNS: [&str; 6] = [
    "artistName",
    "albumTitle",
    "releaseDate",
    "albumType",
    "monitored",
    "foreignAlbumId",
];

/// Fields carried over from an import record into the add-artist payload.
const IMPORT_OPTIONAL_FIELDS: [&str; 6] = [
    "sortName",
    "disambiguation",
    "overview",
    "artistType",
    "genres",
    "tags",
];

/// Outcome of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub dry_run: bool,
    /// Names added, or that would have been added in a dry run
    pub added: Vec<String>,
    /// Name and reason for every skipped entry
    pub skipped: Vec<(String, String)>,
    /// Name and error for every entry the server rejected
    pub failed: Vec<(String, String)>,
}

/// Snapshot of server-side configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigurationExport {
    pub export_timestamp: Option<String>,
    pub quality_profiles: Vec<Value>,
    pub metadata_profiles: Vec<Value>,
    pub tags: Vec<Value>,
    pub root_folders: Vec<Value>,
    pub import_lists: Vec<Value>,
    /// Sections that could not be exported
    #[serde(skip)]
    pub warnings: Vec<String>,
}

/// All artists with the curated export fields, optionally with their albums.
///
/// A failed album lookup leaves that artist with an empty album list.
pub async fn export_artists<C: LidarrApi + ?Sized>(
    client: &C,
    include_albums: bool,
) -> Result<Vec<Value>> {
    let artists = client.get_all_artists().await?;
    log::info!("Exporting {} artists", artists.len());

    let mut exported = Vec::with_capacity(artists.len());
    for artist in &artists {
        let mut record = pick(artist, &ARTIST_EXPORT_FIELDS);
        for (field, empty) in [
            ("disambiguation", json!("")),
            ("overview", json!("")),
            ("genres", json!([])),
            ("tags", json!([])),
        ] {
            if record.get(field).map_or(true, Value::is_null) {
                record.insert(field.to_string(), empty);
            }
        }

        if include_albums {
            let albums = match artist.get("id").and_then(Value::as_i64) {
                Some(id) => match client.get_albums_by_artist(id).await {
                    Ok(albums) => albums
                        .iter()
                        .map(|album| Value::Object(pick(album, &ALBUM_EXPORT_FIELDS)))
                        .collect(),
                    Err(e) => {
                        log::warn!("Failed to get albums for {}: {e}", display_name(artist));
                        Vec::new()
                    }
                },
                None => Vec::new(),
            };
            record.insert("albums".to_string(), Value::Array(albums));
        }

        exported.push(Value::Object(record));
    }
    Ok(exported)
}

/// Write raw artist resources as CSV in [`ARTIST_CSV_COLUMNS`] order.
///
/// Genre and tag lists are joined with `", "`. Returns the number of rows.
pub fn write_artists_csv<W: Write>(artists: &[Value], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(ARTIST_CSV_COLUMNS)?;
    for artist in artists {
        let row: Vec<String> = ARTIST_CSV_COLUMNS
            .iter()
            .map(|column| match *column {
                "genres" | "tags" => join_list(artist.get(*column)),
                _ => cell(artist.get(*column)),
            })
            .collect();
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;
    Ok(artists.len())
}

/// Every wanted album, across all pages.
pub async fn export_wanted<C: LidarrApi + ?Sized>(client: &C) -> Result<Vec<Value>> {
    let wanted = all_wanted(client).await?;
    log::info!("Fetched {} wanted albums", wanted.len());
    Ok(wanted)
}

/// Write wanted-album records as CSV. Nothing at all is written for an
/// empty list, not even the header.
pub fn write_wanted_csv<W: Write>(albums: &[Value], writer: W) -> Result<usize> {
    if albums.is_empty() {
        return Ok(0);
    }
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(WANTED_CSV_COLUMNS)?;
    for album in albums {
        let artist_name = album
            .get("artist")
            .and_then(|artist| artist.get("artistName"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        csv_writer.write_record([
            artist_name.to_string(),
            cell(album.get("title")),
            cell(album.get("releaseDate")),
            cell(album.get("albumType")),
            cell(album.get("monitored")),
            cell(album.get("foreignAlbumId")),
        ])?;
    }
    csv_writer.flush()?;
    Ok(albums.len())
}

/// Pretty-printed JSON, as used for every JSON export.
pub fn write_json<W: Write, T: Serialize + ?Sized>(value: &T, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| LidarrError::InvalidData(format!("Failed to write JSON: {e}")))?;
    writeln!(writer)?;
    Ok(())
}

/// Add the artists listed in an artist export that are not in the library yet.
///
/// Entries without a `foreignArtistId` or already present are skipped.
/// Profile and root folder fall back to the first ones on the server. With
/// `dry_run` nothing is sent.
pub async fn import_artists<C: LidarrApi + ?Sized>(
    client: &C,
    artists: &Value,
    dry_run: bool,
) -> Result<ImportSummary> {
    let entries = artists.as_array().ok_or_else(|| {
        LidarrError::InvalidData("Artist import must be a JSON list of artists".to_string())
    })?;

    let existing: HashSet<String> = client
        .get_all_artists()
        .await?
        .iter()
        .filter_map(|artist| artist.get("foreignArtistId").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    let quality_profiles = client.get_quality_profiles().await?;
    let metadata_profiles = client.get_metadata_profiles().await?;
    let root_folders = client.get_root_folders().await?;

    let default_quality = quality_profiles
        .first()
        .and_then(|p| p.get("id").cloned())
        .ok_or_else(|| {
            LidarrError::InvalidData(
                "No quality profiles found. Please create at least one quality profile."
                    .to_string(),
            )
        })?;
    let default_root = root_folders
        .first()
        .and_then(|f| f.get("path").cloned())
        .ok_or_else(|| {
            LidarrError::InvalidData(
                "No root folders found. Please create at least one root folder.".to_string(),
            )
        })?;
    let default_metadata = metadata_profiles
        .first()
        .and_then(|p| p.get("id").cloned())
        .unwrap_or(json!(1));

    let mut summary = ImportSummary {
        dry_run,
        ..ImportSummary::default()
    };
    let mut seen = existing;

    for entry in entries {
        let name = display_name(entry);
        let Some(foreign_id) = entry.get("foreignArtistId").and_then(Value::as_str) else {
            log::info!("Skipping {name}: no foreignArtistId");
            summary.skipped.push((name, "no foreignArtistId".to_string()));
            continue;
        };
        if !seen.insert(foreign_id.to_string()) {
            log::info!("Skipping {name}: already exists");
            summary.skipped.push((name, "already exists".to_string()));
            continue;
        }

        let mut payload = Map::new();
        payload.insert("foreignArtistId".to_string(), json!(foreign_id));
        payload.insert("artistName".to_string(), json!(name));
        payload.insert(
            "monitored".to_string(),
            entry.get("monitored").cloned().unwrap_or(json!(true)),
        );
        for (field, default) in [
            ("qualityProfileId", &default_quality),
            ("metadataProfileId", &default_metadata),
            ("rootFolderPath", &default_root),
        ] {
            let value = entry
                .get(field)
                .filter(|v| !v.is_null())
                .unwrap_or(default);
            payload.insert(field.to_string(), value.clone());
        }
        payload.insert(
            "addOptions".to_string(),
            json!({ "searchForMissingAlbums": true }),
        );
        for field in IMPORT_OPTIONAL_FIELDS {
            if let Some(value) = entry.get(field) {
                payload.insert(field.to_string(), value.clone());
            }
        }

        if dry_run {
            log::info!("Would add: {name} (ID: {foreign_id})");
            summary.added.push(name);
            continue;
        }

        match client.add_artist(&Value::Object(payload)).await {
            Ok(_) => {
                log::info!("Added: {name}");
                summary.added.push(name);
            }
            Err(e) => {
                log::error!("Error adding {name}: {e}");
                summary.failed.push((name, e.to_string()));
            }
        }
    }

    Ok(summary)
}

/// Profiles, tags, root folders and import lists. A section that fails to
/// load is left empty and noted in `warnings`.
pub async fn export_configuration<C: LidarrApi + ?Sized>(client: &C) -> Result<ConfigurationExport> {
    let status = client.get_system_status().await?;
    let mut export = ConfigurationExport {
        export_timestamp: status
            .get("startTime")
            .and_then(Value::as_str)
            .map(str::to_string),
        ..ConfigurationExport::default()
    };

    let warnings = &mut export.warnings;
    export.quality_profiles = section(
        "quality profiles",
        client.get_quality_profiles().await,
        warnings,
    );
    export.metadata_profiles = section(
        "metadata profiles",
        client.get_metadata_profiles().await,
        warnings,
    );
    export.tags = section("tags", client.get_tags().await, warnings);
    export.root_folders = section("root folders", client.get_root_folders().await, warnings);
    export.import_lists = section("import lists", client.get_import_lists().await, warnings);

    Ok(export)
}

/// Create the tags of a configuration export that the server lacks.
/// Labels are compared case-insensitively.
pub async fn import_tags<C: LidarrApi + ?Sized>(
    client: &C,
    configuration: &Value,
    dry_run: bool,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        dry_run,
        ..ImportSummary::default()
    };
    let Some(tags) = configuration.get("tags").and_then(Value::as_array) else {
        return Ok(summary);
    };
    if tags.is_empty() {
        return Ok(summary);
    }

    let mut existing: HashSet<String> = client
        .get_tags()
        .await?
        .iter()
        .filter_map(|tag| tag.get("label").and_then(Value::as_str))
        .map(str::to_lowercase)
        .collect();

    for tag in tags {
        let label = tag.get("label").and_then(Value::as_str).unwrap_or_default();
        if label.is_empty() {
            continue;
        }
        if !existing.insert(label.to_lowercase()) {
            summary
                .skipped
                .push((label.to_string(), "already exists".to_string()));
            continue;
        }

        if dry_run {
            summary.added.push(label.to_string());
            continue;
        }
        match client.add_tag(label).await {
            Ok(_) => {
                log::info!("Created tag: {label}");
                summary.added.push(label.to_string());
            }
            Err(e) => {
                log::error!("Error creating tag '{label}': {e}");
                summary.failed.push((label.to_string(), e.to_string()));
            }
        }
    }
    Ok(summary)
}

fn section(label: &str, result: Result<Vec<Value>>, warnings: &mut Vec<String>) -> Vec<Value> {
    match result {
        Ok(items) => {
            log::info!("Exported {} {label}", items.len());
            items
        }
        Err(e) => {
            log::warn!("Failed to export {label}: {e}");
            warnings.push(format!("Failed to export {label}: {e}"));
            Vec::new()
        }
    }
}

fn pick(source: &Value, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .map(|field| {
            (
                field.to_string(),
                source.get(*field).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}

fn display_name(artist: &Value) -> String {
    artist
        .get("artistName")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string()
}

/// CSV cell for a scalar JSON value; missing and null become empty.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn join_list(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| cell(Some(item)))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterator::Page;
    use crate::r#trait::MockLidarrApi;
    use crate::TransportFailure;

    fn rejected() -> LidarrError {
        LidarrError::Transport {
            url: "http://localhost:8686/api/v1/artist".to_string(),
            failure: TransportFailure::Status {
                status: 400,
                attempts: 1,
                body: "already been added".to_string(),
            },
        }
    }

    fn library_mock() -> MockLidarrApi {
        let mut mock = MockLidarrApi::new();
        mock.expect_get_all_artists().returning(|| {
            Ok(vec![json!({
                "id": 1,
                "artistName": "Massive Attack",
                "foreignArtistId": "10adbe5e",
                "genres": ["trip hop", "electronic"],
                "tags": [2, 5],
                "monitored": true,
                "qualityProfileId": 1,
                "ratings": {"votes": 3}
            })])
        });
        mock.expect_get_quality_profiles()
            .returning(|| Ok(vec![json!({"id": 4, "name": "Lossless"})]));
        mock.expect_get_metadata_profiles()
            .returning(|| Ok(vec![json!({"id": 7, "name": "Standard"})]));
        mock.expect_get_root_folders()
            .returning(|| Ok(vec![json!({"id": 1, "path": "/music"})]));
        mock
    }

    #[tokio::test]
    async fn test_export_artists_keeps_curated_fields() {
        let mut mock = library_mock();
        mock.expect_get_albums_by_artist()
            .withf(|id| *id == 1)
            .returning(|_| Ok(vec![json!({"title": "Mezzanine", "releaseDate": "1998-04-20", "id": 9})]));

        let exported = export_artists(&mock, true).await.unwrap();

        assert_eq!(exported.len(), 1);
        let artist = &exported[0];
        assert_eq!(artist["artistName"], "Massive Attack");
        assert_eq!(artist["disambiguation"], "");
        assert!(artist.get("ratings").is_none());
        assert!(artist.get("id").is_none());
        assert_eq!(artist["albums"][0]["title"], "Mezzanine");
        assert!(artist["albums"][0].get("id").is_none());
    }

    #[test]
    fn test_artist_csv_joins_lists() {
        let artists = vec![json!({
            "artistName": "Massive Attack",
            "foreignArtistId": "10adbe5e",
            "genres": ["trip hop", "electronic"],
            "tags": [2, 5],
            "monitored": true
        })];
        let mut out = Vec::new();
        let rows = write_artists_csv(&artists, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(rows, 1);
        assert_eq!(lines.next().unwrap(), ARTIST_CSV_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "10adbe5e,Massive Attack,,,,,,\"trip hop, electronic\",true,,,,\"2, 5\""
        );
    }

    #[test]
    fn test_wanted_csv() {
        let mut out = Vec::new();
        assert_eq!(write_wanted_csv(&[], &mut out).unwrap(), 0);
        assert!(out.is_empty());

        let albums = vec![
            json!({"title": "Protection", "artist": {"artistName": "Massive Attack"}, "monitored": true}),
            json!({"title": "Orphan", "releaseDate": "2001-01-01"}),
        ];
        write_wanted_csv(&albums, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "Massive Attack,Protection,,,true,");
        assert_eq!(lines[2], "Unknown,Orphan,2001-01-01,,,");
    }

    #[tokio::test]
    async fn test_import_artists_dry_run_skips_known_and_incomplete() {
        let mut mock = library_mock();
        mock.expect_add_artist().never();

        let input = json!([
            {"artistName": "Massive Attack", "foreignArtistId": "10adbe5e"},
            {"artistName": "Portishead", "foreignArtistId": "8f6bd1e4"},
            {"artistName": "Nameless"},
            {"artistName": "Portishead again", "foreignArtistId": "8f6bd1e4"}
        ]);
        let summary = import_artists(&mock, &input, true).await.unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.added, vec!["Portishead"]);
        assert_eq!(summary.skipped.len(), 3);
        assert!(summary.failed.is_empty());
    }

    #[tokio::test]
    async fn test_import_artists_fills_defaults_and_records_failures() {
        let mut mock = library_mock();
        let mut sequence = mockall::Sequence::new();
        mock.expect_add_artist()
            .times(1)
            .in_sequence(&mut sequence)
            .withf(|payload| {
                payload["qualityProfileId"] == 4
                    && payload["metadataProfileId"] == 7
                    && payload["rootFolderPath"] == "/music"
                    && payload["monitored"] == false
                    && payload["addOptions"]["searchForMissingAlbums"] == true
                    && payload["genres"] == json!(["trip hop"])
            })
            .returning(|payload| Ok(payload.clone()));
        mock.expect_add_artist()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Err(rejected()));

        let input = json!([
            {"artistName": "Tricky", "foreignArtistId": "a1", "monitored": false, "genres": ["trip hop"]},
            {"artistName": "Morcheeba", "foreignArtistId": "b2"}
        ]);
        let summary = import_artists(&mock, &input, false).await.unwrap();

        assert_eq!(summary.added, vec!["Tricky"]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "Morcheeba");
    }

    #[tokio::test]
    async fn test_import_artists_requires_list() {
        let mock = MockLidarrApi::new();
        let err = import_artists(&mock, &json!({"artists": []}), true)
            .await
            .unwrap_err();
        assert!(matches!(err, LidarrError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_export_configuration_tolerates_failed_section() {
        let mut mock = library_mock();
        mock.expect_get_system_status()
            .returning(|| Ok(json!({"startTime": "2024-05-01T08:00:00Z"})));
        mock.expect_get_tags()
            .returning(|| Ok(vec![json!({"id": 1, "label": "jazz"})]));
        mock.expect_get_import_lists().returning(|| Err(rejected()));

        let export = export_configuration(&mock).await.unwrap();

        assert_eq!(export.export_timestamp.as_deref(), Some("2024-05-01T08:00:00Z"));
        assert_eq!(export.quality_profiles.len(), 1);
        assert_eq!(export.tags.len(), 1);
        assert!(export.import_lists.is_empty());
        assert_eq!(export.warnings.len(), 1);

        let json = serde_json::to_value(&export).unwrap();
        assert!(json.get("warnings").is_none());
        assert_eq!(json["root_folders"][0]["path"], "/music");
    }

    #[tokio::test]
    async fn test_import_tags_is_case_insensitive() {
        let mut mock = MockLidarrApi::new();
        mock.expect_get_tags()
            .returning(|| Ok(vec![json!({"id": 1, "label": "Jazz"})]));
        mock.expect_add_tag()
            .times(1)
            .withf(|label| label == "ambient")
            .returning(|label| Ok(json!({"id": 2, "label": label})));

        let configuration = json!({
            "tags": [{"label": "jazz"}, {"label": "ambient"}, {"label": ""}, {"label": "AMBIENT"}]
        });
        let summary = import_tags(&mock, &configuration, false).await.unwrap();

        assert_eq!(summary.added, vec!["ambient"]);
        assert_eq!(summary.skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_export_wanted_collects_all_pages() {
        let mut mock = MockLidarrApi::new();
        mock.expect_get_wanted().times(2).returning(|request| {
            let count = if request.page == 1 { 100 } else { 5 };
            Ok(Page::new(vec![json!({"title": "x"}); count], 105))
        });

        assert_eq!(export_wanted(&mock).await.unwrap().len(), 105);
    }
}
