use crate::settings::ArtistDefaults;
use crate::{LidarrError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Which albums of a newly added artist Lidarr should monitor.
///
/// Persisted in the settings file as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AlbumMonitor {
    /// Every existing and future album
    #[default]
    All = 1,
    /// Only albums released after the artist is added
    Future = 2,
    /// Nothing
    None = 3,
}

impl AlbumMonitor {
    pub const ALL: [AlbumMonitor; 3] = [AlbumMonitor::All, AlbumMonitor::Future, AlbumMonitor::None];

    /// Value of the `monitor` field Lidarr expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumMonitor::All => "all",
            AlbumMonitor::Future => "future",
            AlbumMonitor::None => "none",
        }
    }

    /// Whether the option on its own would leave the artist monitored.
    pub fn implies_monitored(&self) -> bool {
        !matches!(self, AlbumMonitor::None)
    }
}

impl TryFrom<u8> for AlbumMonitor {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            1 => Ok(AlbumMonitor::All),
            2 => Ok(AlbumMonitor::Future),
            3 => Ok(AlbumMonitor::None),
            other => Err(format!("Unknown album monitor option {other}, expected 1-3")),
        }
    }
}

impl From<AlbumMonitor> for u8 {
    fn from(option: AlbumMonitor) -> Self {
        option as u8
    }
}

impl fmt::Display for AlbumMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlbumMonitor::All => "All Albums",
            AlbumMonitor::Future => "Future Albums",
            AlbumMonitor::None => "None",
        };
        write!(f, "{label}")
    }
}

/// Builder for the body of `POST /artist`.
pub struct NewArtist;

impl NewArtist {
    /// Fields copied from the lookup result when present.
    const OPTIONAL_FIELDS: [&'static str; 3] = ["overview", "disambiguation", "artistType"];

    /// Turn an `artist/lookup` result into an add-artist payload.
    ///
    /// The explicit `monitored` flag from `defaults` is sent as-is, even
    /// with [`AlbumMonitor::None`]; the option only controls which albums
    /// are picked up and whether missing ones are searched for.
    pub fn from_lookup(lookup: &Value, defaults: &ArtistDefaults) -> Result<Value> {
        let artist_name = required_str(lookup, "artistName")?;
        let foreign_artist_id = required_str(lookup, "foreignArtistId")?;
        let monitor = defaults.album_monitor_option.as_str();

        let mut payload = json!({
            "artistName": artist_name,
            "foreignArtistId": foreign_artist_id,
            "qualityProfileId": defaults.quality_profile_id,
            "metadataProfileId": defaults.metadata_profile_id,
            "rootFolderPath": defaults.root_folder_path,
            "monitored": defaults.monitored,
            "albumFolder": true,
            "monitor": monitor,
            "tags": defaults.tag_ids,
            "addOptions": {
                "monitor": monitor,
                "searchForMissingAlbums": defaults.monitored,
            },
        });

        if let (Some(fields), Some(source)) = (payload.as_object_mut(), lookup.as_object()) {
            copy_present(fields, source, &Self::OPTIONAL_FIELDS);
        }
        Ok(payload)
    }
}

fn required_str<'a>(value: &'a Value, field: &str) -> Result<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| LidarrError::InvalidData(format!("Artist lookup result has no '{field}'")))
}

fn copy_present(target: &mut Map<String, Value>, source: &Map<String, Value>, fields: &[&str]) {
    for field in fields {
        if let Some(value) = source.get(*field) {
            target.insert(field.to_string(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults(option: AlbumMonitor, monitored: bool) -> ArtistDefaults {
        ArtistDefaults {
            root_folder_path: "/music".to_string(),
            quality_profile_id: 1,
            metadata_profile_id: 2,
            monitored,
            album_monitor_option: option,
            tag_ids: vec![4, 9],
        }
    }

    #[test]
    fn test_payload_from_lookup() {
        let lookup = json!({
            "artistName": "Boards of Canada",
            "foreignArtistId": "69158f97-4c07-4c4e-baf8-4e4ab1ed666e",
            "overview": "Scottish electronic duo",
            "artistType": "Group",
            "ratings": {"votes": 10}
        });

        let payload = NewArtist::from_lookup(&lookup, &defaults(AlbumMonitor::Future, true)).unwrap();

        assert_eq!(payload["artistName"], "Boards of Canada");
        assert_eq!(payload["qualityProfileId"], 1);
        assert_eq!(payload["metadataProfileId"], 2);
        assert_eq!(payload["rootFolderPath"], "/music");
        assert_eq!(payload["albumFolder"], true);
        assert_eq!(payload["monitor"], "future");
        assert_eq!(payload["tags"], json!([4, 9]));
        assert_eq!(payload["addOptions"]["monitor"], "future");
        assert_eq!(payload["addOptions"]["searchForMissingAlbums"], true);
        assert_eq!(payload["overview"], "Scottish electronic duo");
        assert_eq!(payload["artistType"], "Group");
        assert!(payload.get("disambiguation").is_none());
        assert!(payload.get("ratings").is_none());
    }

    #[test]
    fn test_explicit_monitored_flag_wins() {
        let lookup = json!({"artistName": "Autechre", "foreignArtistId": "abc"});
        let payload = NewArtist::from_lookup(&lookup, &defaults(AlbumMonitor::None, true)).unwrap();
        assert_eq!(payload["monitor"], "none");
        assert_eq!(payload["monitored"], true);
        assert!(!AlbumMonitor::None.implies_monitored());
    }

    #[test]
    fn test_lookup_without_foreign_id_is_rejected() {
        let lookup = json!({"artistName": "Unknown"});
        let err = NewArtist::from_lookup(&lookup, &defaults(AlbumMonitor::All, true)).unwrap_err();
        assert!(matches!(err, LidarrError::InvalidData(_)));
    }

    #[test]
    fn test_album_monitor_codes() {
        assert_eq!(serde_json::to_value(AlbumMonitor::Future).unwrap(), json!(2));
        let option: AlbumMonitor = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(option, AlbumMonitor::None);
        assert!(serde_json::from_value::<AlbumMonitor>(json!(4)).is_err());
    }
}
