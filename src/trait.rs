use crate::iterator::{Page, PageRequest};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for Lidarr API operations that can be mocked for testing.
///
/// Every method maps onto exactly one `/api/v1` call, except
/// [`update_artist_monitor`](LidarrApi::update_artist_monitor) which reads
/// the artist and writes it back. Responses are returned as loosely typed
/// JSON because Lidarr resources carry many fields the tooling never looks
/// at and that change between server versions.
///
/// # Mocking Support
///
/// When the `mock` feature is enabled, this crate provides `MockLidarrApi`
/// that implements this trait using the `mockall` library.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait(?Send)]
pub trait LidarrApi {
    // System

    /// Version, uptime and platform details of the server.
    async fn get_system_status(&self) -> Result<Value>;

    /// Free and total space for every disk Lidarr knows about.
    async fn get_disk_space(&self) -> Result<Vec<Value>>;

    /// Backups currently stored on the server.
    async fn get_system_backups(&self) -> Result<Vec<Value>>;

    /// Start a manual backup.
    async fn start_backup(&self) -> Result<Value>;

    /// Restore the server from a backup file name as listed by
    /// [`get_system_backups`](LidarrApi::get_system_backups).
    async fn restore_system(&self, backup_file: &str) -> Result<Value>;

    // Artists

    async fn get_artist(&self, artist_id: i64) -> Result<Value>;

    /// Every artist in the library, in one unpaged response.
    async fn get_all_artists(&self) -> Result<Vec<Value>>;

    /// Look up artists by name in the metadata provider.
    async fn search_artist(&self, term: &str) -> Result<Vec<Value>>;

    /// Add an artist. See [`NewArtist`](crate::types::NewArtist) for the payload.
    async fn add_artist(&self, artist: &Value) -> Result<Value>;

    /// Replace an artist resource.
    async fn update_artist(&self, artist_id: i64, artist: &Value) -> Result<Value>;

    /// Flip the monitored flag on one artist, keeping every other field.
    async fn update_artist_monitor(&self, artist_id: i64, monitored: bool) -> Result<Value>;

    async fn get_artist_editor(&self) -> Result<Vec<Value>>;

    /// Set the monitored flag on many artists in one call.
    async fn update_artists_monitor(&self, artist_ids: Vec<i64>, monitored: bool)
        -> Result<Value>;

    async fn get_artist_metadata(&self, artist_id: i64) -> Result<Value>;

    /// Queue a search for every album of an artist.
    async fn search_artist_albums(&self, artist_id: i64) -> Result<Value>;

    // Albums

    async fn get_albums_by_artist(&self, artist_id: i64) -> Result<Vec<Value>>;

    async fn get_album(&self, album_id: i64) -> Result<Value>;

    async fn update_album(&self, album_id: i64, album: &Value) -> Result<Value>;

    async fn get_album_releases(&self, album_id: i64) -> Result<Vec<Value>>;

    async fn get_release(&self, release_id: i64) -> Result<Value>;

    /// Queue a search for one album.
    async fn search_album(&self, album_id: i64) -> Result<Value>;

    /// Albums releasing between `start` and `end` (ISO dates, both optional).
    async fn get_calendar(&self, start: Option<String>, end: Option<String>)
        -> Result<Vec<Value>>;

    // Profiles

    async fn get_quality_profiles(&self) -> Result<Vec<Value>>;

    async fn get_quality_profile(&self, profile_id: i64) -> Result<Value>;

    async fn get_metadata_profiles(&self) -> Result<Vec<Value>>;

    async fn get_metadata_profile(&self, profile_id: i64) -> Result<Value>;

    // Import lists

    async fn get_import_lists(&self) -> Result<Vec<Value>>;

    async fn test_import_list(&self, import_list_id: i64) -> Result<Value>;

    // Paged listings

    /// One page of missing albums.
    async fn get_wanted(&self, request: PageRequest) -> Result<Page<Value>>;

    /// One page of the download queue.
    async fn get_queue(&self, request: PageRequest) -> Result<Page<Value>>;

    /// One page of download and import history.
    async fn get_history(&self, request: PageRequest) -> Result<Page<Value>>;

    /// One page of blocklisted releases.
    async fn get_blocklist(&self, request: PageRequest) -> Result<Page<Value>>;

    // Queue and blocklist maintenance

    async fn delete_queue_item(
        &self,
        queue_id: i64,
        blocklist: bool,
        remove_from_client: bool,
    ) -> Result<()>;

    async fn delete_blocklist_item(&self, blocklist_id: i64) -> Result<()>;

    /// Remove every blocklist entry.
    async fn clear_blocklist(&self) -> Result<()>;

    // Files

    async fn get_track_file(&self, track_file_id: i64) -> Result<Value>;

    async fn delete_track_file(&self, track_file_id: i64) -> Result<()>;

    async fn get_root_folders(&self) -> Result<Vec<Value>>;

    async fn add_root_folder(&self, path: &str) -> Result<Value>;

    async fn delete_root_folder(&self, folder_id: i64) -> Result<()>;

    /// Candidate files for a manual import from `folder`.
    async fn get_manual_import(&self, folder: &str) -> Result<Vec<Value>>;

    /// Import the given files as returned by
    /// [`get_manual_import`](LidarrApi::get_manual_import).
    async fn execute_manual_import(&self, files: Vec<Value>) -> Result<Value>;

    // Tags

    async fn get_tags(&self) -> Result<Vec<Value>>;

    async fn add_tag(&self, label: &str) -> Result<Value>;

    async fn delete_tag(&self, tag_id: i64) -> Result<()>;

    /// Ids of everything carrying the tag.
    async fn get_tag_details(&self, tag_id: i64) -> Result<Value>;
}
