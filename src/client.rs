use crate::gateway::{ApiRequest, RequestGateway};
use crate::iterator::{collect_pages, Page, PageRequest, DEFAULT_PAGE_SIZE};
use crate::r#trait::LidarrApi;
use crate::{ConnectionConfig, LidarrError, Result};
use async_trait::async_trait;
use http_client::HttpClient;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

/// Timeout used by the listings Lidarr is slow to compute.
pub const SLOW_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the Lidarr v1 REST API.
///
/// All calls go through one [`RequestGateway`], so they share its rate
/// limit and run one at a time.
///
/// # Examples
///
/// ```rust,no_run
/// use lidarr_api::{ConnectionConfig, LidarrApi, LidarrClient, Result};
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let config = ConnectionConfig::new("http://localhost:8686", "api-key")?;
///     let http_client = http_client::native::NativeClient::new();
///     let client = LidarrClient::new(Box::new(http_client), config);
///
///     for artist in client.search_artist("Nine Inch Nails").await? {
///         println!("{}", artist["artistName"]);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct LidarrClient {
    gateway: RequestGateway,
}

impl LidarrClient {
    pub fn new(client: Box<dyn HttpClient + Send + Sync>, config: ConnectionConfig) -> Self {
        Self {
            gateway: RequestGateway::new(client, config),
        }
    }

    /// Create a client backed by the default curl transport.
    #[cfg(feature = "curl")]
    pub fn connect(config: ConnectionConfig) -> Self {
        Self::new(Box::new(http_client::native::NativeClient::new()), config)
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let endpoint = request.endpoint().to_string();
        let body = self.gateway.execute(request).await?;
        decode(&endpoint, body)
    }

    async fn call_empty(&self, request: ApiRequest) -> Result<()> {
        self.gateway.execute(request).await.map(|_| ())
    }

    async fn command(&self, body: Value) -> Result<Value> {
        self.call(ApiRequest::post("command").json(body)).await
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: Option<Value>) -> Result<T> {
    serde_json::from_value(body.unwrap_or(Value::Null))
        .map_err(|e| LidarrError::Decode(format!("Unexpected response from {endpoint}: {e}")))
}

/// Common paging parameters. Endpoint-specific flags are added by the caller.
fn paged(endpoint: &str, page: &PageRequest) -> ApiRequest {
    ApiRequest::get(endpoint)
        .query("page", page.page)
        .query("pageSize", page.page_size)
        .query("includeArtist", page.include_artist)
        .query_opt("sortKey", page.sort_key.as_deref())
        .query_opt("sortDirection", page.sort_direction.map(|d| d.as_str()))
}

#[async_trait(?Send)]
impl LidarrApi for LidarrClient {
    async fn get_system_status(&self) -> Result<Value> {
        self.call(ApiRequest::get("system/status")).await
    }

    async fn get_disk_space(&self) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("diskspace")).await
    }

    async fn get_system_backups(&self) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("system/backup")).await
    }

    async fn start_backup(&self) -> Result<Value> {
        self.call(ApiRequest::post("system/backup").json(json!({ "type": "manual" })))
            .await
    }

    async fn restore_system(&self, backup_file: &str) -> Result<Value> {
        self.call(ApiRequest::post("system/restore").json(json!({ "file": backup_file })))
            .await
    }

    async fn get_artist(&self, artist_id: i64) -> Result<Value> {
        self.call(ApiRequest::get(format!("artist/{artist_id}")))
            .await
    }

    async fn get_all_artists(&self) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("artist")).await
    }

    async fn search_artist(&self, term: &str) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("artist/lookup").query("term", term))
            .await
    }

    async fn add_artist(&self, artist: &Value) -> Result<Value> {
        self.call(ApiRequest::post("artist").json(artist.clone()))
            .await
    }

    async fn update_artist(&self, artist_id: i64, artist: &Value) -> Result<Value> {
        self.call(ApiRequest::put(format!("artist/{artist_id}")).json(artist.clone()))
            .await
    }

    async fn update_artist_monitor(&self, artist_id: i64, monitored: bool) -> Result<Value> {
        let mut artist = self.get_artist(artist_id).await?;
        match artist.as_object_mut() {
            Some(fields) => {
                fields.insert("monitored".to_string(), Value::Bool(monitored));
            }
            None => {
                return Err(LidarrError::Decode(format!(
                    "Artist {artist_id} is not a JSON object"
                )))
            }
        }
        self.update_artist(artist_id, &artist).await
    }

    async fn get_artist_editor(&self) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("artist/editor")).await
    }

    async fn update_artists_monitor(
        &self,
        artist_ids: Vec<i64>,
        monitored: bool,
    ) -> Result<Value> {
        self.call(ApiRequest::put("artist/editor").json(json!({
            "artistIds": artist_ids,
            "monitored": monitored,
        })))
        .await
    }

    async fn get_artist_metadata(&self, artist_id: i64) -> Result<Value> {
        self.call(ApiRequest::get(format!("artistmetadata/{artist_id}")))
            .await
    }

    async fn search_artist_albums(&self, artist_id: i64) -> Result<Value> {
        self.command(json!({ "name": "ArtistSearch", "artistIds": [artist_id] }))
            .await
    }

    async fn get_albums_by_artist(&self, artist_id: i64) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("album").query("artistId", artist_id))
            .await
    }

    async fn get_album(&self, album_id: i64) -> Result<Value> {
        self.call(ApiRequest::get(format!("album/{album_id}"))).await
    }

    async fn update_album(&self, album_id: i64, album: &Value) -> Result<Value> {
        self.call(ApiRequest::put(format!("album/{album_id}")).json(album.clone()))
            .await
    }

    async fn get_album_releases(&self, album_id: i64) -> Result<Vec<Value>> {
        self.call(ApiRequest::get(format!("album/{album_id}/releases")))
            .await
    }

    async fn get_release(&self, release_id: i64) -> Result<Value> {
        self.call(ApiRequest::get(format!("release/{release_id}")))
            .await
    }

    async fn search_album(&self, album_id: i64) -> Result<Value> {
        self.command(json!({ "name": "AlbumSearch", "albumIds": [album_id] }))
            .await
    }

    async fn get_calendar(&self, start: Option<String>, end: Option<String>) -> Result<Vec<Value>> {
        self.call(
            ApiRequest::get("calendar")
                .query_opt("start", start)
                .query_opt("end", end),
        )
        .await
    }

    async fn get_quality_profiles(&self) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("qualityprofile")).await
    }

    async fn get_quality_profile(&self, profile_id: i64) -> Result<Value> {
        self.call(ApiRequest::get(format!("qualityprofile/{profile_id}")))
            .await
    }

    async fn get_metadata_profiles(&self) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("metadataprofile")).await
    }

    async fn get_metadata_profile(&self, profile_id: i64) -> Result<Value> {
        self.call(ApiRequest::get(format!("metadataprofile/{profile_id}")))
            .await
    }

    async fn get_import_lists(&self) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("importlist")).await
    }

    async fn test_import_list(&self, import_list_id: i64) -> Result<Value> {
        self.call(ApiRequest::post(format!("importlist/test/{import_list_id}")))
            .await
    }

    async fn get_wanted(&self, request: PageRequest) -> Result<Page<Value>> {
        self.call(paged("wanted/missing", &request).timeout(SLOW_ENDPOINT_TIMEOUT))
            .await
    }

    async fn get_queue(&self, request: PageRequest) -> Result<Page<Value>> {
        let mut api_request =
            paged("queue", &request).query("includeAlbum", request.include_album);
        if request.include_unknown_artist_items {
            api_request = api_request.query("includeUnknownArtistItems", true);
        }
        self.call(api_request).await
    }

    async fn get_history(&self, request: PageRequest) -> Result<Page<Value>> {
        self.call(paged("history", &request)).await
    }

    async fn get_blocklist(&self, request: PageRequest) -> Result<Page<Value>> {
        self.call(paged("blocklist", &request).timeout(SLOW_ENDPOINT_TIMEOUT))
            .await
    }

    async fn delete_queue_item(
        &self,
        queue_id: i64,
        blocklist: bool,
        remove_from_client: bool,
    ) -> Result<()> {
        self.call_empty(
            ApiRequest::delete(format!("queue/{queue_id}"))
                .query("blocklist", blocklist)
                .query("removeFromClient", remove_from_client),
        )
        .await
    }

    async fn delete_blocklist_item(&self, blocklist_id: i64) -> Result<()> {
        self.call_empty(ApiRequest::delete(format!("blocklist/{blocklist_id}")))
            .await
    }

    async fn clear_blocklist(&self) -> Result<()> {
        self.call_empty(ApiRequest::delete("blocklist")).await
    }

    async fn get_track_file(&self, track_file_id: i64) -> Result<Value> {
        self.call(ApiRequest::get(format!("trackfile/{track_file_id}")))
            .await
    }

    async fn delete_track_file(&self, track_file_id: i64) -> Result<()> {
        self.call_empty(ApiRequest::delete(format!("trackfile/{track_file_id}")))
            .await
    }

    async fn get_root_folders(&self) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("rootfolder")).await
    }

    async fn add_root_folder(&self, path: &str) -> Result<Value> {
        self.call(ApiRequest::post("rootfolder").json(json!({ "path": path })))
            .await
    }

    async fn delete_root_folder(&self, folder_id: i64) -> Result<()> {
        self.call_empty(ApiRequest::delete(format!("rootfolder/{folder_id}")))
            .await
    }

    async fn get_manual_import(&self, folder: &str) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("manualimport").query("folder", folder))
            .await
    }

    async fn execute_manual_import(&self, files: Vec<Value>) -> Result<Value> {
        self.command(json!({ "name": "ManualImport", "files": files }))
            .await
    }

    async fn get_tags(&self) -> Result<Vec<Value>> {
        self.call(ApiRequest::get("tag")).await
    }

    async fn add_tag(&self, label: &str) -> Result<Value> {
        self.call(ApiRequest::post("tag").json(json!({ "label": label })))
            .await
    }

    async fn delete_tag(&self, tag_id: i64) -> Result<()> {
        self.call_empty(ApiRequest::delete(format!("tag/{tag_id}")))
            .await
    }

    async fn get_tag_details(&self, tag_id: i64) -> Result<Value> {
        self.call(ApiRequest::get(format!("tag/detail/{tag_id}")))
            .await
    }
}

/// Every missing album, fetched [`DEFAULT_PAGE_SIZE`] at a time.
pub async fn all_wanted<C: LidarrApi + ?Sized>(client: &C) -> Result<Vec<Value>> {
    collect_pages(DEFAULT_PAGE_SIZE, move |page, page_size| {
        client.get_wanted(PageRequest::new(page, page_size))
    })
    .await
}

/// The whole download queue.
pub async fn all_queue<C: LidarrApi + ?Sized>(client: &C) -> Result<Vec<Value>> {
    collect_pages(DEFAULT_PAGE_SIZE, move |page, page_size| {
        client.get_queue(PageRequest::new(page, page_size))
    })
    .await
}

/// The whole history, newest first.
pub async fn all_history<C: LidarrApi + ?Sized>(client: &C) -> Result<Vec<Value>> {
    collect_pages(DEFAULT_PAGE_SIZE, move |page, page_size| {
        client.get_history(
            PageRequest::new(page, page_size).sorted_by("date", crate::SortDirection::Descending),
        )
    })
    .await
}

pub async fn all_blocklist<C: LidarrApi + ?Sized>(client: &C) -> Result<Vec<Value>> {
    collect_pages(DEFAULT_PAGE_SIZE, move |page, page_size| {
        client.get_blocklist(PageRequest::new(page, page_size))
    })
    .await
}
