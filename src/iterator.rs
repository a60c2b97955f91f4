use crate::{LidarrError, Result};

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;

/// Page size used when aggregating a whole listing.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// One page of a paged Lidarr listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, total_records: u64) -> Self {
        Self {
            page: 0,
            page_size: 0,
            total_records,
            records,
        }
    }

    /// Number of pages of `page_size` needed for `total_records`.
    pub fn total_pages(&self, page_size: u32) -> u32 {
        if page_size == 0 {
            return 0;
        }
        self.total_records.div_ceil(u64::from(page_size)) as u32
    }
}

/// Sort order for paged endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }
}

/// Parameters for one page request.
///
/// Each endpoint forwards only the flags it understands: `include_album`
/// and `include_unknown_artist_items` only apply to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub sort_key: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub include_artist: bool,
    pub include_album: bool,
    pub include_unknown_artist_items: bool,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            sort_key: None,
            sort_direction: None,
            include_artist: true,
            include_album: true,
            include_unknown_artist_items: false,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Self::default()
        }
    }

    pub fn sorted_by(mut self, key: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_key = Some(key.into());
        self.sort_direction = Some(direction);
        self
    }

    pub fn include_unknown_artist_items(mut self, include: bool) -> Self {
        self.include_unknown_artist_items = include;
        self
    }
}

/// Async iterator trait for paged Lidarr listings.
///
/// Implementations fetch pages lazily as items are consumed and stop after
/// the first page that comes back shorter than the requested page size.
#[allow(async_fn_in_trait)]
pub trait AsyncPaginatedIterator<T> {
    /// Fetch the next item from the iterator.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(item))` - Next item in the sequence
    /// - `Ok(None)` - No more items available
    /// - `Err(...)` - A page fetch failed
    async fn next(&mut self) -> Result<Option<T>>;

    /// Collect all remaining items into a Vec.
    ///
    /// Any failing page fetch discards what was gathered so far.
    async fn collect_all(&mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Take up to n items from the iterator.
    async fn take(&mut self, n: usize) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for _ in 0..n {
            match self.next().await? {
                Some(item) => items.push(item),
                None => break,
            }
        }
        Ok(items)
    }

    /// Number of the most recently fetched page (1-based, 0 before the first fetch).
    fn current_page(&self) -> u32;

    /// Get the total number of pages, if known.
    fn total_pages(&self) -> Option<u32> {
        None
    }
}

/// Streams the records of a paged endpoint.
///
/// `fetch` is called with `(page_number, page_size)` starting at page 1.
/// `totalRecords` is only used for [`total_pages`](AsyncPaginatedIterator::total_pages),
/// never to decide when to stop, so a final page that exactly fills
/// `page_size` costs one more (empty) fetch.
pub struct PagedIterator<T, F> {
    fetch: F,
    page_size: u32,
    current_page: u32,
    total_records: Option<u64>,
    buffer: VecDeque<T>,
    finished: bool,
}

impl<T, F, Fut> PagedIterator<T, F>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    pub fn new(page_size: u32, fetch: F) -> Self {
        Self {
            fetch,
            page_size,
            current_page: 0,
            total_records: None,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    async fn fetch_next_page(&mut self) -> Result<()> {
        let page_number = self.current_page + 1;
        log::debug!("Fetching page {page_number} (page size {})", self.page_size);

        let page = (self.fetch)(page_number, self.page_size).await?;
        self.current_page = page_number;
        self.total_records = Some(page.total_records);

        let fetched = page.records.len();
        if fetched == 0 || fetched < self.page_size as usize {
            self.finished = true;
        }
        self.buffer.extend(page.records);
        Ok(())
    }
}

impl<T, F, Fut> AsyncPaginatedIterator<T> for PagedIterator<T, F>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    async fn next(&mut self) -> Result<Option<T>> {
        if self.page_size == 0 {
            return Err(LidarrError::Config(
                "Page size must be greater than zero".to_string(),
            ));
        }

        while self.buffer.is_empty() && !self.finished {
            self.fetch_next_page().await?;
        }

        Ok(self.buffer.pop_front())
    }

    fn current_page(&self) -> u32 {
        self.current_page
    }

    fn total_pages(&self) -> Option<u32> {
        let total = self.total_records?;
        if self.page_size == 0 {
            return None;
        }
        Some(total.div_ceil(u64::from(self.page_size)) as u32)
    }
}

/// Fetch every page of a listing and return the records in server order.
///
/// Stops after the first short or empty page. Errors from `fetch` are
/// returned as-is and nothing gathered before them is kept.
///
/// ```rust
/// use lidarr_api::iterator::{collect_pages, Page};
///
/// # tokio_test::block_on(async {
/// let sizes = [100usize, 100, 37];
/// let records = collect_pages(100, |page, _size| async move {
///     let count = sizes.get(page as usize - 1).copied().unwrap_or(0);
///     Ok(Page::new(vec![page; count], 237))
/// })
/// .await
/// .unwrap();
/// assert_eq!(records.len(), 237);
/// # });
/// ```
pub async fn collect_pages<T, F, Fut>(page_size: u32, fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    PagedIterator::new(page_size, fetch).collect_all().await
}
