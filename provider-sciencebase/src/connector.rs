//! ScienceBase catalog connector
//!
//! Implements the `CatalogClient` trait over the ScienceBase REST API.

use async_trait::async_trait;
use bridge_traits::catalog::{CatalogClient, CatalogItem, NewItem};
use bridge_traits::error::Result;
use bridge_traits::http::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RetryPolicy,
};
use bridge_traits::storage::FileSystemAccess;
use core_auth::CatalogSession;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::ScienceBaseError;
use crate::types::{ItemRef, ItemsPage};

/// Catalog API base URL
pub const SCIENCEBASE_CATALOG_URL: &str = "https://www.sciencebase.gov/catalog/";

/// Results requested per page of a listing
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Ids per bulk delete request
const DELETE_CHUNK_SIZE: usize = 50;

/// Uploads can be large; everything else uses the client default
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// ScienceBase API connector
///
/// Implements `CatalogClient` for the ScienceBase catalog.
///
/// # Features
///
/// - Paged listings (`offset`/`max`) collected into one result
/// - Bulk deletes split into chunks the API accepts
/// - Multipart upload with the item JSON in the same request
/// - Bearer authentication via a shared `CatalogSession`
///
/// # Example
///
/// ```ignore
/// use provider_sciencebase::ScienceBaseConnector;
/// use bridge_traits::catalog::CatalogClient;
///
/// let connector = ScienceBaseConnector::new(http_client, session, fs);
/// let item = connector.get_item("5f0000000000000000000000").await?;
/// ```
pub struct ScienceBaseConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Supplies bearer tokens
    session: Arc<CatalogSession>,

    /// Reads local files for upload
    fs: Arc<dyn FileSystemAccess>,

    base_url: String,
    page_size: usize,
    retry_policy: RetryPolicy,
}

impl ScienceBaseConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        session: Arc<CatalogSession>,
        fs: Arc<dyn FileSystemAccess>,
    ) -> Self {
        Self {
            http_client,
            session,
            fs,
            base_url: SCIENCEBASE_CATALOG_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Point the connector at another catalog deployment (e.g. beta)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request with a bearer token.
    ///
    /// A 401 invalidates the session and the request is replayed once with
    /// a fresh token. Non-2xx answers become `ScienceBaseError`s.
    async fn send(&self, request: HttpRequest, item_id: Option<&str>) -> Result<HttpResponse> {
        let request = request.header("Accept", "application/json");

        let token = self
            .session
            .access_token()
            .await
            .map_err(ScienceBaseError::from)?;
        let mut response = self
            .http_client
            .execute_with_retry(request.clone().bearer_token(token), self.retry_policy.clone())
            .await?;

        if response.status == 401 {
            warn!(url = %request.url, "Catalog rejected token, signing in again");
            self.session.invalidate().await;
            let token = self
                .session
                .access_token()
                .await
                .map_err(ScienceBaseError::from)?;
            response = self
                .http_client
                .execute_with_retry(request.clone().bearer_token(token), self.retry_policy.clone())
                .await?;
        }

        if response.is_success() {
            debug!(status = response.status, "API request succeeded");
            return Ok(response);
        }

        warn!(status = response.status, url = %request.url, "API request failed");
        if response.status == 404 {
            if let Some(item_id) = item_id {
                return Err(ScienceBaseError::ItemNotFound {
                    item_id: item_id.to_string(),
                }
                .into());
            }
        }
        Err(ScienceBaseError::ApiError {
            status_code: response.status,
            message: String::from_utf8_lossy(&response.body).to_string(),
        }
        .into())
    }

    fn parse<T: serde::de::DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
        serde_json::from_slice(&response.body).map_err(|e| {
            ScienceBaseError::ParseError(format!("Failed to parse {}: {}", what, e)).into()
        })
    }

    /// Walk every page of an `items` query, returning the ids
    async fn collect_ids(&self, query: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut offset = 0usize;

        loop {
            let url = self.url(&format!(
                "items?{}&fields=id&format=json&max={}&offset={}",
                query, self.page_size, offset
            ));
            let response = self
                .send(HttpRequest::new(HttpMethod::Get, url), None)
                .await?;
            let page: ItemsPage<ItemRef> = Self::parse(&response, "items page")?;

            let fetched = page.items.len();
            ids.extend(page.items.into_iter().map(|item| item.id));
            offset += fetched;

            let exhausted = match page.total {
                Some(total) => offset >= total,
                None => fetched < self.page_size,
            };
            if fetched == 0 || exhausted {
                break;
            }
        }

        Ok(ids)
    }
}

/// Content type sent with an uploaded file part
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("zip") => "application/zip",
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        Some("pdf") => "application/pdf",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl CatalogClient for ScienceBaseConnector {
    #[instrument(skip(self), fields(item_id = %id))]
    async fn get_item(&self, id: &str) -> Result<CatalogItem> {
        debug!("Getting item");
        let url = self.url(&format!("item/{}?format=json", urlencoding::encode(id)));
        let response = self
            .send(HttpRequest::new(HttpMethod::Get, url), Some(id))
            .await?;
        Self::parse(&response, "item")
    }

    #[instrument(skip(self, item), fields(parent_id = %item.parent_id, title = %item.title))]
    async fn create_item(&self, item: &NewItem) -> Result<CatalogItem> {
        let request = HttpRequest::new(HttpMethod::Post, self.url("item/")).json(item)?;
        let response = self.send(request, None).await?;
        let created: CatalogItem = Self::parse(&response, "created item")?;
        info!(item_id = %created.id, "Created item");
        Ok(created)
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn update_item(&self, item: &CatalogItem) -> Result<CatalogItem> {
        let url = self.url(&format!("item/{}", urlencoding::encode(&item.id)));
        let request = HttpRequest::new(HttpMethod::Put, url).json(item)?;
        let response = self.send(request, Some(&item.id)).await?;
        debug!("Updated item");
        Self::parse(&response, "updated item")
    }

    #[instrument(skip(self), fields(item_id = %id))]
    async fn get_child_ids(&self, id: &str) -> Result<Vec<String>> {
        let ids = self
            .collect_ids(&format!("parentId={}", urlencoding::encode(id)))
            .await?;
        debug!(count = ids.len(), "Listed children");
        Ok(ids)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn delete_items(&self, ids: &[String]) -> Result<()> {
        for chunk in ids.chunks(DELETE_CHUNK_SIZE) {
            let body: Vec<ItemRef> = chunk.iter().map(ItemRef::new).collect();
            let request = HttpRequest::new(HttpMethod::Delete, self.url("items/")).json(&body)?;
            self.send(request, None).await?;
        }
        info!(count = ids.len(), "Deleted items");
        Ok(())
    }

    #[instrument(skip(self), fields(title = %title))]
    async fn find_items_by_title(&self, title: &str) -> Result<Vec<CatalogItem>> {
        let query = title_query(title);
        let url = self.url(&format!(
            "items?lq={}&fields=title,parentId&format=json&max={}",
            urlencoding::encode(&query),
            self.page_size
        ));
        let response = self.send(HttpRequest::new(HttpMethod::Get, url), None).await?;
        let page: ItemsPage<CatalogItem> = Self::parse(&response, "title search")?;
        debug!(count = page.items.len(), "Title search finished");
        Ok(page.items)
    }

    #[instrument(skip(self, item), fields(item_id = %item.id, path = %path.display()))]
    async fn upload_file(&self, item: &CatalogItem, path: &Path) -> Result<CatalogItem> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ScienceBaseError::InvalidFile(path.display().to_string()))?
            .to_string();
        let data = self.fs.read_file(path).await?;
        let item_json = serde_json::to_string(item)
            .map_err(|e| ScienceBaseError::ParseError(format!("Failed to encode item: {}", e)))?;

        let form = MultipartForm::new().text("item", item_json).file(
            "file",
            file_name.as_str(),
            guess_content_type(path),
            data,
        );
        let url = self.url(&format!(
            "file/uploadAndUpsertItem/?id={}",
            urlencoding::encode(&item.id)
        ));
        let request = HttpRequest::new(HttpMethod::Post, url)
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT);

        let response = self.send(request, Some(&item.id)).await?;
        info!(file = %file_name, "Uploaded file");
        Self::parse(&response, "upload response")
    }

    #[instrument(skip(self, item), fields(item_id = %item.id, path = %path.display()))]
    async fn replace_file(&self, path: &Path, item: &CatalogItem) -> Result<CatalogItem> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ScienceBaseError::InvalidFile(path.display().to_string()))?;

        let mut stripped = item.clone();
        stripped.files.retain(|f| f.name != file_name);
        let updated = if stripped.files.len() != item.files.len() {
            self.update_item(&stripped).await?
        } else {
            stripped
        };
        self.upload_file(&updated, path).await
    }

    #[instrument(skip(self), fields(item_id = %id))]
    async fn get_ancestor_ids(&self, id: &str) -> Result<HashSet<String>> {
        let ids = self
            .collect_ids(&format!(
                "filter={}",
                urlencoding::encode(&format!("ancestors={}", id))
            ))
            .await?;
        debug!(count = ids.len(), "Listed descendants");
        Ok(ids.into_iter().collect())
    }
}

/// Lucene phrase query on the title field
fn title_query(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
    format!("title:\"{}\"", escaped)
}
