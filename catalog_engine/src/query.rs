use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{ByteSource, UrlSigner};
use crate::cache::UrlResolutionCache;
use crate::catalog::CatalogDecoder;
use crate::filter::{CalendarZone, FilterSpec};
use crate::{AppError, FileRecord, Result, SignedFileRecord, ViewRecord};

pub const DEFAULT_CATALOG_URI: &str = "/photosphere_database_cloud.pb";
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Storage locator of the serialized catalog.
    pub catalog_uri: String,
    pub page_size: usize,
    pub zone: CalendarZone,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            catalog_uri: DEFAULT_CATALOG_URI.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            zone: CalendarZone::default(),
        }
    }
}

pub type Catalog = Arc<[FileRecord]>;

/// Filters, sorts and pages `files`, newest first.
pub fn select<'a>(
    files: &'a [FileRecord],
    filter: &FilterSpec,
    zone: CalendarZone,
    page: usize,
    page_size: usize,
) -> Vec<&'a FileRecord> {
    let compiled = filter.compile(zone);
    let mut matching: Vec<&FileRecord> = files.iter().filter(|f| compiled.matches(f)).collect();
    matching.sort_by(|a, b| b.created_at_timestamp.cmp(&a.created_at_timestamp));

    let start = page.saturating_mul(page_size);
    matching.into_iter().skip(start).take(page_size).collect()
}

/// Session state behind every catalog query.
///
/// Owns the decoded catalog and the signed URL cache; both live until
/// [`QueryEngine::clear`].
pub struct QueryEngine {
    source: Arc<dyn ByteSource>,
    urls: UrlResolutionCache,
    catalog: Mutex<Option<Catalog>>,
    config: QueryConfig,
}

impl QueryEngine {
    pub fn new(source: Arc<dyn ByteSource>, signer: Arc<dyn UrlSigner>, config: QueryConfig) -> Self {
        Self {
            source,
            urls: UrlResolutionCache::new(signer),
            catalog: Mutex::new(None),
            config,
        }
    }

    pub fn urls(&self) -> &UrlResolutionCache {
        &self.urls
    }

    /// Returns the decoded catalog, fetching it on first use.
    ///
    /// The lock is held across the fetch so concurrent first callers share one
    /// download.
    pub async fn catalog(&self) -> Result<Catalog> {
        let mut slot = self.catalog.lock().await;
        if let Some(catalog) = slot.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let locator = self.urls.resolve(&self.config.catalog_uri).await?;
        let bytes = self.source.fetch_bytes(&locator).await?;
        let catalog: Catalog = CatalogDecoder::decode(&bytes)?.into();
        info!(
            "loaded catalog {} with {} records",
            self.config.catalog_uri,
            catalog.len()
        );

        *slot = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    pub async fn list(&self, page: usize, filter: &FilterSpec) -> Result<Vec<ViewRecord>> {
        self.list_page(page, self.config.page_size, filter).await
    }

    /// One page of matching records with their thumbnails signed.
    ///
    /// A thumbnail that cannot be signed leaves its row without a URL instead
    /// of failing the page.
    pub async fn list_page(
        &self,
        page: usize,
        page_size: usize,
        filter: &FilterSpec,
    ) -> Result<Vec<ViewRecord>> {
        let catalog = self.catalog().await?;
        let selected = select(&catalog, filter, self.config.zone, page, page_size);
        debug!("page {} holds {} records", page, selected.len());

        let rows = selected.into_iter().map(|file| async move {
            let signed_thumbnail_url = match self.urls.resolve(&file.thumbnail_uri).await {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!("failed to sign thumbnail {}: {}", file.thumbnail_uri, err);
                    None
                }
            };
            ViewRecord {
                hash: file.hash.clone(),
                file_type: file.file_type,
                source_uri: file.source_uri.clone(),
                signed_thumbnail_url,
            }
        });

        Ok(join_all(rows).await)
    }

    /// First catalog record carrying `hash`, with source and thumbnail signed.
    pub async fn find_by_hash(&self, hash: &str) -> Result<SignedFileRecord> {
        let catalog = self.catalog().await?;
        let record = catalog
            .iter()
            .find(|f| f.hash == hash)
            .ok_or_else(|| AppError::NotFound(hash.to_string()))?;

        let signed_source_url = self.urls.resolve(&record.source_uri).await?;
        let signed_thumbnail_url = self.urls.resolve(&record.thumbnail_uri).await?;

        Ok(SignedFileRecord {
            record: record.clone(),
            signed_source_url,
            signed_thumbnail_url,
        })
    }

    /// Drops the decoded catalog and every signed URL.
    pub async fn clear(&self) {
        *self.catalog.lock().await = None;
        self.urls.clear().await;
        debug!("catalog session cleared");
    }
}
