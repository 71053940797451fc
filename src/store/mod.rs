//! Object store collaborators: catalog byte sources and URL signers.

pub mod http;
pub mod local;
pub mod signer;

use std::sync::Arc;

use catalog_engine::backend::{ByteSource, UrlSigner};
use chrono::Duration;

use crate::config::{StoreConfig, StoreKind};
use crate::{AppError, Result};

pub use http::HttpByteSource;
pub use local::LocalObjectStore;
pub use signer::HmacUrlSigner;

/// Strips the `scheme://` of a storage URI, or the leading `/` of a bucket
/// relative path, leaving `bucket/key` or `key`.
pub(crate) fn object_key(locator: &str) -> &str {
    match locator.split_once("://") {
        Some((_, rest)) => rest,
        None => locator.trim_start_matches('/'),
    }
}

/// Builds the byte source and signer described by `config`.
pub fn connect(config: &StoreConfig) -> Result<(Arc<dyn ByteSource>, Arc<dyn UrlSigner>)> {
    match config.kind {
        StoreKind::Local => {
            let root = config.root.clone().unwrap_or_else(|| ".".into());
            let store = Arc::new(LocalObjectStore::new(root));
            let source: Arc<dyn ByteSource> = store.clone();
            let signer: Arc<dyn UrlSigner> = store;
            Ok((source, signer))
        }
        StoreKind::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .ok_or_else(|| AppError::Config("http store requires base_url".to_string()))?;
            let key = config
                .signing_key
                .as_deref()
                .ok_or_else(|| AppError::Config("http store requires signing_key".to_string()))?;
            let key = hex::decode(key)
                .map_err(|e| AppError::Config(format!("signing_key is not hex: {}", e)))?;
            let ttl = i64::try_from(config.url_ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .ok_or_else(|| AppError::Config("url_ttl_secs is out of range".to_string()))?;

            let source: Arc<dyn ByteSource> = Arc::new(HttpByteSource::new());
            let signer: Arc<dyn UrlSigner> = Arc::new(HmacUrlSigner::new(base_url, &key, ttl)?);
            Ok((source, signer))
        }
    }
}
