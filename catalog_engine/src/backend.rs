use async_trait::async_trait;

use crate::TransportError;

/// Fetches raw object bytes, e.g. the serialized catalog.
#[async_trait]
pub trait ByteSource: Send + Sync {
    async fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, TransportError>;
}

/// Issues a time-limited URL for a storage object.
///
/// Only [`crate::cache::UrlResolutionCache`] calls this directly.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    async fn sign(&self, locator: &str) -> Result<String, TransportError>;
}
