use async_trait::async_trait;
use catalog_engine::backend::ByteSource;
use catalog_engine::TransportError;
use tracing::debug;

/// Downloads objects over HTTP(S). Any non-2xx status is a failure.
#[derive(Debug, Clone, Default)]
pub struct HttpByteSource {
    client: reqwest::Client,
}

impl HttpByteSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ByteSource for HttpByteSource {
    async fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                locator: locator.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        debug!("fetched {} bytes from {}", bytes.len(), locator);
        Ok(bytes.to_vec())
    }
}
