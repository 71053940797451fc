use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::debug;

use crate::backend::UrlSigner;
use crate::TransportError;

type PendingUrl = Shared<BoxFuture<'static, Result<String, TransportError>>>;

enum Slot {
    Ready(String),
    Pending { generation: u64, future: PendingUrl },
}

#[derive(Default)]
struct CacheState {
    slots: HashMap<String, Slot>,
    generation: u64,
}

/// Storage URI to signed URL map with one signer call per key.
///
/// Concurrent misses on the same key share a single in-flight call. Failures
/// are never cached.
pub struct UrlResolutionCache {
    signer: Arc<dyn UrlSigner>,
    state: Mutex<CacheState>,
}

impl UrlResolutionCache {
    pub fn new(signer: Arc<dyn UrlSigner>) -> Self {
        Self {
            signer,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub async fn resolve(&self, uri: &str) -> Result<String, TransportError> {
        let (generation, future) = {
            let mut state = self.state.lock().await;
            match state.slots.get(uri) {
                Some(Slot::Ready(url)) => {
                    debug!("signed url cache hit for {}", uri);
                    return Ok(url.clone());
                }
                Some(Slot::Pending { generation, future }) => {
                    debug!("joining in-flight signing of {}", uri);
                    (*generation, future.clone())
                }
                None => {
                    debug!("signed url cache miss for {}", uri);
                    state.generation += 1;
                    let generation = state.generation;
                    let future = self.sign(uri);
                    state.slots.insert(
                        uri.to_string(),
                        Slot::Pending {
                            generation,
                            future: future.clone(),
                        },
                    );
                    (generation, future)
                }
            }
        };

        let outcome = future.await;

        let mut state = self.state.lock().await;
        // A clear() or a newer attempt may have replaced our slot meanwhile.
        let still_ours = matches!(
            state.slots.get(uri),
            Some(Slot::Pending { generation: g, .. }) if *g == generation
        );
        if still_ours {
            match &outcome {
                Ok(url) => {
                    state.slots.insert(uri.to_string(), Slot::Ready(url.clone()));
                }
                Err(_) => {
                    state.slots.remove(uri);
                }
            }
        }

        outcome
    }

    fn sign(&self, uri: &str) -> PendingUrl {
        let signer = Arc::clone(&self.signer);
        let uri = uri.to_string();
        async move {
            let url = signer.sign(&uri).await?;
            if url.is_empty() {
                return Err(TransportError::Request(format!("empty signed URL for {uri}")));
            }
            Ok(url)
        }
        .boxed()
        .shared()
    }

    /// Whether a resolved URL is stored for `uri`.
    pub async fn contains(&self, uri: &str) -> bool {
        let state = self.state.lock().await;
        matches!(state.slots.get(uri), Some(Slot::Ready(_)))
    }

    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.slots.clear();
    }
}
