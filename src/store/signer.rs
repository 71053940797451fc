use async_trait::async_trait;
use catalog_engine::backend::UrlSigner;
use catalog_engine::TransportError;
use chrono::{DateTime, Duration, Utc};
use ring::hmac;
use url::Url;

use super::object_key;
use crate::{AppError, Result};

/// Issues HMAC-SHA256 signed URLs below a public base URL.
///
/// `{base}/{bucket}/{key}?expires={unix}&signature={hex}` where the signature
/// covers `"{bucket}/{key}\n{expires}"`.
pub struct HmacUrlSigner {
    base: Url,
    key: hmac::Key,
    ttl: Duration,
}

impl HmacUrlSigner {
    pub fn new(base_url: &str, secret: &[u8], ttl: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid base_url {}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(AppError::Config(format!("base_url {} cannot be a base", base_url)));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
            ttl,
        })
    }

    fn payload(object: &str, expires: i64) -> String {
        format!("{}\n{}", object, expires)
    }

    pub fn sign_at(&self, locator: &str, now: DateTime<Utc>) -> std::result::Result<String, TransportError> {
        let object = object_key(locator);
        if object.is_empty() {
            return Err(TransportError::NotFound(locator.to_string()));
        }

        let expires = (now + self.ttl).timestamp();
        let tag = hmac::sign(&self.key, Self::payload(object, expires).as_bytes());

        // Segments are appended, never joined, so a key can't replace the base.
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::Request(format!("cannot address {}", locator)))?
            .pop_if_empty()
            .extend(object.split('/'));
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &hex::encode(tag.as_ref()));
        Ok(url.into())
    }

    /// Checks that `signed_url` was issued for `locator` and has not expired.
    pub fn verify(&self, locator: &str, signed_url: &str, now: DateTime<Utc>) -> bool {
        let Ok(url) = Url::parse(signed_url) else {
            return false;
        };

        let mut expires = None;
        let mut signature = None;
        for (name, value) in url.query_pairs() {
            match &*name {
                "expires" => expires = value.parse::<i64>().ok(),
                "signature" => signature = hex::decode(&*value).ok(),
                _ => {}
            }
        }

        match (expires, signature) {
            (Some(expires), Some(signature)) if expires > now.timestamp() => {
                let payload = Self::payload(object_key(locator), expires);
                hmac::verify(&self.key, payload.as_bytes(), &signature).is_ok()
            }
            _ => false,
        }
    }
}

#[async_trait]
impl UrlSigner for HmacUrlSigner {
    async fn sign(&self, locator: &str) -> std::result::Result<String, TransportError> {
        self.sign_at(locator, Utc::now())
    }
}
