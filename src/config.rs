use std::path::{Path, PathBuf};

use catalog_engine::filter::CalendarZone;
use catalog_engine::query::{QueryConfig, DEFAULT_CATALOG_URI, DEFAULT_PAGE_SIZE};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::{AppError, Result};

pub const DEFAULT_URL_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Local,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Directory backing a local store.
    pub root: Option<PathBuf>,
    /// Public endpoint that serves signed objects of an http store.
    pub base_url: Option<String>,
    /// Hex-encoded HMAC key for an http store.
    pub signing_key: Option<String>,
    pub url_ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Local,
            root: None,
            base_url: None,
            signing_key: None,
            url_ttl_secs: DEFAULT_URL_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotosphereConfig {
    pub catalog_uri: String,
    pub page_size: usize,
    /// Offset used for calendar days. Host local time when unset.
    pub utc_offset_minutes: Option<i32>,
    pub store: StoreConfig,
}

impl Default for PhotosphereConfig {
    fn default() -> Self {
        Self {
            catalog_uri: DEFAULT_CATALOG_URI.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            utc_offset_minutes: None,
            store: StoreConfig::default(),
        }
    }
}

impl PhotosphereConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("photosphere").join("config.json"))
    }

    /// Reads `path` if given, else the default location if it exists, else
    /// falls back to defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if fs::try_exists(&path).await.unwrap_or(false) => path,
                _ => {
                    debug!("no config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_json(&content)?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| AppError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.catalog_uri.is_empty() {
            return Err(AppError::Config("catalog_uri must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(AppError::Config("page_size must be positive".to_string()));
        }
        self.zone()?;
        Ok(())
    }

    pub fn zone(&self) -> Result<CalendarZone> {
        match self.utc_offset_minutes {
            None => Ok(CalendarZone::Local),
            Some(minutes) => minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .map(CalendarZone::Fixed)
                .ok_or_else(|| AppError::Config(format!("invalid utc offset: {} minutes", minutes))),
        }
    }

    pub fn query_config(&self) -> Result<QueryConfig> {
        Ok(QueryConfig {
            catalog_uri: self.catalog_uri.clone(),
            page_size: self.page_size,
            zone: self.zone()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PhotosphereConfig::from_json("{}").unwrap();
        assert_eq!(config, PhotosphereConfig::default());
        assert_eq!(config.zone().unwrap(), CalendarZone::Local);
    }

    #[test]
    fn test_parses_http_store() {
        let config = PhotosphereConfig::from_json(
            r#"{
                "page_size": 25,
                "utc_offset_minutes": 60,
                "store": {"kind": "http", "base_url": "https://cdn.example", "signing_key": "00ff"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.page_size, 25);
        assert_eq!(config.store.kind, StoreKind::Http);
        assert_eq!(config.store.url_ttl_secs, DEFAULT_URL_TTL_SECS);
        let query = config.query_config().unwrap();
        assert_eq!(query.zone, CalendarZone::Fixed(FixedOffset::east_opt(3600).unwrap()));
        assert_eq!(query.catalog_uri, DEFAULT_CATALOG_URI);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            PhotosphereConfig::from_json(r#"{"page_size": 0}"#),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            PhotosphereConfig::from_json(r#"{"utc_offset_minutes": 100000}"#),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            PhotosphereConfig::from_json("not json"),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"catalog_uri": "/catalog.pb"}"#).unwrap();

        let config = PhotosphereConfig::load(Some(&path)).await.unwrap();
        assert_eq!(config.catalog_uri, "/catalog.pb");

        let missing = PhotosphereConfig::load(Some(&dir.path().join("nope.json"))).await;
        assert!(matches!(missing, Err(AppError::Config(_))));
    }
}
