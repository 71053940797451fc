use serde::{Deserialize, Serialize};

/// Kind of media a catalog entry points at. Discriminants match the wire enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, prost::Enumeration,
)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum FileType {
    File = 0,
    Image = 1,
    Video = 2,
}

impl std::str::FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(FileType::File),
            "image" => Ok(FileType::Image),
            "video" => Ok(FileType::Video),
            other => Err(format!("unknown file type: {other}")),
        }
    }
}

/// One decoded catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub source_uri: String,
    pub thumbnail_uri: String,
    pub file_type: FileType,
    pub created_at_timestamp: i64,
    pub geohash: String,
    /// Content fingerprint. Several records may share one.
    pub hash: String,
}

/// A page row handed to presentation layers.
///
/// `signed_thumbnail_url` is `None` when the thumbnail could not be signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRecord {
    pub hash: String,
    pub file_type: FileType,
    pub source_uri: String,
    pub signed_thumbnail_url: Option<String>,
}

impl ViewRecord {
    pub fn is_thumbnail_available(&self) -> bool {
        self.signed_thumbnail_url.is_some()
    }
}

/// A record resolved with both of its signed URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedFileRecord {
    #[serde(flatten)]
    pub record: FileRecord,
    pub signed_source_url: String,
    pub signed_thumbnail_url: String,
}
