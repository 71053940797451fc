use thiserror::Error;

/// Failures while turning the catalog byte stream into records.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("malformed varint at offset {offset}: more than 64 bits of magnitude")]
    MalformedVarint { offset: usize },
    #[error("truncated message at offset {offset}: expected {expected} bytes, {available} available")]
    TruncatedMessage {
        offset: usize,
        expected: u64,
        available: usize,
    },
    #[error("invalid record at offset {offset}: {source}")]
    InvalidRecord {
        offset: usize,
        #[source]
        source: prost::DecodeError,
    },
}

/// Failures reported by the byte source or the URL signer.
///
/// Cloneable so a single resolver outcome can be handed to every caller
/// waiting on the same key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request for {locator} failed with status {status}")]
    Status { locator: String, status: u16 },
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("request error: {0}")]
    Request(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeoError {
    #[error("invalid character {0:?} in geohash")]
    InvalidGeohash(char),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("catalog decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("file with hash {0} not found")]
    NotFound(String),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
