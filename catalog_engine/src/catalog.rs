//! Length-prefixed protobuf catalog stream.
//!
//! The stream is a plain concatenation of `varint(len) ++ message` pairs with
//! no outer framing. Field numbers are fixed by the producer and must not move.

use prost::Message;
use tracing::{debug, warn};

use crate::{DecodeError, FileRecord, FileType};

/// Longest varint that still fits in 64 bits.
pub const MAX_VARINT_LEN: usize = 10;

#[derive(Clone, PartialEq, Message)]
pub struct PhotosphereFile {
    #[prost(string, tag = "2")]
    pub source_bucket_uri: String,
    #[prost(enumeration = "FileType", tag = "4")]
    pub file_type: i32,
    #[prost(int64, tag = "6")]
    pub created_at_timestamp: i64,
    #[prost(string, tag = "9")]
    pub geohash: String,
    #[prost(string, tag = "10")]
    pub hash: String,
}

impl From<&FileRecord> for PhotosphereFile {
    fn from(record: &FileRecord) -> Self {
        Self {
            source_bucket_uri: record.source_uri.clone(),
            file_type: record.file_type as i32,
            created_at_timestamp: record.created_at_timestamp,
            geohash: record.geohash.clone(),
            hash: record.hash.clone(),
        }
    }
}

/// Reads an unsigned LEB128 varint at `offset`.
///
/// Returns the value and the number of bytes consumed.
pub fn read_varint(buf: &[u8], offset: usize) -> Result<(u64, usize), DecodeError> {
    let mut value = 0u64;

    for i in 0..MAX_VARINT_LEN {
        let Some(&byte) = buf.get(offset + i) else {
            return Err(DecodeError::TruncatedMessage {
                offset,
                expected: (i + 1) as u64,
                available: i,
            });
        };

        // The tenth byte may only carry bit 63.
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(DecodeError::MalformedVarint { offset });
        }

        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(DecodeError::MalformedVarint { offset })
}

/// Returns the `scheme://bucket` prefix of a storage URI.
pub fn bucket_prefix(uri: &str) -> Option<&str> {
    let (scheme, rest) = uri.split_once("://")?;
    let valid_scheme = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return None;
    }

    let bucket_len = rest.find('/').unwrap_or(rest.len());
    if bucket_len == 0 {
        return None;
    }

    Some(&uri[..scheme.len() + "://".len() + bucket_len])
}

/// Derives where the producer stored the thumbnail of `source_uri`.
///
/// Empty when the URI has no usable file name, extension or bucket.
pub fn thumbnail_uri(source_uri: &str, hash: &str) -> String {
    let file_name = match source_uri.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => return String::new(),
    };
    if file_name.rsplit('.').next().map_or(true, str::is_empty) {
        return String::new();
    }

    match bucket_prefix(source_uri) {
        Some(bucket) => format!("{bucket}/thumbnails/{file_name}.{hash}.thumbnail.jpg"),
        None => String::new(),
    }
}

impl From<PhotosphereFile> for FileRecord {
    fn from(message: PhotosphereFile) -> Self {
        let file_type = FileType::try_from(message.file_type).unwrap_or_else(|_| {
            warn!("unknown file type {} for {}", message.file_type, message.source_bucket_uri);
            FileType::File
        });

        Self {
            thumbnail_uri: thumbnail_uri(&message.source_bucket_uri, &message.hash),
            source_uri: message.source_bucket_uri,
            file_type,
            created_at_timestamp: message.created_at_timestamp,
            geohash: message.geohash,
            hash: message.hash,
        }
    }
}

pub struct CatalogDecoder;

impl CatalogDecoder {
    /// Decodes the whole buffer. Any malformed or trailing partial record fails
    /// the entire decode.
    pub fn decode(bytes: &[u8]) -> Result<Vec<FileRecord>, DecodeError> {
        let mut records = Vec::new();
        let mut offset = 0;

        while offset < bytes.len() {
            let (len, read) = read_varint(bytes, offset)?;
            let start = offset + read;
            let available = bytes.len() - start;
            if len > available as u64 {
                return Err(DecodeError::TruncatedMessage {
                    offset: start,
                    expected: len,
                    available,
                });
            }

            let end = start + len as usize;
            let message = PhotosphereFile::decode(&bytes[start..end])
                .map_err(|source| DecodeError::InvalidRecord { offset: start, source })?;
            records.push(FileRecord::from(message));
            offset = end;
        }

        debug!("decoded {} catalog records from {} bytes", records.len(), bytes.len());
        Ok(records)
    }
}

/// Serializes records in the producer's framing.
pub fn encode_catalog<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> Vec<u8> {
    let mut buf = Vec::new();
    for record in records {
        buf.extend(PhotosphereFile::from(record).encode_length_delimited_to_vec());
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(uri: &str, hash: &str, ts: i64) -> FileRecord {
        FileRecord {
            source_uri: uri.to_string(),
            thumbnail_uri: thumbnail_uri(uri, hash),
            file_type: FileType::Image,
            created_at_timestamp: ts,
            geohash: "u0ned0ebs".to_string(),
            hash: hash.to_string(),
        }
    }

    proptest! {
        #[test]
        fn varint_round_trip(value in 0u64..=i64::MAX as u64) {
            let mut buf = Vec::new();
            prost::encoding::encode_varint(value, &mut buf);
            prop_assert_eq!(read_varint(&buf, 0).unwrap(), (value, buf.len()));
        }
    }

    #[test]
    fn varint_reads_at_offset() {
        let buf = [0xff, 0xac, 0x02, 0x00];
        assert_eq!(read_varint(&buf, 1).unwrap(), (300, 2));
    }

    #[test]
    fn endless_continuation_is_malformed() {
        let buf = [0xff; 11];
        assert_eq!(read_varint(&buf, 0), Err(DecodeError::MalformedVarint { offset: 0 }));
    }

    #[test]
    fn tenth_byte_overflow_is_malformed() {
        let mut buf = vec![0xff; 9];
        buf.push(0x02);
        assert_eq!(read_varint(&buf, 0), Err(DecodeError::MalformedVarint { offset: 0 }));
        buf[9] = 0x01;
        assert_eq!(read_varint(&buf, 0).unwrap(), (u64::MAX, 10));
    }

    #[test]
    fn derives_thumbnail_uri() {
        assert_eq!(
            thumbnail_uri("gs://photos/2024/07/IMG_0001.JPG", "abc"),
            "gs://photos/thumbnails/IMG_0001.JPG.abc.thumbnail.jpg"
        );
    }

    #[test]
    fn thumbnail_uri_is_empty_when_unobtainable() {
        assert_eq!(thumbnail_uri("", "abc"), "");
        assert_eq!(thumbnail_uri("gs://photos/dir/", "abc"), "");
        assert_eq!(thumbnail_uri("gs://photos/dir/file.", "abc"), "");
        assert_eq!(thumbnail_uri("/local/file.jpg", "abc"), "");
        assert_eq!(thumbnail_uri(":///file.jpg", "abc"), "");
    }

    #[test]
    fn bucket_prefix_stops_at_first_slash() {
        assert_eq!(bucket_prefix("gs://photos/a/b.jpg"), Some("gs://photos"));
        assert_eq!(bucket_prefix("s3://media"), Some("s3://media"));
        assert_eq!(bucket_prefix("gs:///a.jpg"), None);
        assert_eq!(bucket_prefix("no-scheme/a.jpg"), None);
    }

    #[test]
    fn decodes_encoded_catalog_in_order() {
        let records = vec![
            record("gs://photos/a.jpg", "h1", 30),
            record("gs://photos/b.mp4", "h2", 20),
            record("gs://photos/c.txt", "h1", 10),
        ];
        let bytes = encode_catalog(&records);

        let first = CatalogDecoder::decode(&bytes).unwrap();
        let second = CatalogDecoder::decode(&bytes).unwrap();
        assert_eq!(first, records);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_buffer_is_empty_catalog() {
        assert!(CatalogDecoder::decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn unset_fields_take_defaults() {
        let message = PhotosphereFile {
            source_bucket_uri: "gs://photos/x.jpg".to_string(),
            ..Default::default()
        };
        let bytes = message.encode_length_delimited_to_vec();

        let decoded = CatalogDecoder::decode(&bytes).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].file_type, FileType::File);
        assert_eq!(decoded[0].created_at_timestamp, 0);
        assert_eq!(decoded[0].geohash, "");
        assert_eq!(decoded[0].hash, "");
        assert_eq!(decoded[0].thumbnail_uri, "gs://photos/thumbnails/x.jpg..thumbnail.jpg");
    }

    #[test]
    fn unknown_file_type_falls_back_to_file() {
        let message = PhotosphereFile {
            source_bucket_uri: "gs://photos/x.jpg".to_string(),
            file_type: 7,
            ..Default::default()
        };
        let decoded = CatalogDecoder::decode(&message.encode_length_delimited_to_vec()).unwrap();
        assert_eq!(decoded[0].file_type, FileType::File);
    }

    #[test]
    fn truncated_trailing_record_fails_whole_decode() {
        let mut bytes = encode_catalog(&[record("gs://photos/a.jpg", "h1", 1)]);
        let full = bytes.len();
        bytes.extend(encode_catalog(&[record("gs://photos/b.jpg", "h2", 2)]));
        bytes.truncate(bytes.len() - 3);

        match CatalogDecoder::decode(&bytes) {
            Err(DecodeError::TruncatedMessage { offset, .. }) => assert_eq!(offset, full + 1),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn length_past_end_is_truncated() {
        let bytes = [0x05, 0x12, 0x01];
        assert_eq!(
            CatalogDecoder::decode(&bytes),
            Err(DecodeError::TruncatedMessage { offset: 1, expected: 5, available: 2 })
        );
    }

    #[test]
    fn garbage_message_is_invalid_record() {
        // Field 2 declared as a 5-byte string inside a 2-byte message.
        let bytes = [0x02, 0x12, 0x05];
        assert!(matches!(
            CatalogDecoder::decode(&bytes),
            Err(DecodeError::InvalidRecord { offset: 1, .. })
        ));
    }
}
