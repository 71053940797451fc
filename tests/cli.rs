#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use assert_cmd::Command;
    use catalog_engine::catalog::{encode_catalog, thumbnail_uri};
    use photosphere::{FileRecord, FileType};
    use predicates::prelude::*;
    use serde_json::Value;
    use tempfile::TempDir;

    // 2025-02-01T00:00:00Z
    const FEB_01: i64 = 1_738_368_000;
    const DAY: i64 = 86_400;

    fn record(name: &str, hash: &str, ts: i64, file_type: FileType) -> FileRecord {
        let source_uri = format!("gs://photos/2025/{name}");
        FileRecord {
            thumbnail_uri: thumbnail_uri(&source_uri, hash),
            source_uri,
            file_type,
            created_at_timestamp: ts,
            geohash: String::new(),
            hash: hash.to_string(),
        }
    }

    fn write_object(root: &Path, key: &str, data: &[u8]) {
        let path = root.join(key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    /// Local store with three entries; the video has no thumbnail on disk.
    fn create_test_store() -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();
        let records = vec![
            record("beach.jpg", "H1", FEB_01 + 100, FileType::Image),
            record("sunset.jpg", "H1", FEB_01 + DAY, FileType::Image),
            record("party.mp4", "H2", FEB_01 + 2 * DAY, FileType::Video),
        ];

        write_object(root, "photosphere_database_cloud.pb", &encode_catalog(&records));
        for name in ["beach.jpg", "sunset.jpg", "party.mp4"] {
            write_object(root, &format!("photos/2025/{name}"), b"media");
        }
        write_object(root, "photos/thumbnails/beach.jpg.H1.thumbnail.jpg", b"thumb");
        write_object(root, "photos/thumbnails/sunset.jpg.H1.thumbnail.jpg", b"thumb");
        write_object(root, "config.json", br#"{"utc_offset_minutes": 0}"#);
        temp_dir
    }

    fn photosphere(store: &TempDir) -> Command {
        let mut cmd = Command::cargo_bin("photosphere").expect("binary is built");
        cmd.env_remove("RUST_LOG")
            .arg("--config")
            .arg(store.path().join("config.json"))
            .arg("--store-root")
            .arg(store.path());
        cmd
    }

    fn stdout_json(cmd: &mut Command) -> Value {
        let output = cmd.assert().success().get_output().stdout.clone();
        serde_json::from_slice(&output).expect("stdout is JSON")
    }

    #[test]
    fn test_list_newest_first_with_unavailable_thumbnail() {
        let store = create_test_store();
        let rows = stdout_json(photosphere(&store).arg("list"));
        let rows = rows.as_array().unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["sourceUri"], "gs://photos/2025/party.mp4");
        assert_eq!(rows[0]["fileType"], "video");
        assert!(rows[0]["signedThumbnailUrl"].is_null());
        assert!(rows[1]["signedThumbnailUrl"]
            .as_str()
            .unwrap()
            .starts_with("file://"));
    }

    #[test]
    fn test_list_with_filters_and_paging() {
        let store = create_test_store();

        let rows = stdout_json(photosphere(&store).args(["list", "--from", "2025-02-02", "--to", "2025-02-02"]));
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["sourceUri"], "gs://photos/2025/sunset.jpg");

        let rows = stdout_json(photosphere(&store).args(["list", "--hash", "H1", "--name", "BEACH"]));
        assert_eq!(rows.as_array().unwrap().len(), 1);

        let rows = stdout_json(photosphere(&store).args(["list", "--page", "1", "--page-size", "2"]));
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["sourceUri"], "gs://photos/2025/beach.jpg");
    }

    #[test]
    fn test_list_with_empty_allow_list_document() {
        let store = create_test_store();
        let filter = store.path().join("filter.json");
        fs::write(&filter, r#"{"hashList": []}"#).unwrap();

        let rows = stdout_json(photosphere(&store).arg("list").arg("--filter").arg(&filter));
        assert!(rows.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_show_signs_source_and_thumbnail() {
        let store = create_test_store();
        let record = stdout_json(photosphere(&store).args(["show", "H1"]));

        assert_eq!(record["sourceUri"], "gs://photos/2025/beach.jpg");
        assert!(record["signedSourceUrl"].as_str().unwrap().ends_with("photos/2025/beach.jpg"));
        assert!(record["signedThumbnailUrl"]
            .as_str()
            .unwrap()
            .ends_with("beach.jpg.H1.thumbnail.jpg"));
    }

    #[test]
    fn test_show_failures() {
        let store = create_test_store();

        photosphere(&store)
            .args(["show", "missing"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("file with hash missing not found"));

        // The video thumbnail is absent, so full resolution fails.
        photosphere(&store)
            .args(["show", "H2"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("object not found"));
    }

    #[test]
    fn test_missing_catalog_blocks_listing() {
        let store = create_test_store();
        photosphere(&store)
            .args(["--catalog", "/elsewhere.pb", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("transport failure"));
    }

    #[test]
    fn test_decode_local_file() {
        let store = create_test_store();
        let records = stdout_json(
            photosphere(&store)
                .arg("decode")
                .arg(store.path().join("photosphere_database_cloud.pb")),
        );

        assert_eq!(records.as_array().unwrap().len(), 3);
        assert_eq!(
            records[2]["thumbnailUri"],
            "gs://photos/thumbnails/party.mp4.H2.thumbnail.jpg"
        );
    }

    #[test]
    fn test_decode_corrupt_file_fails() {
        let store = create_test_store();
        let corrupt = store.path().join("corrupt.pb");
        fs::write(&corrupt, [0x05, 0x12]).unwrap();

        photosphere(&store)
            .arg("decode")
            .arg(&corrupt)
            .assert()
            .failure()
            .stderr(predicate::str::contains("truncated message"));
    }
}
