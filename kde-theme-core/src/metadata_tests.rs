/*!
Edge-case tests for snapshot metadata.
*/

#[cfg(test)]
mod tests {
    use crate::metadata::{SnapshotMetadata, METADATA_FILE, METADATA_FORMAT_VERSION};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_created_at_is_now() {
        let metadata = SnapshotMetadata::new("default", "org.kde.breeze.desktop");

        let current_time = chrono::Utc::now();
        let time_diff = (current_time - metadata.created_at).num_seconds().abs();
        assert!(time_diff <= 5); // Allow 5 seconds difference
    }

    #[test]
    fn test_empty_name_fails_validation() {
        let metadata = SnapshotMetadata::new("", "org.kde.breeze.desktop");
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_future_format_version_is_rejected() {
        let mut metadata = SnapshotMetadata::new("default", "org.kde.breeze.desktop");
        metadata.format_version = METADATA_FORMAT_VERSION + 1;
        assert!(!metadata.is_compatible());
        assert!(metadata.validate().is_err());

        let tmp = TempDir::new().unwrap();
        metadata.write_to(tmp.path()).unwrap();
        assert!(SnapshotMetadata::read_from(tmp.path()).is_err());
    }

    #[test]
    fn test_corrupt_metadata_is_a_json_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(METADATA_FILE), b"{ not json").unwrap();

        let err = SnapshotMetadata::read_from(tmp.path()).unwrap_err();
        assert!(matches!(err, crate::ThemeError::Json(_)));
    }

    #[test]
    fn test_skipped_defaults_when_absent() {
        let tmp = TempDir::new().unwrap();
        let json = r#"{
            "name": "old",
            "created_at": "2024-05-01T10:00:00Z",
            "theme_id": "org.kde.breeze.desktop",
            "format_version": 1,
            "categories": ["icons"],
            "tool_version": "0.0.9"
        }"#;
        fs::write(tmp.path().join(METADATA_FILE), json).unwrap();

        let metadata = SnapshotMetadata::read_from(tmp.path()).unwrap().unwrap();
        assert!(metadata.skipped.is_empty());
        assert_eq!(metadata.categories, vec!["icons".to_string()]);
    }
}
