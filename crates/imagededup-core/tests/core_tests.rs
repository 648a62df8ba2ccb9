use chrono::{DateTime, TimeZone, Utc};
use imagededup_core::{
    Action, ConfigError, DATA_MODEL_VERSION, DedupConfig, FileMetadata, FileRecord,
    ObserverKind, PrioritizationRule, non_overlapping_roots,
};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

#[test]
fn test_file_record_builders() {
    let metadata = FileMetadata::new(2048, timestamp(1_600_000_000))
        .with_pixel_count(640 * 480)
        .with_exif_tag_count(12);
    let record = FileRecord::new("/photos/holiday/beach.jpg", metadata).with_match(0.02, 98.0);

    assert_eq!(record.distance, 0.02);
    assert_eq!(record.score, 98.0);
    assert_eq!(record.metadata.pixel_count, 307_200);
    assert_eq!(record.metadata.exif_tag_count, 12);
    assert_eq!(record.metadata.data_model_version, DATA_MODEL_VERSION);
    assert_eq!(record.file_name(), "beach.jpg");
    assert_eq!(record.folder(), "/photos/holiday");
}

#[test]
fn test_file_record_toml_round_trip() {
    let record = FileRecord::new(
        "/photos/a.png",
        FileMetadata::new(10, timestamp(1_000)),
    );
    let text = toml::to_string(&record).unwrap();
    assert!(text.contains("a.png"));

    let parsed: FileRecord = toml::from_str(&text).unwrap();
    assert_eq!(parsed, record);
}

#[test]
fn test_action_parse() {
    assert_eq!("move".parse::<Action>().unwrap(), Action::Move);
    assert_eq!("delete".parse::<Action>().unwrap(), Action::Delete);
    assert_eq!("none".parse::<Action>().unwrap(), Action::None);
    assert!("archive".parse::<Action>().is_err());
}

#[test]
fn test_config_load_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(
        &path,
        r#"
        roots = ["/srv/photos"]
        recursive = false
        extensions = [".png"]
        exclusions = ["/\\.thumbnails/"]
        threads = 2
        dry_run = false
        remove_empty_folders = true

        [daemon]
        quiescence = "1m"
        observer = "polling"
        poll_interval = "2s"
        "#,
    )
    .unwrap();

    let config = DedupConfig::load(&path).unwrap();
    assert_eq!(config.roots, vec![PathBuf::from("/srv/photos")]);
    assert!(!config.recursive);
    assert_eq!(config.extensions, vec![".png".to_string()]);
    assert_eq!(config.exclusions.len(), 1);
    assert_eq!(config.resolved_threads(), 2);
    assert!(!config.dry_run);
    assert!(config.remove_empty_folders);
    assert_eq!(config.daemon.quiescence, Duration::from_secs(60));
    assert_eq!(config.daemon.observer, ObserverKind::Polling);
    assert_eq!(config.daemon.poll_interval, Duration::from_secs(2));
}

#[test]
fn test_config_load_missing_file() {
    let temp = TempDir::new().unwrap();
    let err = DedupConfig::load(&temp.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_config_load_reports_path_on_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    fs::write(&path, "roots = [").unwrap();

    match DedupConfig::load(&path).unwrap_err() {
        ConfigError::Parse { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_config_validate_rejects_zero_quiescence() {
    let mut config = DedupConfig::new(vec![PathBuf::from("/photos")]);
    config.daemon.quiescence = Duration::ZERO;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validate_rejects_distance_out_of_range() {
    let mut config = DedupConfig::new(vec![PathBuf::from("/photos")]);
    config.max_distance = 1.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_default_rule_order() {
    let names: Vec<String> = PrioritizationRule::defaults()
        .iter()
        .map(|r| r.to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "higher-pixel-count",
            "more-exif-data",
            "bigger-file-size",
            "newer-modification-date",
            "smaller-distance",
            "doesnt-contain-copy-in-filename",
            "longer-filename",
            "shorter-folder-path",
            "higher-score",
        ]
    );
}

#[test]
fn test_non_overlapping_roots_keeps_disjoint() {
    let roots = vec![
        PathBuf::from("/home/user/photos"),
        PathBuf::from("/home/user/docs"),
        PathBuf::from("/var/data"),
    ];
    assert_eq!(non_overlapping_roots(&roots), roots);
}
