use chrono::{DateTime, TimeZone, Utc};
use imagededup_analyze::{CandidateSelector, ProcessedSet, Ranker};
use imagededup_core::{FileMetadata, FileRecord, PrioritizationRule};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn record(path: &str) -> FileRecord {
    FileRecord::new(path, FileMetadata::new(1024, at(1_600_000_000)))
}

fn paths(records: &[FileRecord]) -> Vec<PathBuf> {
    records.iter().map(|r| r.path.clone()).collect()
}

fn mixed_group() -> Vec<FileRecord> {
    vec![
        FileRecord::new(
            "/photos/a/IMG_1.jpg",
            FileMetadata::new(2048, at(100)).with_pixel_count(500),
        )
        .with_match(0.0, 100.0),
        FileRecord::new(
            "/photos/b/IMG_1 - Copy.jpg",
            FileMetadata::new(2048, at(100)).with_pixel_count(500),
        )
        .with_match(0.0, 100.0),
        FileRecord::new(
            "/photos/IMG_1.jpg",
            FileMetadata::new(4096, at(50)).with_pixel_count(500),
        )
        .with_match(0.03, 97.0),
        FileRecord::new(
            "/photos/c/IMG_1.jpg",
            FileMetadata::new(2048, at(100))
                .with_pixel_count(500)
                .with_exif_tag_count(3),
        )
        .with_match(0.01, 99.0),
        FileRecord::new(
            "/photos/d/IMG_1.jpg",
            FileMetadata::new(2048, at(100)).with_pixel_count(500),
        )
        .with_match(0.0, 100.0),
    ]
}

#[test]
fn test_higher_pixel_count_wins_under_shuffle() {
    let mut group = vec![
        FileRecord::new(
            "/photos/best.jpg",
            FileMetadata::new(1024, at(1_600_000_000)).with_pixel_count(100_000),
        ),
    ];
    for i in 1..=50u64 {
        group.push(FileRecord::new(
            format!("/photos/{i}.jpg"),
            FileMetadata::new(1024, at(1_600_000_000)).with_pixel_count(i),
        ));
    }

    let ranker = Ranker::default();
    let selector = CandidateSelector::default();

    for seed in 0..20 {
        let mut shuffled = group.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(seed));

        let mut processed = ProcessedSet::new();
        let selection = selector
            .select(ranker.rank(shuffled).unwrap(), &mut processed)
            .unwrap();

        assert_eq!(selection.kept().path, PathBuf::from("/photos/best.jpg"));
        assert_eq!(selection.keep.len(), 1);
        assert_eq!(selection.remove.len(), 50);
    }
}

#[test]
fn test_copy_in_filename_loses() {
    let ranker = Ranker::default();
    let ranked = ranker
        .rank(vec![record("/photos/1-Copy.jpg"), record("/photos/1.jpg")])
        .unwrap();
    assert_eq!(ranked[0].path, PathBuf::from("/photos/1.jpg"));
}

#[test]
fn test_fifty_copies_lose_to_original() {
    let mut group: Vec<_> = (0..50)
        .map(|i| record(&format!("/photos/1-Copy ({i}).jpg")))
        .collect();
    group.push(record("/photos/1.jpg"));

    let ranked = Ranker::default().rank(group).unwrap();
    assert_eq!(ranked[0].path, PathBuf::from("/photos/1.jpg"));
}

#[test]
fn test_longer_filename_preferred() {
    let ranked = Ranker::default()
        .rank(vec![record("/photos/50.jpg"), record("/photos/50-edited.jpg")])
        .unwrap();
    assert_eq!(ranked[0].path, PathBuf::from("/photos/50-edited.jpg"));
}

#[test]
fn test_rank_invariant_under_every_permutation() {
    let ranker = Ranker::default();
    let group = mixed_group();
    let expected = paths(&ranker.rank(group.clone()).unwrap());

    for permutation in group.iter().cloned().permutations(group.len()) {
        assert_eq!(paths(&ranker.rank(permutation).unwrap()), expected);
    }

    let mut reversed = group.clone();
    reversed.reverse();
    assert_eq!(paths(&ranker.rank(reversed).unwrap()), expected);
}

#[test]
fn test_default_order_on_mixed_group() {
    let ranked = Ranker::default().rank(mixed_group()).unwrap();
    assert_eq!(
        paths(&ranked),
        vec![
            // exif data beats file size
            PathBuf::from("/photos/c/IMG_1.jpg"),
            PathBuf::from("/photos/IMG_1.jpg"),
            PathBuf::from("/photos/a/IMG_1.jpg"),
            PathBuf::from("/photos/d/IMG_1.jpg"),
            PathBuf::from("/photos/b/IMG_1 - Copy.jpg"),
        ]
    );
}

#[test]
fn test_custom_rule_order() {
    let rules = PrioritizationRule::parse_list(&["smaller-file-size", "older-modification-date"])
        .unwrap();
    let ranked = Ranker::new(&rules)
        .rank(vec![
            FileRecord::new("/p/big.jpg", FileMetadata::new(10, at(5))),
            FileRecord::new("/p/small-new.jpg", FileMetadata::new(1, at(9))),
            FileRecord::new("/p/small-old.jpg", FileMetadata::new(1, at(2))),
        ])
        .unwrap();
    assert_eq!(
        paths(&ranked),
        vec![
            PathBuf::from("/p/small-old.jpg"),
            PathBuf::from("/p/small-new.jpg"),
            PathBuf::from("/p/big.jpg"),
        ]
    );
}

#[test]
fn test_bigger_newer_and_score_rules() {
    let ranker = Ranker::default();

    let ranked = ranker
        .rank(vec![
            FileRecord::new("/p/small.jpg", FileMetadata::new(10, at(5))),
            FileRecord::new("/p/big.jpg", FileMetadata::new(20, at(5))),
        ])
        .unwrap();
    assert_eq!(ranked[0].path, PathBuf::from("/p/big.jpg"));

    let ranked = ranker
        .rank(vec![
            FileRecord::new("/p/old.jpg", FileMetadata::new(10, at(5))),
            FileRecord::new("/p/new.jpg", FileMetadata::new(10, at(6))),
        ])
        .unwrap();
    assert_eq!(ranked[0].path, PathBuf::from("/p/new.jpg"));

    let ranker = Ranker::new(&[PrioritizationRule::HigherScore]);
    let ranked = ranker
        .rank(vec![
            record("/p/x.jpg").with_match(0.0, 90.0),
            record("/p/y.jpg").with_match(0.0, 95.0),
        ])
        .unwrap();
    assert_eq!(ranked[0].path, PathBuf::from("/p/y.jpg"));

    let ranker = Ranker::new(&[PrioritizationRule::SmallerDistance]);
    let ranked = ranker
        .rank(vec![
            record("/p/x.jpg").with_match(0.05, 95.0),
            record("/p/y.jpg").with_match(0.01, 99.0),
        ])
        .unwrap();
    assert_eq!(ranked[0].path, PathBuf::from("/p/y.jpg"));
}

#[test]
fn test_selection_partitions_input() {
    let ranker = Ranker::default();
    let selector = CandidateSelector::new(Some(Duration::from_secs(30)));

    for seed in 0..10 {
        let mut group = mixed_group();
        group.push(FileRecord::new(
            "/photos/e/IMG_1.jpg",
            FileMetadata::new(2048, at(10_000)),
        ));
        group.shuffle(&mut StdRng::seed_from_u64(seed));

        let input: HashSet<_> = paths(&group).into_iter().collect();
        let mut processed = ProcessedSet::new();
        let selection = selector
            .select(ranker.rank(group).unwrap(), &mut processed)
            .unwrap();

        let keep: HashSet<_> = paths(&selection.keep).into_iter().collect();
        let remove: HashSet<_> = paths(&selection.remove).into_iter().collect();

        assert!(!keep.is_empty());
        assert!(keep.is_disjoint(&remove));
        assert_eq!(&keep | &remove, input);
        assert!(input.iter().all(|p| processed.contains(p)));
    }
}

#[test]
fn test_time_window_keeps_distant_candidates_regardless_of_rank() {
    let delta = Duration::from_secs(3600);
    let kept_time = 1_600_000_000;

    let mut group = vec![FileRecord::new(
        "/photos/best.jpg",
        FileMetadata::new(1024, at(kept_time)).with_pixel_count(1_000_000),
    )];
    for (i, offset) in [-7200i64, -3600, -10, 0, 10, 3600, 3601, 86_400]
        .into_iter()
        .enumerate()
    {
        group.push(FileRecord::new(
            format!("/photos/{i}.jpg"),
            FileMetadata::new(1024, at(kept_time + offset)).with_pixel_count(i as u64),
        ));
    }

    let mut processed = ProcessedSet::new();
    let selection = CandidateSelector::new(Some(delta))
        .select(Ranker::default().rank(group).unwrap(), &mut processed)
        .unwrap();

    assert_eq!(selection.kept().path, PathBuf::from("/photos/best.jpg"));
    for candidate in &selection.remove {
        let diff = (candidate.metadata.modification_time - at(kept_time))
            .num_seconds()
            .abs();
        assert!(diff <= 3600, "{} should be kept", candidate.path.display());
    }
    let kept_extra: HashSet<_> = paths(&selection.keep[1..]).into_iter().collect();
    let expected: HashSet<_> = ["/photos/0.jpg", "/photos/6.jpg", "/photos/7.jpg"]
        .into_iter()
        .map(PathBuf::from)
        .collect();
    assert_eq!(kept_extra, expected);
}
