//! Duplicate scan and resolution against a file-backed store

use chrono::{TimeZone, Utc};
use newswire_ingest::config::DuplicateConfig;
use newswire_ingest::dedup;
use newswire_ingest::models::{GroupStatus, NewsRecord};
use newswire_ingest::storage::{SqliteStorage, Storage};
use newswire_ingest::IngestError;

fn story(title: &str, lead: &str, day: u32) -> NewsRecord {
    let mut record = NewsRecord::draft(title, "AA");
    record.content = format!("{}\n\nFurther details were not immediately available.", lead);
    record.published_at = Some(Utc.with_ymd_and_hms(2024, 4, day, 10, 0, 0).unwrap());
    record
}

const RATES_LEAD: &str = "The central bank raised its policy rate by half a point on Thursday, \
     citing persistent inflation in services and housing costs across the country.";

fn seed(storage: &mut SqliteStorage) -> (i64, i64, i64) {
    let older = storage
        .upsert_record(&story("Central bank raises rates", RATES_LEAD, 1))
        .unwrap();
    let newer = storage
        .upsert_record(&story(
            "Central bank raises rates",
            &RATES_LEAD.replace("Thursday", "Friday"),
            2,
        ))
        .unwrap();
    let other = storage
        .upsert_record(&story(
            "Football club signs striker",
            "The club confirmed the signing of a young striker on a four year contract after a medical.",
            2,
        ))
        .unwrap();
    (older, newer, other)
}

#[test]
fn test_scan_then_auto_merge_keeps_latest() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = SqliteStorage::new(&dir.path().join("news.db")).unwrap();
    let (older, newer, other) = seed(&mut storage);

    let report = dedup::scan_duplicates(&mut storage, &DuplicateConfig::default()).unwrap();
    assert_eq!(report.scanned, 3);
    assert_eq!(report.groups.len(), 1);

    let group = &report.groups[0];
    assert_eq!(group.members, vec![older, newer]);
    assert!(group.similarity >= 70);
    assert!(!group.contains(other));

    let merged = dedup::auto_merge_by_recency(&mut storage, group.id).unwrap();
    assert_eq!(merged.status, GroupStatus::Merged);
    assert_eq!(merged.keep_id, Some(newer));

    assert!(storage.get_record(older).unwrap().is_none());
    assert!(storage.get_record(newer).unwrap().is_some());
    assert!(storage.get_record(other).unwrap().is_some());

    // Merging again is refused
    assert!(matches!(
        dedup::auto_merge_by_recency(&mut storage, group.id),
        Err(IngestError::GroupNotPending { .. })
    ));

    let rescan = dedup::scan_duplicates(&mut storage, &DuplicateConfig::default()).unwrap();
    assert!(rescan.groups.is_empty());
}

#[test]
fn test_ignored_group_is_not_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = SqliteStorage::new(&dir.path().join("news.db")).unwrap();
    let (older, newer, _) = seed(&mut storage);

    let report = dedup::scan_duplicates(&mut storage, &DuplicateConfig::default()).unwrap();
    let group_id = report.groups[0].id;
    dedup::ignore(&mut storage, group_id).unwrap();

    let rescan = dedup::scan_duplicates(&mut storage, &DuplicateConfig::default()).unwrap();
    assert!(rescan.groups.is_empty());

    let ignored = storage.list_groups(Some(GroupStatus::Ignored)).unwrap();
    assert_eq!(ignored.len(), 1);
    assert_eq!(ignored[0].members, vec![older, newer]);
    assert_eq!(storage.count_records().unwrap(), 3);
}

#[test]
fn test_later_copy_cannot_rejoin_ignored_stories() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = SqliteStorage::new(&dir.path().join("news.db")).unwrap();
    let (older, newer, _) = seed(&mut storage);

    let report = dedup::scan_duplicates(&mut storage, &DuplicateConfig::default()).unwrap();
    dedup::ignore(&mut storage, report.groups[0].id).unwrap();

    let copy = storage
        .upsert_record(&story("Central bank raises rates", RATES_LEAD, 3))
        .unwrap();
    let report = dedup::scan_duplicates(&mut storage, &DuplicateConfig::default()).unwrap();
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].members, vec![older, copy]);

    let merged = dedup::auto_merge_by_recency(&mut storage, report.groups[0].id).unwrap();
    assert_eq!(merged.keep_id, Some(copy));
    assert!(storage.get_record(newer).unwrap().is_some());
    assert!(storage.get_record(older).unwrap().is_none());
}

#[test]
fn test_scan_is_stable_on_unchanged_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = SqliteStorage::new(&dir.path().join("news.db")).unwrap();
    seed(&mut storage);

    let first = dedup::scan_duplicates(&mut storage, &DuplicateConfig::default()).unwrap();
    let second = dedup::scan_duplicates(&mut storage, &DuplicateConfig::default()).unwrap();

    let members = |r: &dedup::ScanReport| -> Vec<Vec<i64>> {
        r.groups.iter().map(|g| g.members.clone()).collect()
    };
    assert_eq!(members(&first), members(&second));
    assert_eq!(
        storage.list_groups(Some(GroupStatus::Pending)).unwrap().len(),
        1
    );
}
