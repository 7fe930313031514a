use std::fs;

use chrono::{TimeZone, Utc};
use hubsnap_core::archive::ArchiveLayout;
use hubsnap_core::collect::save_collection;
use hubsnap_core::record::DatasetRecord;
use hubsnap_core::{generate_changelog, generate_trends};
use serde_json::Value;
use tempfile::tempdir;

fn record(id: &str, downloads: u64, likes: u64, languages: &[&str]) -> DatasetRecord {
    DatasetRecord {
        id: id.to_string(),
        author: id.split('/').next().map(str::to_string),
        created_at: Some("2024-01-01T00:00:00.000Z".to_string()),
        last_modified: None,
        downloads,
        likes,
        tags: languages.iter().map(|l| format!("language:{l}")).collect(),
        description: None,
        url: format!("https://huggingface.co/datasets/{id}"),
        languages: languages.iter().map(|l| l.to_string()).collect(),
        tasks: vec!["text-classification".to_string()],
        size_categories: Vec::new(),
    }
}

fn read(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read output")).expect("valid json")
}

#[test]
fn collection_archives_then_changelog_and_trends_fold_them() {
    let temp = tempdir().expect("tempdir");
    let layout = ArchiveLayout::new(temp.path().join("data"), "korean_datasets");

    let week_one = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
    let week_two = Utc.with_ymd_and_hms(2025, 1, 13, 9, 0, 0).unwrap();

    save_collection(
        &layout,
        vec![
            record("alpha/corpus", 100, 4, &["ko"]),
            record("beta/qa", 50, 1, &["ko", "en"]),
        ],
        week_one,
        10,
    )
    .expect("first collection");

    let outcome = save_collection(
        &layout,
        vec![
            record("alpha/corpus", 180, 5, &["ko"]),
            record("gamma/speech", 3, 0, &["ko"]),
            record("delta/mt", 9, 0, &["ko", "en", "ja"]),
        ],
        week_two,
        10,
    )
    .expect("second collection");
    assert_eq!(outcome.date, "20250113");
    assert_eq!(outcome.total, 3);

    assert!(layout.archived_snapshot("20250106").exists());
    assert!(layout.archived_csv("20250113").exists());
    assert!(layout.latest_csv().exists());
    let latest = read(&layout.latest_snapshot());
    assert_eq!(latest["total_count"], 3);

    let changelog = generate_changelog(&layout, 50)
        .expect("changelog job")
        .expect("two archives present");
    assert_eq!(changelog.previous_date, "20250106");
    assert_eq!(changelog.current_date, "20250113");
    assert_eq!(changelog.summary.new_count, 2);
    assert_eq!(changelog.summary.removed_count, 1);
    assert_eq!(changelog.summary.updated_count, 1);
    assert_eq!(changelog.summary.net_change, 1);

    let written = read(&layout.changelog());
    assert_eq!(written["previous_count"], 2);
    assert_eq!(written["current_count"], 3);
    let updated = &written["changes"]["updated_datasets"][0];
    assert_eq!(updated["id"], "alpha/corpus");
    assert_eq!(updated["changes"]["downloads"]["change"], 80);
    assert_eq!(updated["changes"]["likes"]["previous"], 4);
    assert_eq!(written["changes"]["removed_datasets"][0]["id"], "beta/qa");

    let trends = generate_trends(&layout)
        .expect("trends job")
        .expect("statistics archived");
    assert_eq!(trends.dates, vec!["20250106", "20250113"]);
    assert_eq!(trends.total_datasets, vec![2, 3]);
    assert_eq!(trends.total_downloads, vec![150, 192]);
    assert_eq!(trends.multilingual_count, vec![1, 1]);
    assert_eq!(trends.growth_rate, 50.0);

    let written = read(&layout.trends());
    assert_eq!(written["trends"]["total_weeks"], 2);
    assert_eq!(written["trends"]["latest_stats"]["total_datasets"], 3);
    assert!(written["generated_at"].is_string());
}

#[test]
fn two_languages_collected_on_the_same_day_keep_separate_trends() {
    let temp = tempdir().expect("tempdir");
    let korean = ArchiveLayout::new(temp.path().join("data"), "korean_datasets");
    let japanese = ArchiveLayout::new(temp.path().join("data"), "japanese_datasets");
    let day = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();

    save_collection(
        &korean,
        vec![
            record("alpha/corpus", 100, 4, &["ko"]),
            record("beta/qa", 50, 1, &["ko"]),
            record("gamma/speech", 3, 0, &["ko"]),
        ],
        day,
        10,
    )
    .expect("korean collection");
    save_collection(&japanese, vec![record("kappa/wiki", 7, 0, &["ja"])], day, 10)
        .expect("japanese collection");

    assert_eq!(read(&korean.statistics())["statistics"]["total_datasets"], 3);
    assert_eq!(read(&japanese.statistics())["statistics"]["total_datasets"], 1);

    let korean_trends = generate_trends(&korean)
        .expect("korean trends")
        .expect("korean statistics archived");
    assert_eq!(korean_trends.total_datasets, vec![3]);

    let japanese_trends = generate_trends(&japanese)
        .expect("japanese trends")
        .expect("japanese statistics archived");
    assert_eq!(japanese_trends.total_datasets, vec![1]);
    assert!(korean.trends().exists());
    assert!(japanese.trends().exists());
    assert_ne!(korean.trends(), japanese.trends());
}

#[test]
fn changelog_and_trends_write_nothing_without_archives() {
    let temp = tempdir().expect("tempdir");
    let layout = ArchiveLayout::new(temp.path(), "korean_datasets");

    assert!(generate_changelog(&layout, 50).expect("changelog job").is_none());
    assert!(generate_trends(&layout).expect("trends job").is_none());
    assert!(!layout.changelog().exists());
    assert!(!layout.trends().exists());
}

#[test]
fn changelog_reads_archives_with_sparse_records() {
    let temp = tempdir().expect("tempdir");
    let layout = ArchiveLayout::new(temp.path(), "korean_datasets");
    fs::create_dir_all(layout.archive_dir()).expect("archive dir");

    fs::write(
        layout.archived_snapshot("20240101"),
        r#"{"last_updated": "2024-01-01T00:00:00", "total_count": 1,
            "datasets": [{"id": "a/b", "downloads": 1, "likes": 0, "description": null}]}"#,
    )
    .expect("write previous");
    fs::write(
        layout.archived_snapshot("20240108"),
        r#"{"last_updated": "2024-01-08T00:00:00", "total_count": 1,
            "datasets": [{"id": "a/b", "downloads": 1, "likes": 0, "description": "now described"}]}"#,
    )
    .expect("write current");

    let changelog = generate_changelog(&layout, 50)
        .expect("changelog job")
        .expect("two archives present");
    assert_eq!(changelog.summary.updated_count, 1);
    assert!(changelog.changes.updated_datasets[0].changes.description_changed);
    assert_eq!(changelog.summary.unchanged_count, 0);
}
