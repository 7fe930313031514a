use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{DEFAULT_LANGUAGE, default_stem, ensure_parent_directory};
use crate::error::HubsnapError;
use crate::record::DatasetRecord;

const ARCHIVE_DIR_NAME: &str = "archive";
const STATISTICS_STEM: &str = "statistics";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// File layout for one tracked snapshot stem under a data directory.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    pub data_dir: PathBuf,
    pub stem: String,
}

/// An archived file and the `YYYYMMDD` stamp taken from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub date: String,
    pub path: PathBuf,
}

impl ArchiveLayout {
    pub fn new(data_dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            stem: stem.into(),
        }
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join(ARCHIVE_DIR_NAME)
    }

    pub fn latest_snapshot(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.stem))
    }

    pub fn latest_csv(&self) -> PathBuf {
        self.data_dir.join(format!("{}.csv", self.stem))
    }

    pub fn statistics(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", self.stem_scoped(STATISTICS_STEM)))
    }

    pub fn changelog(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", self.stem_scoped("changelog")))
    }

    pub fn trends(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", self.stem_scoped("trends")))
    }

    pub fn archived_snapshot(&self, date: &str) -> PathBuf {
        self.archive_dir().join(format!("{}_{}.json", self.stem, date))
    }

    pub fn archived_csv(&self, date: &str) -> PathBuf {
        self.archive_dir().join(format!("{}_{}.csv", self.stem, date))
    }

    pub fn archived_statistics(&self, date: &str) -> PathBuf {
        self.archive_dir()
            .join(format!("{}_{date}.json", self.stem_scoped(STATISTICS_STEM)))
    }

    pub fn snapshot_archives(&self) -> Result<Vec<ArchiveEntry>, HubsnapError> {
        list_archives(&self.archive_dir(), &self.stem, "json")
    }

    pub fn statistics_archives(&self) -> Result<Vec<ArchiveEntry>, HubsnapError> {
        list_archives(&self.archive_dir(), &self.stem_scoped(STATISTICS_STEM), "json")
    }

    /// Prefixes derived file names with the stem, except for the default stem
    /// whose files keep their bare names (`statistics_{date}.json`).
    fn stem_scoped(&self, name: &str) -> String {
        if self.stem == default_stem(DEFAULT_LANGUAGE) {
            name.to_string()
        } else {
            format!("{}_{name}", self.stem)
        }
    }
}

pub fn date_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

/// Lists `{prefix}_{YYYYMMDD}.{ext}` files in `dir`, oldest first.
///
/// A missing directory yields an empty list.
pub fn list_archives(dir: &Path, prefix: &str, ext: &str) -> Result<Vec<ArchiveEntry>, HubsnapError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let pattern = format!(
        r"^{}_(\d{{8}})\.{}$",
        regex::escape(prefix),
        regex::escape(ext)
    );
    let matcher = Regex::new(&pattern)
        .map_err(|err| HubsnapError::message(format!("invalid archive pattern: {err}")))?;

    let mut entries = Vec::new();
    for item in fs::read_dir(dir)? {
        let item = item?;
        let file_name = item.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if let Some(captures) = matcher.captures(name) {
            entries.push(ArchiveEntry {
                date: captures[1].to_string(),
                path: item.path(),
            });
        }
    }

    entries.sort_by(|left, right| left.date.cmp(&right.date));
    Ok(entries)
}

/// Returns the previous and current archives, if at least two exist.
pub fn latest_two(entries: &[ArchiveEntry]) -> Option<(&ArchiveEntry, &ArchiveEntry)> {
    match entries {
        [.., previous, current] => Some((previous, current)),
        _ => None,
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, HubsnapError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), HubsnapError> {
    let serialized = serde_json::to_string_pretty(value)?;
    write_atomic(path, format!("{serialized}\n").as_bytes())
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    author: Option<&'a str>,
    created_at: Option<&'a str>,
    last_modified: Option<&'a str>,
    downloads: u64,
    likes: u64,
    tags: String,
    description: Option<&'a str>,
    url: &'a str,
    languages: String,
    tasks: String,
    size_categories: String,
}

impl<'a> CsvRow<'a> {
    fn from_record(record: &'a DatasetRecord) -> Result<Self, HubsnapError> {
        Ok(Self {
            id: &record.id,
            author: record.author.as_deref(),
            created_at: record.created_at.as_deref(),
            last_modified: record.last_modified.as_deref(),
            downloads: record.downloads,
            likes: record.likes,
            tags: serde_json::to_string(&record.tags)?,
            description: record.description.as_deref(),
            url: &record.url,
            languages: serde_json::to_string(&record.languages)?,
            tasks: serde_json::to_string(&record.tasks)?,
            size_categories: serde_json::to_string(&record.size_categories)?,
        })
    }
}

/// Writes records as a BOM-prefixed UTF-8 CSV; list columns hold JSON arrays.
pub fn write_records_csv(path: &Path, records: &[DatasetRecord]) -> Result<(), HubsnapError> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    for record in records {
        writer.serialize(CsvRow::from_record(record)?)?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|err| HubsnapError::message(format!("failed to flush CSV buffer: {err}")))?;
    write_atomic(path, &buffer)
}

pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), HubsnapError> {
    ensure_parent_directory(path)?;
    let temp_path = build_temp_path(path);
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn build_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => {
            temp_path.set_extension(format!("{ext}.tmp"));
        }
        _ => {
            temp_path.set_extension("tmp");
        }
    }
    temp_path
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn lists_only_matching_archives_in_date_order() {
        let temp = tempdir().unwrap();
        let layout = ArchiveLayout::new(temp.path(), "korean_datasets");
        let dir = layout.archive_dir();
        fs::create_dir_all(&dir).unwrap();
        for name in [
            "korean_datasets_20250110.json",
            "korean_datasets_20250103.json",
            "korean_datasets_20250103.csv",
            "statistics_20250103.json",
            "korean_datasets_latest.json",
            "korean_datasets_2025010.json",
        ] {
            fs::write(dir.join(name), "{}").unwrap();
        }

        let snapshots = layout.snapshot_archives().unwrap();
        let dates: Vec<&str> = snapshots.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["20250103", "20250110"]);

        let stats = layout.statistics_archives().unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].path, layout.archived_statistics("20250103"));
    }

    #[test]
    fn derived_files_are_scoped_to_non_default_stems() {
        let korean = ArchiveLayout::new("data", "korean_datasets");
        assert_eq!(korean.statistics(), PathBuf::from("data/statistics.json"));
        assert_eq!(
            korean.archived_statistics("20250106"),
            PathBuf::from("data/archive/statistics_20250106.json")
        );
        assert_eq!(korean.changelog(), PathBuf::from("data/changelog.json"));

        let japanese = ArchiveLayout::new("data", "japanese_datasets");
        assert_eq!(
            japanese.statistics(),
            PathBuf::from("data/japanese_datasets_statistics.json")
        );
        assert_eq!(
            japanese.archived_statistics("20250106"),
            PathBuf::from("data/archive/japanese_datasets_statistics_20250106.json")
        );
        assert_eq!(
            japanese.trends(),
            PathBuf::from("data/japanese_datasets_trends.json")
        );
    }

    #[test]
    fn statistics_archives_do_not_mix_stems() {
        let temp = tempdir().unwrap();
        let korean = ArchiveLayout::new(temp.path(), "korean_datasets");
        let japanese = ArchiveLayout::new(temp.path(), "japanese_datasets");
        fs::create_dir_all(korean.archive_dir()).unwrap();
        fs::write(korean.archived_statistics("20250106"), "{}").unwrap();
        fs::write(japanese.archived_statistics("20250106"), "{}").unwrap();
        fs::write(japanese.archived_statistics("20250113"), "{}").unwrap();

        let korean_dates: Vec<String> = korean
            .statistics_archives()
            .unwrap()
            .into_iter()
            .map(|e| e.date)
            .collect();
        assert_eq!(korean_dates, vec!["20250106"]);
        assert_eq!(japanese.statistics_archives().unwrap().len(), 2);
        assert!(japanese.snapshot_archives().unwrap().is_empty());
    }

    #[test]
    fn missing_archive_dir_is_empty() {
        let temp = tempdir().unwrap();
        let layout = ArchiveLayout::new(temp.path().join("nowhere"), "x");
        assert!(layout.snapshot_archives().unwrap().is_empty());
    }

    #[test]
    fn latest_two_needs_two_entries() {
        let entry = |date: &str| ArchiveEntry {
            date: date.to_string(),
            path: PathBuf::from(date),
        };
        assert!(latest_two(&[entry("20250101")]).is_none());

        let entries = vec![entry("20250101"), entry("20250108"), entry("20250115")];
        let (previous, current) = latest_two(&entries).unwrap();
        assert_eq!(previous.date, "20250108");
        assert_eq!(current.date, "20250115");
    }

    #[test]
    fn csv_has_bom_and_json_list_columns() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("out").join("records.csv");
        let record = DatasetRecord {
            id: "org/한국어".to_string(),
            author: Some("org".to_string()),
            created_at: None,
            last_modified: None,
            downloads: 3,
            likes: 1,
            tags: vec!["language:ko".to_string()],
            description: Some("설명, with comma".to_string()),
            url: "https://huggingface.co/datasets/org/한국어".to_string(),
            languages: vec!["ko".to_string()],
            tasks: Vec::new(),
            size_categories: Vec::new(),
        };

        write_records_csv(&path, &[record]).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("id,author,created_at"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"[\"\"ko\"\"]\""));
        assert!(row.contains("\"설명, with comma\""));
    }

    #[test]
    fn date_stamp_is_compact() {
        let now = Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(date_stamp(now), "20250307");
    }
}
