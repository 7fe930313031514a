//! Week-over-week comparison of two archived snapshots.
//!
//! Records are keyed by dataset id. Ids present only in the newer snapshot are
//! new, ids present only in the older one are removed, and ids present in both
//! are updated when their download count, like count, or description moved.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::archive::{ArchiveLayout, latest_two, read_json, write_json};
use crate::error::HubsnapError;
use crate::record::{DatasetRecord, SnapshotFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountChange {
    pub previous: u64,
    pub current: u64,
    pub change: i64,
}

impl CountChange {
    fn between(previous: u64, current: u64) -> Self {
        Self {
            previous,
            current,
            change: signed_delta(current, previous),
        }
    }
}

/// `current - previous`, saturated to the `i64` range.
fn signed_delta(current: u64, previous: u64) -> i64 {
    let delta = i128::from(current) - i128::from(previous);
    i64::try_from(delta).unwrap_or(if delta > 0 { i64::MAX } else { i64::MIN })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordChanges {
    pub downloads: CountChange,
    pub likes: CountChange,
    pub description_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedDataset {
    pub id: String,
    pub author: Option<String>,
    pub url: String,
    pub changes: RecordChanges,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotChanges {
    pub new_datasets: Vec<DatasetRecord>,
    pub removed_datasets: Vec<DatasetRecord>,
    pub updated_datasets: Vec<UpdatedDataset>,
    pub unchanged_count: usize,
    /// Updated records found before the list was truncated.
    #[serde(skip)]
    pub updated_total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangelogSummary {
    pub new_count: usize,
    pub removed_count: usize,
    pub updated_count: usize,
    pub updated_total: usize,
    pub unchanged_count: usize,
    pub net_change: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Changelog {
    pub generated_at: String,
    pub previous_date: String,
    pub current_date: String,
    pub previous_count: usize,
    pub current_count: usize,
    pub changes: SnapshotChanges,
    pub summary: ChangelogSummary,
}

/// Diffs two snapshots by id, keeping at most `limit` updated entries.
pub fn compare_snapshots(
    previous: &[DatasetRecord],
    current: &[DatasetRecord],
    limit: usize,
) -> SnapshotChanges {
    let previous_by_id = index_by_id(previous);
    let current_by_id = index_by_id(current);

    let previous_ids: BTreeSet<&str> = previous_by_id.keys().copied().collect();
    let current_ids: BTreeSet<&str> = current_by_id.keys().copied().collect();

    let new_datasets: Vec<DatasetRecord> = current_ids
        .difference(&previous_ids)
        .map(|id| current_by_id[id].clone())
        .collect();
    let removed_datasets: Vec<DatasetRecord> = previous_ids
        .difference(&current_ids)
        .map(|id| previous_by_id[id].clone())
        .collect();

    let common: Vec<&str> = previous_ids.intersection(&current_ids).copied().collect();
    let mut updated_datasets: Vec<UpdatedDataset> = common
        .iter()
        .filter_map(|id| diff_record(previous_by_id[id], current_by_id[id]))
        .collect();

    updated_datasets.sort_by(|left, right| {
        right
            .changes
            .downloads
            .change
            .cmp(&left.changes.downloads.change)
            .then_with(|| left.id.cmp(&right.id))
    });

    let updated_total = updated_datasets.len();
    updated_datasets.truncate(limit);

    SnapshotChanges {
        new_datasets,
        removed_datasets,
        updated_datasets,
        unchanged_count: common.len() - updated_total,
        updated_total,
    }
}

fn index_by_id(records: &[DatasetRecord]) -> BTreeMap<&str, &DatasetRecord> {
    let mut index = BTreeMap::new();
    for record in records {
        if index.insert(record.id.as_str(), record).is_some() {
            warn!(id = %record.id, "duplicate dataset id in snapshot; keeping the last entry");
        }
    }
    index
}

fn diff_record(previous: &DatasetRecord, current: &DatasetRecord) -> Option<UpdatedDataset> {
    let description_changed = previous.description != current.description;
    if previous.downloads == current.downloads
        && previous.likes == current.likes
        && !description_changed
    {
        return None;
    }

    Some(UpdatedDataset {
        id: current.id.clone(),
        author: current.author.clone(),
        url: current.url.clone(),
        changes: RecordChanges {
            downloads: CountChange::between(previous.downloads, current.downloads),
            likes: CountChange::between(previous.likes, current.likes),
            description_changed,
        },
    })
}

impl ChangelogSummary {
    pub fn from_changes(changes: &SnapshotChanges) -> Self {
        Self {
            new_count: changes.new_datasets.len(),
            removed_count: changes.removed_datasets.len(),
            updated_count: changes.updated_datasets.len(),
            updated_total: changes.updated_total,
            unchanged_count: changes.unchanged_count,
            net_change: signed_delta(
                changes.new_datasets.len() as u64,
                changes.removed_datasets.len() as u64,
            ),
        }
    }
}

/// Builds a changelog from the two most recent snapshot archives.
///
/// Returns `Ok(None)` when fewer than two archives exist.
pub fn build_changelog(
    layout: &ArchiveLayout,
    limit: usize,
) -> Result<Option<Changelog>, HubsnapError> {
    let archives = layout.snapshot_archives()?;
    let Some((previous_entry, current_entry)) = latest_two(&archives) else {
        warn!(
            found = archives.len(),
            dir = %layout.archive_dir().display(),
            "not enough archive files to compare"
        );
        return Ok(None);
    };

    info!(
        previous = %previous_entry.path.display(),
        current = %current_entry.path.display(),
        "comparing snapshot archives"
    );

    let previous: SnapshotFile = read_json(&previous_entry.path)?;
    let current: SnapshotFile = read_json(&current_entry.path)?;

    let changes = compare_snapshots(&previous.datasets, &current.datasets, limit);
    let summary = ChangelogSummary::from_changes(&changes);

    Ok(Some(Changelog {
        generated_at: Utc::now().to_rfc3339(),
        previous_date: previous_entry.date.clone(),
        current_date: current_entry.date.clone(),
        previous_count: previous.total_count,
        current_count: current.total_count,
        changes,
        summary,
    }))
}

/// Runs the changelog job and writes `changelog.json`.
pub fn generate_changelog(
    layout: &ArchiveLayout,
    limit: usize,
) -> Result<Option<Changelog>, HubsnapError> {
    let Some(changelog) = build_changelog(layout, limit)? else {
        return Ok(None);
    };

    let output = layout.changelog();
    write_json(&output, &changelog)?;

    let summary = &changelog.summary;
    info!(
        path = %output.display(),
        period = %format!("{} -> {}", changelog.previous_date, changelog.current_date),
        new = summary.new_count,
        removed = summary.removed_count,
        updated = summary.updated_count,
        unchanged = summary.unchanged_count,
        net_change = summary.net_change,
        "changelog written"
    );

    Ok(Some(changelog))
}
