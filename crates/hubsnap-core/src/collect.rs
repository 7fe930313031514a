use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::archive::{ArchiveLayout, date_stamp, write_json, write_records_csv};
use crate::error::HubsnapError;
use crate::hub::HubClient;
use crate::record::{DatasetRecord, SnapshotFile, keep_for_language};
use crate::stats::{Statistics, StatisticsFile, generate_statistics};

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub language: String,
    pub layout: ArchiveLayout,
    pub max_languages: usize,
    pub top_n: usize,
}

#[derive(Debug, Clone)]
pub struct CollectOutcome {
    pub date: String,
    pub total: usize,
    pub statistics: Statistics,
}

/// Lists, filters, and archives one language's datasets.
///
/// Returns `Ok(None)` without writing anything when nothing survives filtering.
pub async fn collect_datasets(
    client: &HubClient,
    options: &CollectOptions,
) -> Result<Option<CollectOutcome>, HubsnapError> {
    info!(language = %options.language, "collecting datasets");
    let listed = client.list_datasets(&options.language).await?;
    let listed_count = listed.len();
    let datasets = filter_for_language(listed, &options.language, options.max_languages);
    info!(
        listed = listed_count,
        kept = datasets.len(),
        max_languages = options.max_languages,
        "language filter applied"
    );

    if datasets.is_empty() {
        warn!(language = %options.language, "no datasets collected");
        return Ok(None);
    }

    save_collection(&options.layout, datasets, Utc::now(), options.top_n).map(Some)
}

pub fn filter_for_language(
    records: Vec<DatasetRecord>,
    language: &str,
    max_languages: usize,
) -> Vec<DatasetRecord> {
    records
        .into_iter()
        .filter(|record| keep_for_language(record, language, max_languages))
        .collect()
}

/// Writes the latest and dated copies of the snapshot, CSV, and statistics.
pub fn save_collection(
    layout: &ArchiveLayout,
    datasets: Vec<DatasetRecord>,
    now: DateTime<Utc>,
    top_n: usize,
) -> Result<CollectOutcome, HubsnapError> {
    let date = date_stamp(now);
    let last_updated = now.to_rfc3339();

    let statistics = generate_statistics(&datasets, top_n);
    let snapshot = SnapshotFile::new(last_updated.clone(), datasets);

    let archived = layout.archived_snapshot(&date);
    write_json(&archived, &snapshot)?;
    info!(path = %archived.display(), "snapshot archived");
    write_json(&layout.latest_snapshot(), &snapshot)?;

    if !snapshot.datasets.is_empty() {
        write_records_csv(&layout.latest_csv(), &snapshot.datasets)?;
        write_records_csv(&layout.archived_csv(&date), &snapshot.datasets)?;
    }

    let statistics_file = StatisticsFile {
        last_updated,
        statistics,
    };
    write_json(&layout.statistics(), &statistics_file)?;
    write_json(&layout.archived_statistics(&date), &statistics_file)?;

    let statistics = statistics_file.statistics;
    info!(
        path = %layout.latest_snapshot().display(),
        total = snapshot.total_count,
        total_downloads = statistics.total_downloads,
        total_likes = statistics.total_likes,
        multilingual = statistics.multilingual_count,
        "collection saved"
    );

    Ok(CollectOutcome {
        date,
        total: snapshot.total_count,
        statistics,
    })
}
