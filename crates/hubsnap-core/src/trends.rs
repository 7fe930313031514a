use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::archive::{ArchiveLayout, read_json, write_json};
use crate::error::HubsnapError;

/// One archived statistics file, tagged with its file date.
#[derive(Debug, Clone)]
pub struct StatisticsEntry {
    pub date: String,
    pub last_updated: Option<String>,
    pub statistics: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct StatisticsPayload {
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    statistics: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendData {
    pub dates: Vec<String>,
    pub total_datasets: Vec<u64>,
    pub total_downloads: Vec<u64>,
    pub total_likes: Vec<u64>,
    pub multilingual_count: Vec<u64>,
    pub growth_rate: f64,
    pub latest_stats: Map<String, Value>,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub total_weeks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendsFile {
    pub generated_at: String,
    pub trends: TrendData,
}

pub fn load_archived_statistics(
    layout: &ArchiveLayout,
) -> Result<Vec<StatisticsEntry>, HubsnapError> {
    let mut entries = Vec::new();
    for archive in layout.statistics_archives()? {
        let payload: StatisticsPayload = read_json(&archive.path)?;
        entries.push(StatisticsEntry {
            date: archive.date,
            last_updated: payload.last_updated,
            statistics: payload.statistics.unwrap_or_default(),
        });
    }
    Ok(entries)
}

/// Folds statistics snapshots (oldest first) into parallel time series.
pub fn generate_trend_data(entries: &[StatisticsEntry]) -> TrendData {
    let mut data = TrendData {
        dates: Vec::with_capacity(entries.len()),
        total_datasets: Vec::with_capacity(entries.len()),
        total_downloads: Vec::with_capacity(entries.len()),
        total_likes: Vec::with_capacity(entries.len()),
        multilingual_count: Vec::with_capacity(entries.len()),
        growth_rate: 0.0,
        latest_stats: Map::new(),
        first_date: None,
        last_date: None,
        total_weeks: entries.len(),
    };

    for entry in entries {
        data.dates.push(entry.date.clone());
        data.total_datasets
            .push(count_field(&entry.statistics, "total_datasets"));
        data.total_downloads
            .push(count_field(&entry.statistics, "total_downloads"));
        data.total_likes
            .push(count_field(&entry.statistics, "total_likes"));
        data.multilingual_count
            .push(count_field(&entry.statistics, "multilingual_count"));
    }

    data.growth_rate = growth_rate(&data.total_datasets);
    data.latest_stats = entries
        .last()
        .map(|entry| entry.statistics.clone())
        .unwrap_or_default();
    data.first_date = data.dates.first().cloned();
    data.last_date = data.dates.last().cloned();
    data
}

fn count_field(statistics: &Map<String, Value>, key: &str) -> u64 {
    match statistics.get(key) {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// Percent change from the first to the last point, rounded to 2 decimals.
fn growth_rate(series: &[u64]) -> f64 {
    match series {
        [first, .., last] if *first > 0 => {
            let rate = (*last as f64 - *first as f64) / *first as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        }
        _ => 0.0,
    }
}

/// Runs the trends job and writes `trends.json`.
///
/// Returns `Ok(None)` without writing when no statistics have been archived.
pub fn generate_trends(layout: &ArchiveLayout) -> Result<Option<TrendData>, HubsnapError> {
    let entries = load_archived_statistics(layout)?;
    if entries.is_empty() {
        warn!(dir = %layout.archive_dir().display(), "no archived statistics found");
        return Ok(None);
    }

    info!(count = entries.len(), "archived statistics loaded");
    let trends = generate_trend_data(&entries);

    let output = layout.trends();
    write_json(
        &output,
        &TrendsFile {
            generated_at: Utc::now().to_rfc3339(),
            trends: trends.clone(),
        },
    )?;

    info!(
        path = %output.display(),
        first_date = trends.first_date.as_deref().unwrap_or("-"),
        last_date = trends.last_date.as_deref().unwrap_or("-"),
        total_weeks = trends.total_weeks,
        growth_rate = trends.growth_rate,
        "trend data written"
    );

    Ok(Some(trends))
}
