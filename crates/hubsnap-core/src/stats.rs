use std::collections::HashMap;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::record::DatasetRecord;

const UNKNOWN_AUTHOR: &str = "unknown";

/// Counts ranked by value, serialized as a JSON object in rank order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedCounts(pub Vec<(String, u64)>);

impl RankedCounts {
    /// Sorts by count descending, then name ascending, and keeps `top_n`.
    pub fn from_counts(counts: HashMap<String, u64>, top_n: usize) -> Self {
        let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
        ranked.sort_by(|(left_name, left), (right_name, right)| {
            right.cmp(left).then_with(|| left_name.cmp(right_name))
        });
        ranked.truncate(top_n);
        Self(ranked)
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, count)| *count)
    }
}

impl Serialize for RankedCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, count) in &self.0 {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_datasets: usize,
    pub total_downloads: u64,
    pub total_likes: u64,
    pub top_authors: RankedCounts,
    pub top_tasks: RankedCounts,
    pub multilingual_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsFile {
    pub last_updated: String,
    pub statistics: Statistics,
}

pub fn generate_statistics(datasets: &[DatasetRecord], top_n: usize) -> Statistics {
    let mut authors: HashMap<String, u64> = HashMap::new();
    let mut tasks: HashMap<String, u64> = HashMap::new();
    let mut multilingual_count = 0usize;

    for dataset in datasets {
        let author = dataset.author.as_deref().unwrap_or(UNKNOWN_AUTHOR);
        *authors.entry(author.to_string()).or_insert(0) += 1;

        for task in &dataset.tasks {
            *tasks.entry(task.clone()).or_insert(0) += 1;
        }

        if dataset.languages.len() > 1 {
            multilingual_count += 1;
        }
    }

    Statistics {
        total_datasets: datasets.len(),
        total_downloads: datasets.iter().map(|d| d.downloads).sum(),
        total_likes: datasets.iter().map(|d| d.likes).sum(),
        top_authors: RankedCounts::from_counts(authors, top_n),
        top_tasks: RankedCounts::from_counts(tasks, top_n),
        multilingual_count,
    }
}
