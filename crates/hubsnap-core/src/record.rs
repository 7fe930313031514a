use serde::{Deserialize, Serialize};

const LANGUAGE_PREFIX: &str = "language:";
const TASK_PREFIX: &str = "task_categories:";
const SIZE_PREFIX: &str = "size_categories:";

/// One dataset as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub size_categories: Vec<String>,
}

/// Contents of a `{stem}.json` snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub datasets: Vec<DatasetRecord>,
}

impl SnapshotFile {
    pub fn new(last_updated: String, datasets: Vec<DatasetRecord>) -> Self {
        Self {
            last_updated: Some(last_updated),
            total_count: datasets.len(),
            datasets,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagBreakdown {
    pub languages: Vec<String>,
    pub tasks: Vec<String>,
    pub size_categories: Vec<String>,
}

pub fn classify_tags(tags: &[String]) -> TagBreakdown {
    let mut breakdown = TagBreakdown::default();
    for tag in tags {
        if let Some(value) = tag.strip_prefix(LANGUAGE_PREFIX) {
            breakdown.languages.push(value.to_string());
        } else if let Some(value) = tag.strip_prefix(TASK_PREFIX) {
            breakdown.tasks.push(value.to_string());
        } else if let Some(value) = tag.strip_prefix(SIZE_PREFIX) {
            breakdown.size_categories.push(value.to_string());
        }
    }
    breakdown
}

pub fn dataset_url(endpoint: &str, id: &str) -> String {
    format!("{}/datasets/{}", endpoint.trim_end_matches('/'), id)
}

/// Keeps datasets that carry `code` and are not massively multilingual.
pub fn keep_for_language(record: &DatasetRecord, code: &str, max_languages: usize) -> bool {
    record.languages.iter().any(|language| language == code)
        && record.languages.len() <= max_languages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn classify_tags_splits_known_prefixes_in_order() {
        let breakdown = classify_tags(&tags(&[
            "language:ko",
            "task_categories:text-generation",
            "license:mit",
            "language:en",
            "size_categories:1K<n<10K",
        ]));
        assert_eq!(breakdown.languages, vec!["ko", "en"]);
        assert_eq!(breakdown.tasks, vec!["text-generation"]);
        assert_eq!(breakdown.size_categories, vec!["1K<n<10K"]);
    }

    #[test]
    fn keep_for_language_requires_code_and_bounded_language_count() {
        let mut record = DatasetRecord {
            id: "org/set".to_string(),
            author: None,
            created_at: None,
            last_modified: None,
            downloads: 0,
            likes: 0,
            tags: Vec::new(),
            description: None,
            url: String::new(),
            languages: vec!["en".to_string()],
            tasks: Vec::new(),
            size_categories: Vec::new(),
        };
        assert!(!keep_for_language(&record, "ko", 100));

        record.languages.push("ko".to_string());
        assert!(keep_for_language(&record, "ko", 100));
        assert!(keep_for_language(&record, "ko", 2));
        assert!(!keep_for_language(&record, "ko", 1));
    }

    #[test]
    fn old_snapshot_records_tolerate_missing_fields() {
        let record: DatasetRecord =
            serde_json::from_str(r#"{"id": "a/b", "description": null}"#).unwrap();
        assert_eq!(record.downloads, 0);
        assert!(record.description.is_none());
        assert!(record.tags.is_empty());
    }

    #[test]
    fn dataset_url_joins_without_double_slash() {
        assert_eq!(
            dataset_url("https://huggingface.co/", "org/set"),
            "https://huggingface.co/datasets/org/set"
        );
    }
}
