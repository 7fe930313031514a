use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::LINK;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Tunables;
use crate::error::HubsnapError;
use crate::record::{DatasetRecord, classify_tags, dataset_url};

const USER_AGENT: &str = concat!("hubsnap/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Thin client over the hub's public REST API.
#[derive(Debug, Clone)]
pub struct HubClient {
    client: Client,
    tunables: Tunables,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HubDatasetPayload {
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    last_modified: Option<String>,
    #[serde(default)]
    downloads: Option<u64>,
    #[serde(default)]
    likes: Option<u64>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    description: Option<String>,
}

impl HubDatasetPayload {
    fn into_record(self, endpoint: &str) -> DatasetRecord {
        let breakdown = classify_tags(&self.tags);
        DatasetRecord {
            url: dataset_url(endpoint, &self.id),
            id: self.id,
            author: self.author,
            created_at: self.created_at,
            last_modified: self.last_modified,
            downloads: self.downloads.unwrap_or(0),
            likes: self.likes.unwrap_or(0),
            tags: self.tags,
            description: self.description,
            languages: breakdown.languages,
            tasks: breakdown.tasks,
            size_categories: breakdown.size_categories,
        }
    }
}

impl HubClient {
    pub fn new(tunables: &Tunables) -> Result<Self, HubsnapError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            tunables: tunables.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.tunables.hub_endpoint
    }

    /// Lists every dataset tagged `language:{code}`, following pagination.
    ///
    /// Records that fail to decode are logged and skipped.
    pub async fn list_datasets(&self, language: &str) -> Result<Vec<DatasetRecord>, HubsnapError> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        self.list_datasets_with(language, &spinner).await
    }

    /// Runs the listing against `spinner`, which is cleared on every exit path.
    pub(crate) async fn list_datasets_with(
        &self,
        language: &str,
        spinner: &ProgressBar,
    ) -> Result<Vec<DatasetRecord>, HubsnapError> {
        let result = self.list_pages(language, spinner).await;
        spinner.finish_and_clear();
        result
    }

    async fn list_pages(
        &self,
        language: &str,
        spinner: &ProgressBar,
    ) -> Result<Vec<DatasetRecord>, HubsnapError> {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut page = 0usize;
        let first_url = format!("{}/api/datasets", self.endpoint());
        let first_query = [
            ("filter", format!("language:{language}")),
            ("full", "true".to_string()),
            ("limit", self.tunables.page_limit.to_string()),
        ];

        let mut next_url: Option<String> = None;
        loop {
            page += 1;
            let response = match &next_url {
                None => {
                    self.send_with_retries("list datasets", || {
                        self.authorized(self.client.get(&first_url).query(&first_query))
                    })
                    .await?
                }
                Some(url) => {
                    self.send_with_retries("list datasets", || {
                        self.authorized(self.client.get(url))
                    })
                    .await?
                }
            };

            if !response.status().is_success() {
                return Err(HubsnapError::message(format!(
                    "hub responded with {} while listing datasets",
                    response.status()
                )));
            }

            next_url = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_next_link);

            let items: Vec<Value> = response.json().await?;
            debug!(page, items = items.len(), "dataset page received");
            for item in items {
                let id = item
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or("<unknown>")
                    .to_string();
                match serde_json::from_value::<HubDatasetPayload>(item) {
                    Ok(payload) => records.push(payload.into_record(self.endpoint())),
                    Err(err) => {
                        skipped += 1;
                        warn!(id = %id, error = %err, "skipping dataset that failed to decode");
                    }
                }
            }
            spinner.set_message(format!("{} datasets listed ({} pages)", records.len(), page));

            if next_url.is_none() {
                break;
            }
        }

        info!(
            language,
            count = records.len(),
            skipped,
            pages = page,
            "dataset listing complete"
        );
        Ok(records)
    }

    /// Fetches a dataset README over HTTP; a missing file yields `None`.
    pub async fn fetch_raw_readme(&self, dataset_id: &str) -> Result<Option<String>, HubsnapError> {
        let url = format!(
            "{}/datasets/{}/raw/main/README.md",
            self.endpoint(),
            dataset_id
        );
        let response = self
            .send_with_retries("fetch README", || self.authorized(self.client.get(&url)))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.text().await?)),
            _ => Err(response.error_for_status().err().map_or_else(
                || HubsnapError::message(format!("unexpected response for {dataset_id}")),
                HubsnapError::Http,
            )),
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.tunables.hub_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_with_retries<F>(&self, label: &str, build: F) -> Result<Response, HubsnapError>
    where
        F: Fn() -> RequestBuilder,
    {
        let max = self.tunables.max_retries.max(1);
        let backoff = Duration::from_millis(self.tunables.retry_backoff_ms);
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let outcome = build().send().await;
            let retryable = match &outcome {
                Ok(response) => is_retryable_status(response.status()),
                Err(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            };

            if !retryable {
                return outcome.map_err(HubsnapError::from);
            }

            if attempt >= max {
                return match outcome {
                    Ok(response) => Ok(response),
                    Err(err) => Err(HubsnapError::Message(format!(
                        "{} request failed after {} attempts: {}",
                        label, attempt, err
                    ))),
                };
            }

            warn!(label, attempt, "retrying hub request");
            sleep(backoff).await;
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Extracts the `rel="next"` target from an RFC 8288 `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .map(str::to_string)
    })
}
