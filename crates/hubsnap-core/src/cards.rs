//! Dataset card (README) collection.
//!
//! Cards are fetched one dataset at a time through a [`CardSource`], split into
//! YAML front matter and markdown body, and written to a CSV with one row per
//! requested dataset. A failed fetch still produces a row.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::archive::write_atomic;
use crate::error::HubsnapError;
use crate::hub::HubClient;

const EMPTY_METADATA: &str = "{}";
const FRONT_MATTER_FENCE: &str = "---\n";
const README_FILE: &str = "README.md";
const ID_COLUMN: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedCard {
    /// Front matter re-encoded as a JSON object string.
    pub yaml_metadata: String,
    pub markdown_content: Option<String>,
}

impl ParsedCard {
    fn empty() -> Self {
        Self {
            yaml_metadata: EMPTY_METADATA.to_string(),
            markdown_content: None,
        }
    }
}

pub fn parse_dataset_card(card: Option<&str>) -> ParsedCard {
    let Some(card) = card else {
        return ParsedCard::empty();
    };

    let normalized = card.replace("\r\n", "\n");
    let Some((yaml, body)) = split_front_matter(&normalized) else {
        return ParsedCard {
            yaml_metadata: EMPTY_METADATA.to_string(),
            markdown_content: Some(normalized.trim().to_string()),
        };
    };

    match yaml_to_json(yaml) {
        Ok(metadata) => ParsedCard {
            yaml_metadata: metadata,
            markdown_content: Some(body.trim().to_string()),
        },
        Err(err) => {
            warn!(error = %err, "failed to parse card front matter");
            ParsedCard {
                yaml_metadata: EMPTY_METADATA.to_string(),
                markdown_content: Some(normalized.trim().to_string()),
            }
        }
    }
}

/// Splits a card that opens with a `---` fence into (front matter, body).
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix(FRONT_MATTER_FENCE)?;
    if let Some(body) = rest.strip_prefix(FRONT_MATTER_FENCE) {
        return Some(("", body));
    }
    if let Some(index) = rest.find("\n---\n") {
        return Some((&rest[..=index], &rest[index + 5..]));
    }
    rest.strip_suffix("\n---").map(|yaml| (yaml, ""))
}

fn yaml_to_json(yaml: &str) -> Result<String, HubsnapError> {
    if yaml.trim().is_empty() {
        return Ok(EMPTY_METADATA.to_string());
    }
    let value: Value = serde_yaml::from_str(yaml)?;
    if value.is_null() {
        return Ok(EMPTY_METADATA.to_string());
    }
    Ok(serde_json::to_string(&value)?)
}

/// Somewhere a dataset README can be read from.
#[allow(async_fn_in_trait)]
pub trait CardSource {
    /// Returns the README text, or `None` when the dataset has no README.
    async fn fetch_readme(&self, dataset_id: &str) -> Result<Option<String>, HubsnapError>;
}

/// Fetches only `README.md` through a sparse git checkout per dataset.
#[derive(Debug, Clone)]
pub struct GitSparseSource {
    workdir: PathBuf,
    endpoint: String,
    username: Option<String>,
    token: Option<String>,
}

impl GitSparseSource {
    pub fn new(
        workdir: impl Into<PathBuf>,
        endpoint: impl Into<String>,
        username: Option<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            endpoint: endpoint.into(),
            username,
            token,
        }
    }

    pub fn scratch_dir(&self, dataset_id: &str) -> PathBuf {
        self.workdir.join(dataset_id.replace('/', "_"))
    }

    pub fn remote_url(&self, dataset_id: &str) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        let (scheme, host) = endpoint
            .split_once("://")
            .unwrap_or(("https", endpoint));
        match (&self.username, &self.token) {
            (Some(user), Some(token)) => format!(
                "{scheme}://{}:{}@{host}/datasets/{dataset_id}",
                urlencoding::encode(user),
                urlencoding::encode(token)
            ),
            (None, Some(token)) => format!(
                "{scheme}://user:{}@{host}/datasets/{dataset_id}",
                urlencoding::encode(token)
            ),
            _ => format!("{scheme}://{host}/datasets/{dataset_id}"),
        }
    }

    async fn checkout_readme(
        &self,
        dataset_id: &str,
        scratch: &Path,
    ) -> Result<Option<String>, HubsnapError> {
        let remote = self.remote_url(dataset_id);
        self.git(scratch, &["init", "--quiet"]).await?;
        self.git(scratch, &["remote", "add", "origin", &remote]).await?;
        self.git(scratch, &["sparse-checkout", "init"]).await?;
        self.git(scratch, &["sparse-checkout", "set", README_FILE]).await?;
        self.git(scratch, &["fetch", "--quiet", "--depth=1", "origin", "main"])
            .await?;
        self.git(scratch, &["checkout", "--quiet", "origin/main"]).await?;

        let readme = scratch.join(README_FILE);
        if !readme.exists() {
            info!(dataset = dataset_id, "no README.md in dataset repository");
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(readme)?))
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<(), HubsnapError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(HubsnapError::Git {
            command: self.redact(&args.join(" ")),
            stderr: self.redact(stderr.trim()),
        })
    }

    fn redact(&self, text: &str) -> String {
        match &self.token {
            Some(token) if !token.is_empty() => text
                .replace(urlencoding::encode(token).as_ref(), "***")
                .replace(token.as_str(), "***"),
            _ => text.to_string(),
        }
    }
}

impl CardSource for GitSparseSource {
    async fn fetch_readme(&self, dataset_id: &str) -> Result<Option<String>, HubsnapError> {
        let scratch = self.scratch_dir(dataset_id);
        if scratch.exists() {
            fs::remove_dir_all(&scratch)?;
        }
        fs::create_dir_all(&scratch)?;

        let result = self.checkout_readme(dataset_id, &scratch).await;

        if let Err(err) = fs::remove_dir_all(&scratch) {
            warn!(path = %scratch.display(), error = %err, "failed to remove scratch checkout");
        }
        result
    }
}

/// Reads `README.md` from the hub's raw file endpoint.
#[derive(Debug, Clone)]
pub struct HttpRawSource {
    client: HubClient,
}

impl HttpRawSource {
    pub fn new(client: HubClient) -> Self {
        Self { client }
    }
}

impl CardSource for HttpRawSource {
    async fn fetch_readme(&self, dataset_id: &str) -> Result<Option<String>, HubsnapError> {
        self.client.fetch_raw_readme(dataset_id).await
    }
}

#[derive(Debug, Clone)]
pub struct CardOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub delay: Duration,
}

impl CardOptions {
    /// Default input and output names for a language code.
    pub fn for_language(language: &str) -> Self {
        Self {
            input: PathBuf::from(format!("huggingface_datasets_{language}.csv")),
            output: PathBuf::from("Data").join(format!("dataset_cards_{language}.csv")),
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Serialize)]
struct CardRow<'a> {
    dataset_id: &'a str,
    yaml_metadata: &'a str,
    markdown_content: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardRunSummary {
    pub total: usize,
    pub with_readme: usize,
    pub failed: usize,
}

pub fn read_dataset_ids(path: &Path) -> Result<Vec<String>, HubsnapError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let Some(column) = headers
        .iter()
        .position(|header| header.trim_start_matches('\u{feff}').trim() == ID_COLUMN)
    else {
        return Err(HubsnapError::message(format!(
            "{} has no `{}` column",
            path.display(),
            ID_COLUMN
        )));
    };

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(id) = record.get(column).map(str::trim).filter(|id| !id.is_empty()) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

/// Fetches and parses the card of every dataset listed in `options.input`.
pub async fn collect_cards<S: CardSource>(
    source: &S,
    options: &CardOptions,
) -> Result<CardRunSummary, HubsnapError> {
    let ids = read_dataset_ids(&options.input)?;
    info!(
        input = %options.input.display(),
        output = %options.output.display(),
        count = ids.len(),
        "collecting dataset cards"
    );

    let progress = ProgressBar::new(ids.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    progress.set_message("Fetching dataset cards");

    let mut summary = CardRunSummary {
        total: ids.len(),
        ..CardRunSummary::default()
    };
    let mut cards = Vec::with_capacity(ids.len());

    for (index, id) in ids.iter().enumerate() {
        let parsed = match source.fetch_readme(id).await {
            Ok(Some(text)) => {
                summary.with_readme += 1;
                parse_dataset_card(Some(text.as_str()))
            }
            Ok(None) => parse_dataset_card(None),
            Err(err) => {
                summary.failed += 1;
                if err.is_access_denied() {
                    warn!(dataset = %id, "access denied (403)");
                } else {
                    warn!(dataset = %id, error = %err, "failed to fetch dataset card");
                }
                ParsedCard::empty()
            }
        };
        cards.push(parsed);
        progress.inc(1);

        if index + 1 < ids.len() && !options.delay.is_zero() {
            sleep(options.delay).await;
        }
    }
    progress.finish_and_clear();

    write_cards_csv(&options.output, &ids, &cards)?;
    info!(
        path = %options.output.display(),
        total = summary.total,
        with_readme = summary.with_readme,
        failed = summary.failed,
        "dataset cards written"
    );
    Ok(summary)
}

fn write_cards_csv(path: &Path, ids: &[String], cards: &[ParsedCard]) -> Result<(), HubsnapError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for (id, card) in ids.iter().zip(cards) {
        writer.serialize(CardRow {
            dataset_id: id,
            yaml_metadata: &card.yaml_metadata,
            markdown_content: card.markdown_content.as_deref(),
        })?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|err| HubsnapError::message(format!("failed to flush CSV buffer: {err}")))?;
    write_atomic(path, &buffer)
}
