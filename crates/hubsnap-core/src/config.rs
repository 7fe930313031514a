use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::HubsnapError;

pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_DATA_DIR: &str = "docs/data";
pub const DEFAULT_CARD_WORKDIR: &str = "dataset_repo";
pub const DEFAULT_LANGUAGE: &str = "ko";
pub const DEFAULT_CARD_LANGUAGE: &str = "ja";

const DEFAULT_PAGE_LIMIT: u32 = 1_000;
const DEFAULT_MAX_LANGUAGES: usize = 100;
const DEFAULT_TOP_N: usize = 10;
const DEFAULT_CHANGELOG_LIMIT: usize = 50;
const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1_000;
const DEFAULT_CARD_DELAY_MS: u64 = 1_000;

/// Environment-driven knobs shared by every job.
#[derive(Debug, Clone)]
pub struct Tunables {
    pub hub_endpoint: String,
    pub hub_token: Option<String>,
    pub hub_username: Option<String>,
    pub page_limit: u32,
    pub max_languages: usize,
    pub top_n: usize,
    pub changelog_limit: usize,
    pub max_retries: usize,
    pub retry_backoff_ms: u64,
    pub card_delay_ms: u64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            hub_endpoint: DEFAULT_HUB_ENDPOINT.to_string(),
            hub_token: None,
            hub_username: None,
            page_limit: DEFAULT_PAGE_LIMIT,
            max_languages: DEFAULT_MAX_LANGUAGES,
            top_n: DEFAULT_TOP_N,
            changelog_limit: DEFAULT_CHANGELOG_LIMIT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            card_delay_ms: DEFAULT_CARD_DELAY_MS,
        }
    }
}

impl Tunables {
    pub fn from_env() -> Result<Self, HubsnapError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds tunables from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HubsnapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hub_endpoint = lookup("HF_ENDPOINT")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_HUB_ENDPOINT.to_string());
        let hub_token = lookup("HF_TOKEN").filter(|value| !value.trim().is_empty());
        let hub_username = lookup("HF_USERNAME").filter(|value| !value.trim().is_empty());

        Ok(Self {
            hub_endpoint,
            hub_token,
            hub_username,
            page_limit: parse_var(&lookup, "HUBSNAP_PAGE_LIMIT", DEFAULT_PAGE_LIMIT)?,
            max_languages: parse_var(&lookup, "HUBSNAP_MAX_LANGUAGES", DEFAULT_MAX_LANGUAGES)?,
            top_n: parse_var(&lookup, "HUBSNAP_TOP_N", DEFAULT_TOP_N)?,
            changelog_limit: parse_var(
                &lookup,
                "HUBSNAP_CHANGELOG_LIMIT",
                DEFAULT_CHANGELOG_LIMIT,
            )?,
            max_retries: parse_var(&lookup, "HUBSNAP_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_backoff_ms: parse_var(
                &lookup,
                "HUBSNAP_RETRY_BACKOFF_MS",
                DEFAULT_RETRY_BACKOFF_MS,
            )?,
            card_delay_ms: parse_var(&lookup, "HUBSNAP_CARD_DELAY_MS", DEFAULT_CARD_DELAY_MS)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T, HubsnapError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(value) => value.trim().parse::<T>().map_err(|err| {
            HubsnapError::Config(format!("invalid value for {}: {}", var, err))
        }),
        None => Ok(default),
    }
}

/// Human-readable name used for default file stems.
pub fn language_name(code: &str) -> &str {
    match code {
        "ko" => "korean",
        "ja" => "japanese",
        "zh" => "chinese",
        "en" => "english",
        "fr" => "french",
        "de" => "german",
        "es" => "spanish",
        "vi" => "vietnamese",
        "th" => "thai",
        other => other,
    }
}

/// Default snapshot stem, e.g. `korean_datasets` for `ko`.
pub fn default_stem(code: &str) -> String {
    format!("{}_datasets", language_name(code))
}

/// Expands `~` and returns the path unchanged otherwise.
pub fn resolve_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

pub fn ensure_parent_directory(path: &Path) -> Result<(), HubsnapError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
