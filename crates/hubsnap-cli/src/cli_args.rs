use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use hubsnap_core::config::{
    self, DEFAULT_CARD_LANGUAGE, DEFAULT_CARD_WORKDIR, DEFAULT_DATA_DIR, DEFAULT_LANGUAGE,
    Tunables,
};
use hubsnap_core::{ArchiveLayout, CardOptions, CardSourceKind, CollectOptions};

/// Top-level CLI entrypoint.
#[derive(Parser, Debug, Clone)]
#[command(version, about = "Track a hub's dataset catalog through dated snapshots")]
pub struct Cli {
    /// Log to stderr only instead of also writing the persistent log file.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub stderr_only: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List datasets for a language and archive a dated snapshot.
    Collect(CollectArgs),
    /// Compare the two most recent snapshot archives.
    Changelog(ChangelogArgs),
    /// Fold archived statistics into trend series.
    Trends(TrendsArgs),
    /// Fetch README dataset cards for the datasets in a CSV.
    Cards(CardsArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CollectArgs {
    /// Language code to collect (matches `language:<code>` tags).
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub lang: String,

    /// Directory holding the latest files and the `archive/` folder.
    #[arg(long, default_value = DEFAULT_DATA_DIR, value_hint = ValueHint::DirPath)]
    pub data_dir: String,

    /// File stem for snapshot files (defaults to `<language>_datasets`).
    #[arg(long)]
    pub stem: Option<String>,

    /// Skip datasets tagged with more languages than this.
    #[arg(long, value_name = "N")]
    pub max_languages: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct ChangelogArgs {
    #[arg(long, default_value = DEFAULT_DATA_DIR, value_hint = ValueHint::DirPath)]
    pub data_dir: String,

    /// Snapshot file stem to compare.
    #[arg(long)]
    pub stem: Option<String>,

    /// Language used to derive the default stem.
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub lang: String,

    /// Maximum number of updated datasets to keep.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct TrendsArgs {
    #[arg(long, default_value = DEFAULT_DATA_DIR, value_hint = ValueHint::DirPath)]
    pub data_dir: String,

    /// Snapshot file stem whose statistics are folded.
    #[arg(long)]
    pub stem: Option<String>,

    /// Language used to derive the default stem.
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub lang: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Git,
    Http,
}

impl From<SourceArg> for CardSourceKind {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Git => CardSourceKind::Git,
            SourceArg::Http => CardSourceKind::Http,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct CardsArgs {
    /// Language code (e.g. ja, zh, ko).
    #[arg(long, default_value = DEFAULT_CARD_LANGUAGE)]
    pub lang: String,

    /// CSV with an `id` column (defaults to `huggingface_datasets_<lang>.csv`).
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub input: Option<String>,

    /// Output CSV (defaults to `Data/dataset_cards_<lang>.csv`).
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub output: Option<String>,

    /// Scratch directory for sparse checkouts.
    #[arg(long, default_value = DEFAULT_CARD_WORKDIR, value_hint = ValueHint::DirPath)]
    pub workdir: String,

    #[arg(long, value_enum, default_value_t = SourceArg::Git)]
    pub source: SourceArg,

    /// Pause between datasets in milliseconds.
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,
}

impl CollectArgs {
    pub fn to_options(&self, tunables: &Tunables) -> CollectOptions {
        let stem = self
            .stem
            .clone()
            .unwrap_or_else(|| config::default_stem(&self.lang));
        CollectOptions {
            language: self.lang.clone(),
            layout: ArchiveLayout::new(config::resolve_path(&self.data_dir), stem),
            max_languages: self.max_languages.unwrap_or(tunables.max_languages),
            top_n: tunables.top_n,
        }
    }
}

impl ChangelogArgs {
    pub fn layout(&self) -> ArchiveLayout {
        let stem = self
            .stem
            .clone()
            .unwrap_or_else(|| config::default_stem(&self.lang));
        ArchiveLayout::new(config::resolve_path(&self.data_dir), stem)
    }

    pub fn limit(&self, tunables: &Tunables) -> usize {
        self.limit.unwrap_or(tunables.changelog_limit)
    }
}

impl TrendsArgs {
    pub fn layout(&self) -> ArchiveLayout {
        let stem = self
            .stem
            .clone()
            .unwrap_or_else(|| config::default_stem(&self.lang));
        ArchiveLayout::new(config::resolve_path(&self.data_dir), stem)
    }
}

impl CardsArgs {
    pub fn to_options(&self, tunables: &Tunables) -> CardOptions {
        let mut options = CardOptions::for_language(&self.lang);
        if let Some(input) = &self.input {
            options.input = config::resolve_path(input);
        }
        if let Some(output) = &self.output {
            options.output = config::resolve_path(output);
        }
        options.delay = Duration::from_millis(self.delay_ms.unwrap_or(tunables.card_delay_ms));
        options
    }
}
