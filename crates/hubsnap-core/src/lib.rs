//! Snapshot tracking for a hub's dataset catalog: collection, card scraping,
//! week-over-week changelogs, and trend series.

pub mod archive;
pub mod cards;
pub mod changelog;
pub mod collect;
pub mod config;
pub mod error;
pub mod hub;
pub mod logging;
pub mod record;
pub mod stats;
pub mod trends;

use std::fs;
use std::path::PathBuf;

pub use archive::ArchiveLayout;
pub use cards::{CardOptions, CardRunSummary, CardSource, GitSparseSource, HttpRawSource};
pub use changelog::{Changelog, generate_changelog};
pub use collect::{CollectOptions, CollectOutcome, collect_datasets};
pub use config::Tunables;
pub use error::HubsnapError;
pub use hub::HubClient;
pub use logging::{LoggingDestination, init_logging};
pub use trends::{TrendData, generate_trends};

/// Where dataset cards are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardSourceKind {
    /// Sparse git checkout of `README.md` only.
    #[default]
    Git,
    /// The hub's raw file endpoint.
    Http,
}

pub async fn run_collect(
    options: &CollectOptions,
    tunables: &Tunables,
) -> Result<Option<CollectOutcome>, HubsnapError> {
    let client = HubClient::new(tunables)?;
    collect_datasets(&client, options).await
}

pub async fn run_cards(
    options: &CardOptions,
    kind: CardSourceKind,
    workdir: PathBuf,
    tunables: &Tunables,
) -> Result<CardRunSummary, HubsnapError> {
    match kind {
        CardSourceKind::Git => {
            fs::create_dir_all(&workdir)?;
            let source = GitSparseSource::new(
                workdir,
                tunables.hub_endpoint.clone(),
                tunables.hub_username.clone(),
                tunables.hub_token.clone(),
            );
            cards::collect_cards(&source, options).await
        }
        CardSourceKind::Http => {
            let source = HttpRawSource::new(HubClient::new(tunables)?);
            cards::collect_cards(&source, options).await
        }
    }
}
