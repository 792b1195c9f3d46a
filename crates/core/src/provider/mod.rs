//! Torrent indexer providers.
//!
//! Each provider is an independent [`Provider`] implementation that turns a
//! [`SearchQuery`] into one HTTP request, decodes the indexer's response and
//! classifies the candidates. Results and hash lookups are memoized in a
//! shared [`ProviderCache`].

mod apibay;
mod http;
pub mod query;
mod torrents_csv;
mod types;
mod ygg;

pub use apibay::{ApiBayProvider, APIBAY_NAME};
pub use torrents_csv::{TorrentsCsvProvider, TORRENTS_CSV_NAME};
pub use types::*;
pub use ygg::{YggProvider, YGG_NAME};

use std::sync::Arc;

use tracing::info;

use crate::classifier::Classifier;
use crate::config::ProvidersConfig;

/// Build every enabled provider from configuration.
pub fn build_providers(
    config: &ProvidersConfig,
    classifier: Arc<Classifier>,
) -> Result<Vec<Box<dyn Provider>>, ProviderError> {
    let mut providers: Vec<Box<dyn Provider>> = Vec::new();

    if config.apibay.enabled {
        providers.push(Box::new(ApiBayProvider::new(
            &config.apibay,
            Arc::clone(&classifier),
        )?));
    }
    if config.torrents_csv.enabled {
        providers.push(Box::new(TorrentsCsvProvider::new(
            &config.torrents_csv,
            Arc::clone(&classifier),
        )?));
    }
    if config.ygg.enabled {
        providers.push(Box::new(YggProvider::new(&config.ygg, classifier)?));
    }

    info!(
        providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
        "Providers configured"
    );
    Ok(providers)
}
