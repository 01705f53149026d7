use crate::fetcher::FetchSubscription;
use crate::normalizer::{NameCounter, Normalizer};
use futures::stream::{self, StreamExt};
use serde_yaml::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

const MAX_CONCURRENT_FETCHES: usize = 32;

/// Orchestrates the two-phase pipeline: a concurrent fan-out of subscription
/// fetches followed by a strictly sequential normalization pass.
///
/// The sequential phase always walks results in source-declaration order, so
/// the assigned names are reproducible no matter how the network races.
/// Nothing mutable is shared during the fan-out; the name counter and the
/// output list only exist in the reduce phase.
pub struct Aggregator {
    fetcher: Arc<dyn FetchSubscription>,
    normalizer: Normalizer,
    sources: Vec<String>,
    url_template: String,
}

impl Aggregator {
    pub fn new(
        fetcher: Arc<dyn FetchSubscription>,
        normalizer: Normalizer,
        sources: Vec<String>,
        url_template: String,
    ) -> Self {
        Self {
            fetcher,
            normalizer,
            sources,
            url_template,
        }
    }

    /// Resolve a configured source to a fetch URL. Full http(s) URLs pass
    /// through; anything else is treated as a token for the URL template.
    /// Blank sources and sources that resolve to an unparseable URL are
    /// dropped.
    fn resolve_url(&self, source: &str) -> Option<String> {
        let source = source.trim();
        if source.is_empty() {
            return None;
        }

        let resolved = if source.starts_with("http://") || source.starts_with("https://") {
            source.to_string()
        } else {
            self.url_template.replace("{token}", source)
        };

        match Url::parse(&resolved) {
            Ok(_) => Some(resolved),
            Err(e) => {
                warn!("Skipping source {:?}: resolved URL is invalid: {}", source, e);
                None
            }
        }
    }

    /// Fetch every configured source and return the accepted, renamed
    /// entries for this request.
    pub async fn collect_entries(&self) -> Vec<Value> {
        let urls: Vec<String> = self
            .sources
            .iter()
            .filter_map(|s| self.resolve_url(s))
            .collect();

        if urls.is_empty() {
            return Vec::new();
        }

        let concurrency = urls.len().min(MAX_CONCURRENT_FETCHES).max(1);
        debug!("Fetching {} subscriptions with concurrency {}", urls.len(), concurrency);

        // Fan-out: results arrive in completion order, keyed by source index.
        let mut results: Vec<(usize, Option<Value>)> = stream::iter(urls.into_iter().enumerate())
            .map(|(index, url)| {
                let fetcher = self.fetcher.clone();
                async move { (index, fetcher.fetch_document(&url).await) }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        // Reduce: restore declaration order before any naming state is touched.
        results.sort_by_key(|(index, _)| *index);

        let mut counter = NameCounter::new();
        let mut entries = Vec::new();

        for (_, doc) in results {
            if let Some(doc) = doc {
                entries.extend(self.normalizer.normalize(&doc, &mut counter));
            }
        }

        info!("Aggregated {} proxies from {} configured sources", entries.len(), self.sources.len());
        entries
    }
}
