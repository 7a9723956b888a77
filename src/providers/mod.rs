//! Harvesters that collect raw candidates from provider pages and files
//!
//! A harvester never fails a run: its errors are logged and it simply
//! contributes no candidates.

pub mod crawler;
pub mod sources;

pub use crawler::{read_crawl_proxies, HarvesterConfig};
pub use sources::{FileSource, MyProxySource, ProxyListPlusSource, TextListSource};

use crate::proxy::models::Candidate;
use crate::Result;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A source of raw candidates
#[async_trait]
pub trait Harvester: Send + Sync {
    fn name(&self) -> &str;

    async fn harvest(&self, client: &Client) -> Result<Vec<Candidate>>;
}

/// Result of harvesting a single source
#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// The source that was harvested
    pub source: String,
    /// Candidates the source yielded
    pub candidates: Vec<Candidate>,
    /// Error message if harvesting failed
    pub error: Option<String>,
}

impl HarvestReport {
    pub fn success(source: String, candidates: Vec<Candidate>) -> Self {
        Self {
            source,
            candidates,
            error: None,
        }
    }

    pub fn failure(source: String, error: String) -> Self {
        Self {
            source,
            candidates: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// The set of harvesters used for one run
#[derive(Default)]
pub struct ProviderRegistry {
    config: HarvesterConfig,
    harvesters: Vec<Box<dyn Harvester>>,
}

impl ProviderRegistry {
    pub fn new(config: HarvesterConfig) -> Self {
        Self {
            config,
            harvesters: Vec::new(),
        }
    }

    /// Registry preloaded with the built-in provider pages
    pub fn with_defaults(config: HarvesterConfig) -> Self {
        Self::new(config)
            .with(MyProxySource::socks5())
            .with(MyProxySource::elite_http())
            .with(ProxyListPlusSource::socks_list(1))
            .with(ProxyListPlusSource::socks_list(2))
    }

    pub fn with<H: Harvester + 'static>(mut self, harvester: H) -> Self {
        self.register(harvester);
        self
    }

    pub fn register<H: Harvester + 'static>(&mut self, harvester: H) {
        self.harvesters.push(Box::new(harvester));
    }

    pub fn len(&self) -> usize {
        self.harvesters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.harvesters.is_empty()
    }

    /// Run every harvester concurrently, one report per harvester
    ///
    /// Harvesters still running when `cancel` fires report a failure.
    pub async fn harvest_all(&self, cancel: &CancellationToken) -> Vec<HarvestReport> {
        let clients = match self.config.build_clients() {
            Ok(clients) => clients,
            Err(e) => {
                warn!(error = %e, "Cannot build crawl clients, skipping every source");
                return self
                    .harvesters
                    .iter()
                    .map(|h| HarvestReport::failure(h.name().to_string(), e.to_string()))
                    .collect();
            }
        };

        let tasks = self.harvesters.iter().enumerate().map(|(i, harvester)| {
            let client = &clients[i % clients.len()];
            async move {
                let source = harvester.name().to_string();
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(anyhow::anyhow!("harvest cancelled")),
                    result = harvester.harvest(client) => result,
                };
                match result {
                    Ok(candidates) => {
                        info!(source = %source, found = candidates.len(), "Harvested source");
                        HarvestReport::success(source, candidates)
                    }
                    Err(e) => {
                        warn!(source = %source, error = %e, "Harvesting failed");
                        HarvestReport::failure(source, e.to_string())
                    }
                }
            }
        });

        join_all(tasks).await
    }
}
