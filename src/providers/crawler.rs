//! HTTP plumbing shared by the web harvesters
//!
//! This module provides functionality for:
//! - Building crawl clients, optionally routed through crawl proxies
//! - Fetching a provider page as text
//! - Extracting IP:PORT entries from arbitrary text

use crate::proxy::models::{Candidate, ProxyType};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Proxy as ReqwestProxy};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Regex pattern to match IP:PORT patterns in text
static IP_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d{1,5})\b")
        .expect("Invalid IP:PORT regex")
});

/// Configuration for harvesting
#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    /// Timeout for HTTP requests
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// Proxies to crawl providers through, assigned round-robin per source
    pub crawl_proxies: Vec<String>,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            crawl_proxies: Vec::new(),
        }
    }
}

impl HarvesterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_crawl_proxies(mut self, proxies: Vec<String>) -> Self {
        self.crawl_proxies = proxies;
        self
    }

    /// One client per usable crawl proxy, or a single direct client
    ///
    /// Crawl proxies reqwest cannot use are logged and skipped.
    pub fn build_clients(&self) -> Result<Vec<Client>> {
        let mut clients = Vec::with_capacity(self.crawl_proxies.len());
        for proxy in &self.crawl_proxies {
            match self.proxied_client(proxy) {
                Ok(client) => clients.push(client),
                Err(e) => warn!(proxy = %proxy, error = %e, "Skipping unusable crawl proxy"),
            }
        }

        if clients.is_empty() {
            if !self.crawl_proxies.is_empty() {
                warn!("No usable crawl proxy, crawling directly");
            }
            clients.push(self.client_builder().build()?);
        }
        Ok(clients)
    }

    fn proxied_client(&self, proxy: &str) -> Result<Client> {
        let client = self
            .client_builder()
            .proxy(ReqwestProxy::all(proxy)?)
            .build()?;
        Ok(client)
    }

    fn client_builder(&self) -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
    }
}

/// Read crawl proxies from a file, one URL per line
///
/// Blank lines and `#` comments are ignored.
pub fn read_crawl_proxies<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Fetch a page body as text, failing on non-success statuses
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Extract IP:PORT entries with regex pattern matching
pub fn extract_ip_ports(content: &str, proxy_type: ProxyType) -> Vec<Candidate> {
    IP_PORT_REGEX
        .captures_iter(content)
        .filter_map(|cap| {
            let host: Ipv4Addr = cap.get(1)?.as_str().parse().ok()?;
            let port: u16 = cap.get(2)?.as_str().parse().ok()?;
            if port == 0 {
                return None;
            }
            Some(Candidate::new(&host.to_string(), port, proxy_type))
        })
        .collect()
}
