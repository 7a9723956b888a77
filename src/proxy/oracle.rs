//! Address-echo oracle used to judge what a proxy reveals

use crate::proxy::error::ProbeError;
use crate::proxy::models::Candidate;
use async_trait::async_trait;
use reqwest::{Client, Proxy as ReqwestProxy};
use std::time::Duration;

/// Default address-echo endpoint
pub const DEFAULT_ORACLE_URL: &str = "http://ident.me";

/// Default connect/handshake timeout
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Default total timeout for one oracle query
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Something that echoes back the caller's apparent public address
#[async_trait]
pub trait AddressOracle: Send + Sync + 'static {
    /// Our own address, queried directly without any proxy
    async fn baseline(&self) -> Result<String, ProbeError>;

    /// The address the oracle sees when queried through `candidate`
    async fn probe(&self, candidate: &Candidate) -> Result<String, ProbeError>;
}

/// Plain-text oracle reached over HTTP with reqwest
#[derive(Debug, Clone)]
pub struct IdentOracle {
    url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl Default for IdentOracle {
    fn default() -> Self {
        Self {
            url: DEFAULT_ORACLE_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl IdentOracle {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn builder(&self) -> reqwest::ClientBuilder {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
    }

    /// Client routed through the candidate, honoring its declared transport
    fn create_client(&self, candidate: &Candidate) -> Result<Client, ProbeError> {
        let proxy_url = candidate.url();
        let construction = |reason: String| ProbeError::TransportConstruction {
            proxy: proxy_url.clone(),
            reason,
        };

        // Proxy::all so an https oracle is routed through the candidate as well
        let reqwest_proxy =
            ReqwestProxy::all(&proxy_url).map_err(|e| construction(e.to_string()))?;

        self.builder()
            .proxy(reqwest_proxy)
            .build()
            .map_err(|e| construction(e.to_string()))
    }

    async fn fetch(&self, client: &Client) -> Result<String, ProbeError> {
        let request = async {
            let response = client.get(&self.url).send().await?.error_for_status()?;
            response.text().await
        };

        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(Ok(body)) => Ok(body.trim().to_string()),
            Ok(Err(e)) if e.is_timeout() => Err(ProbeError::Timeout(self.request_timeout)),
            Ok(Err(e)) => Err(ProbeError::unreachable(e)),
            Err(_) => Err(ProbeError::Timeout(self.request_timeout)),
        }
    }
}

#[async_trait]
impl AddressOracle for IdentOracle {
    async fn baseline(&self) -> Result<String, ProbeError> {
        let client = self
            .builder()
            .no_proxy()
            .build()
            .map_err(|e| ProbeError::TransportConstruction {
                proxy: "direct".to_string(),
                reason: e.to_string(),
            })?;

        self.fetch(&client).await
    }

    async fn probe(&self, candidate: &Candidate) -> Result<String, ProbeError> {
        let client = self.create_client(candidate)?;
        self.fetch(&client).await
    }
}
