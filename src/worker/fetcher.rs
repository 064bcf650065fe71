use std::future::Future;

use anyhow::Result;
use reqwest::Client;
use thiserror::Error;

/// HTTP request timeout in seconds.
/// 30s tolerates slow static hosts while still failing fast enough.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A network fetch that rejected outright, before any status was obtained.
#[derive(Error, Debug)]
#[error("network fetch failed for {url}: {reason}")]
pub struct FetchError {
    pub url: String,
    pub reason: String,
}

/// A fully buffered network response.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network seam for the worker. The worker only ever issues GETs through
/// this; everything else bypasses it entirely.
pub trait Fetcher: Send + Sync {
    /// Issue a GET for `url`. An `Err` means the request rejected with no
    /// status at all; a resolved non-2xx response is an `Ok`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedResponse, FetchError>> + Send;
}

/// `Fetcher` backed by reqwest, resolving the site's relative asset URLs
/// against a fixed origin.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    origin: String,
}

impl HttpFetcher {
    pub fn new(origin: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a manifest-style relative URL against the origin. Absolute
    /// URLs pass through unchanged.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if let Some(rest) = url.strip_prefix("./") {
            format!("{}/{}", self.origin, rest)
        } else if let Some(rest) = url.strip_prefix('/') {
            format!("{}/{}", self.origin, rest)
        } else {
            format!("{}/{}", self.origin, url)
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        let resolved = self.resolve(url);

        let response = self
            .client
            .get(&resolved)
            .send()
            .await
            .map_err(|e| FetchError {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError {
                url: url.to_string(),
                reason: e.to_string(),
            })?
            .to_vec();

        Ok(FetchedResponse {
            status,
            headers,
            body,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
