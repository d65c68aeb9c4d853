//! Retrieval of API payloads.

use std::time::Duration;

use reqwest::Url;

use crate::error::FetchError;

const USER_AGENT: &str = concat!("wikicheck/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of raw API responses. Retries and deadlines belong here, not in
/// the checker.
pub trait PageFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

impl<T: PageFetcher + ?Sized> PageFetcher for &T {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        (**self).fetch(url)
    }
}

/// Blocking HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::with_source("failed to build HTTP client", e))?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| FetchError::with_source("request failed", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(format!("server answered {status}")));
        }
        response
            .text()
            .map_err(|e| FetchError::with_source("failed to read response body", e))
    }
}
