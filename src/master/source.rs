//! Fetch boundaries for the reference-data flows.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

/// The exchange's published instrument file.
pub const DEFAULT_MASTER_URL: &str =
    "https://www.jpx.co.jp/markets/statistics-equities/misc/tvdivq0000001vg2-att/data_j.xls";

/// Public IPO listing page used for new-issue discovery.
pub const DEFAULT_LISTING_URL: &str = "https://c-eye.co.jp/ipo-list";

/// Yields the instrument file as an opaque byte stream. Parsing happens at
/// the CSV boundary in [`super::parse_master_csv`].
#[async_trait]
pub trait MasterFileSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// Yields the listing page as an HTML document.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch(&self) -> Result<String>;
}

fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")
}

/// Downloads the instrument file from the exchange.
pub struct HttpMasterSource {
    http: Client,
    url: String,
}

impl HttpMasterSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl MasterFileSource for HttpMasterSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Reads the instrument file from disk (the operator-exported CSV).
pub struct FileMasterSource {
    path: PathBuf,
}

impl FileMasterSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MasterFileSource for FileMasterSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read {:?}", self.path))
    }
}

/// Fetches the listing page over HTTP.
pub struct HttpListingSource {
    http: Client,
    url: String,
}

impl HttpListingSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch(&self) -> Result<String> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
