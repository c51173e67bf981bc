//! Remote catalog source adapter
//!
//! The feed lives on a content host behind three fixed download links: a
//! small version descriptor, the full product dataset, and a "changes"
//! document. The changes link has historically served the exact same full
//! dataset, so the `since` parameter is advisory only and nothing here
//! assumes the changes payload is smaller.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

const DEFAULT_VERSION_URL: &str =
    "https://drive.usercontent.google.com/uc?export=download&id=1mx0z2oAQvXZwc0BQKYKBngqzgyi69drK";
const DEFAULT_DATASET_URL: &str =
    "https://drive.usercontent.google.com/uc?export=download&id=1Q-cf5rP3iTufaejDVevBjeh5HKmQOvzn";

const DESCRIPTOR_TIMEOUT: Duration = Duration::from_secs(10);
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// The remote version descriptor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionDescriptor {
    pub version: String,
    /// Publication timestamp of the dataset (Unix ms)
    pub timestamp: i64,
    /// Advisory change count; not load-bearing for the sync decision
    #[serde(rename = "changes_count")]
    pub change_count: i64,
}

/// Trait for the remote catalog source
#[allow(async_fn_in_trait)]
pub trait RemoteCatalog {
    /// Fetch the version descriptor
    async fn fetch_version(&self) -> Result<VersionDescriptor>;

    /// Fetch the full product dataset document body
    async fn fetch_full(&self) -> Result<String>;

    /// Fetch the changes document body; `since` is advisory
    async fn fetch_changes_since(&self, since: i64) -> Result<String>;
}

/// HTTP implementation of `RemoteCatalog` over fixed GET URLs
pub struct HttpCatalogSource {
    client: reqwest::Client,
    version_url: String,
    dataset_url: String,
    changes_url: String,
}

impl HttpCatalogSource {
    /// Build a source from the default URLs, honoring the
    /// `PRICEBOOK_VERSION_URL` / `PRICEBOOK_DATASET_URL` /
    /// `PRICEBOOK_CHANGES_URL` environment overrides.
    pub fn from_env() -> Result<Self> {
        let version_url =
            env::var("PRICEBOOK_VERSION_URL").unwrap_or_else(|_| DEFAULT_VERSION_URL.to_string());
        let dataset_url =
            env::var("PRICEBOOK_DATASET_URL").unwrap_or_else(|_| DEFAULT_DATASET_URL.to_string());
        // The content host exposes no real delta endpoint; changes default
        // to the dataset link
        let changes_url =
            env::var("PRICEBOOK_CHANGES_URL").unwrap_or_else(|_| dataset_url.clone());

        Self::with_urls(version_url, dataset_url, changes_url)
    }

    /// Build a source against explicit URLs
    pub fn with_urls(
        version_url: impl Into<String>,
        dataset_url: impl Into<String>,
        changes_url: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(DESCRIPTOR_TIMEOUT)
            .timeout(DOCUMENT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            version_url: version_url.into(),
            dataset_url: dataset_url.into(),
            changes_url: changes_url.into(),
        })
    }

    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self.client.get(url).timeout(timeout).send().await?;

        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "HTTP {} from {url}",
                response.status().as_u16()
            )));
        }

        Ok(response.text().await?)
    }
}

impl RemoteCatalog for HttpCatalogSource {
    async fn fetch_version(&self) -> Result<VersionDescriptor> {
        let body = self.get_text(&self.version_url, DESCRIPTOR_TIMEOUT).await?;
        let descriptor: VersionDescriptor = serde_json::from_str(&body)?;
        Ok(descriptor)
    }

    async fn fetch_full(&self) -> Result<String> {
        self.get_text(&self.dataset_url, DOCUMENT_TIMEOUT).await
    }

    async fn fetch_changes_since(&self, since: i64) -> Result<String> {
        let url = with_since(&self.changes_url, since);
        self.get_text(&url, DOCUMENT_TIMEOUT).await
    }
}

/// Append the advisory `since` query parameter
fn with_since(url: &str, since: i64) -> String {
    if url.contains('?') {
        format!("{url}&since={since}")
    } else {
        format!("{url}?since={since}")
    }
}
