//! Playlist and segment retrieval over HTTP, plus an offline stand-in.

use crate::config::FetchConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use segmerge_core::{Error, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Retrieval of playlists and segment bytes
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a text resource (a playlist)
    async fn fetch_text(&self, url: &str) -> Result<String>;

    /// Download a resource into `dest`
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<()>;
}

/// HTTP fetcher with browser-like headers and a per-request timeout
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        match HeaderValue::from_str(&config.accept_language) {
            Ok(value) => {
                headers.insert(ACCEPT_LANGUAGE, value);
            }
            Err(e) => tracing::warn!("Ignoring invalid fetch.accept_language: {}", e),
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self { client }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(url, format!("unexpected status {}", status)));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| Error::fetch(url, format!("failed to read body: {}", e)))
    }

    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self.get(url).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;

        let copied: Result<()> = async {
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| Error::fetch(url, format!("failed to read body: {}", e)))?
            {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if copied.is_err() {
            // Don't leave a truncated segment behind for the merge stage
            drop(file);
            let _ = tokio::fs::remove_file(dest).await;
        }
        copied
    }
}

/// Fetcher for runs that must not touch the network
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

#[async_trait::async_trait]
impl Fetcher for OfflineFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        Err(Error::fetch(url, "remote inputs are not supported here"))
    }

    async fn fetch_to_file(&self, url: &str, _dest: &Path) -> Result<()> {
        Err(Error::fetch(url, "remote inputs are not supported here"))
    }
}
