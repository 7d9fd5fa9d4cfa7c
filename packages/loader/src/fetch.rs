//! Asset fetching.
//!
//! The loader resolves every configured path — the binary module, dynamic
//! modules, static files — through an [`AssetFetcher`]. [`HttpFetcher`]
//! serves the page-hosted case by joining relative paths against a base
//! URL; [`DirFetcher`] serves native hosts and tests from a directory.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use url::Url;

use crate::error::FetchError;

/// Fetches asset bytes by configured path.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Bytes, FetchError>;
}

/// Fetches assets over HTTP, relative to a base URL.
pub struct HttpFetcher {
    client: Client,
    base: Url,
}

impl HttpFetcher {
    pub fn new(base: &str) -> Result<Self, FetchError> {
        Ok(Self {
            client: Client::new(),
            base: Url::parse(base)?,
        })
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<Bytes, FetchError> {
        let url = self.base.join(path)?;
        tracing::debug!(%url, "fetching asset");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?)
    }
}

/// Fetches assets from a local directory.
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetFetcher for DirFetcher {
    async fn fetch(&self, path: &str) -> Result<Bytes, FetchError> {
        let target = self.root.join(path.trim_start_matches('/'));
        match tokio::fs::read(&target).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound {
                path: path.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dir_fetcher_reads_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("mods")).unwrap();
        std::fs::write(tmp.path().join("mods/extra.wasm"), b"bytes").unwrap();

        let fetcher = DirFetcher::new(tmp.path());
        let data = fetcher.fetch("mods/extra.wasm").await.unwrap();
        assert_eq!(data, Bytes::from_static(b"bytes"));
    }

    #[tokio::test]
    async fn dir_fetcher_reports_missing_assets() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = DirFetcher::new(tmp.path());
        assert!(matches!(
            fetcher.fetch("missing.wasm").await,
            Err(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn http_fetcher_rejects_bad_base() {
        assert!(HttpFetcher::new("not a url").is_err());
    }
}
