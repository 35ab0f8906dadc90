//! Asset staging.
//!
//! Streams a release asset to a fixed name in the staging directory. The
//! previous staged file is overwritten unconditionally; a staged file left
//! behind by an aborted update is simply replaced by the next attempt.

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::release::AssetDescriptor;
use reqwest::header::USER_AGENT;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// A downloaded asset waiting to be installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    /// Staged file.
    pub path: PathBuf,
    /// Bytes written.
    pub bytes: u64,
    /// Hex SHA-256 of the staged content.
    pub sha256: String,
}

/// Downloads release assets into the staging location.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    user_agent: String,
    staged_path: PathBuf,
}

impl Downloader {
    /// Create a downloader.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &DownloadConfig, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Cannot build download client: {e}")))?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
            staged_path: config.staged_path(),
        })
    }

    /// Where assets are staged.
    #[must_use]
    pub fn staged_path(&self) -> &PathBuf {
        &self.staged_path
    }

    /// Download `asset` to the staging location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Download`] on network failure or a non-success
    /// status, and [`Error::Io`] if the staged file cannot be written.
    pub async fn download(&self, asset: &AssetDescriptor) -> Result<StagedAsset> {
        info!(
            "Downloading {} to {}",
            asset.file_name,
            self.staged_path.display()
        );

        let mut response = self
            .client
            .get(&asset.download_url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| Error::Download(format!("{}: {e}", asset.download_url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download(format!(
                "{} returned {status}",
                asset.download_url
            )));
        }

        if let Some(parent) = self.staged_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&self.staged_path).await?;
        let mut hasher = Sha256::new();
        let mut bytes = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Download(format!("Transfer interrupted: {e}")))?
        {
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        let sha256 = hex::encode(hasher.finalize());
        debug!("Staged {bytes} bytes, sha256 {sha256}");
        info!("Staged update at {}", self.staged_path.display());

        Ok(StagedAsset {
            path: self.staged_path.clone(),
            bytes,
            sha256,
        })
    }
}
