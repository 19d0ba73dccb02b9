use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// What happened to a requested download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded(PathBuf),
    /// Destination existed (or was already written in this run)
    Skipped(PathBuf),
    /// Dry run, nothing written
    Simulated(PathBuf),
}

/// Downloader for artwork
pub struct Downloader {
    client: reqwest::Client,
    overwrite: bool,
    dry_run: bool,
    written: Mutex<HashSet<PathBuf>>,
}

impl Downloader {
    pub fn new(client: reqwest::Client, overwrite: bool, dry_run: bool) -> Self {
        Self {
            client,
            overwrite,
            dry_run,
            written: Mutex::new(HashSet::new()),
        }
    }

    /// Final destination: the rendered path plus the URL's file extension
    #[must_use]
    pub fn destination(url: &str, output_stem: &Path) -> PathBuf {
        let file_name = url.rsplit('/').next().unwrap_or_default();
        let file_name = file_name.split(['?', '#']).next().unwrap_or_default();
        match Path::new(file_name).extension().and_then(|e| e.to_str()) {
            Some(ext) => {
                let mut path = output_stem.as_os_str().to_owned();
                path.push(".");
                path.push(ext.to_lowercase());
                PathBuf::from(path)
            }
            None => output_stem.to_path_buf(),
        }
    }

    /// Download an image from a URL next to `output_stem`
    pub async fn download_image(&self, url: &str, output_stem: &Path) -> Result<DownloadOutcome> {
        let output_path = Self::destination(url, output_stem);

        if self.written.lock().contains(&output_path)
            || (!self.overwrite && tokio::fs::try_exists(&output_path).await.unwrap_or(false))
        {
            debug!("Image {} already present", output_path.display());
            return Ok(DownloadOutcome::Skipped(output_path));
        }

        if self.dry_run {
            info!("Would download {} to {}", url, output_path.display());
            self.written.lock().insert(output_path.clone());
            return Ok(DownloadOutcome::Simulated(output_path));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request {url}"))?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Failed to download image {}: {}",
                url,
                response.status()
            ));
        }

        let bytes = response.bytes().await?;

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&output_path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        info!("Downloaded {}", output_path.display());
        self.written.lock().insert(output_path.clone());

        Ok(DownloadOutcome::Downloaded(output_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_destination_takes_url_extension() {
        assert_eq!(
            Downloader::destination(
                "https://image.tmdb.org/t/p/w500/abc.JPG?x=1",
                Path::new("/lib/Movie/poster")
            ),
            PathBuf::from("/lib/Movie/poster.jpg")
        );
        assert_eq!(
            Downloader::destination("https://host/noext", Path::new("/lib/poster")),
            PathBuf::from("/lib/poster")
        );
    }

    #[tokio::test]
    async fn test_download_once_per_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/poster.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("Movie").join("poster");
        let url = format!("{}/poster.png", server.uri());
        let downloader = Downloader::new(reqwest::Client::new(), true, false);

        let first = downloader.download_image(&url, &stem).await.unwrap();
        let target = dir.path().join("Movie").join("poster.png");
        assert_eq!(first, DownloadOutcome::Downloaded(target.clone()));
        assert_eq!(std::fs::read(&target).unwrap(), vec![1u8, 2, 3]);

        let second = downloader.download_image(&url, &stem).await.unwrap();
        assert_eq!(second, DownloadOutcome::Skipped(target));
    }

    #[tokio::test]
    async fn test_existing_file_is_kept() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("poster.jpg");
        std::fs::write(&target, b"old").unwrap();

        let downloader = Downloader::new(reqwest::Client::new(), false, false);
        let outcome = downloader
            .download_image("http://127.0.0.1:9/poster.jpg", &dir.path().join("poster"))
            .await
            .unwrap();

        assert_eq!(outcome, DownloadOutcome::Skipped(target.clone()));
        assert_eq!(std::fs::read(&target).unwrap(), b"old");
    }
}
