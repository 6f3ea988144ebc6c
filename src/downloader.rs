//! Saves book texts and cover images into existing directories.

use crate::error::DownloadError;
use crate::fetcher::PageFetcher;
use crate::utils::sanitize_filename;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Downloads resources referenced by a book descriptor.
#[derive(Debug, Clone)]
pub struct ResourceDownloader {
    fetcher: PageFetcher,
}

impl ResourceDownloader {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Downloads a text body to `dir/<display_name>.txt`.
    ///
    /// The text endpoint redirects instead of failing when a book has no
    /// text, so a redirect is reported as not-found.
    pub async fn save_text(
        &self,
        endpoint: &Url,
        params: &[(&str, &str)],
        display_name: &str,
        dir: &Path,
    ) -> Result<PathBuf, DownloadError> {
        let mut url = endpoint.clone();
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        let fetched = self.fetcher.fetch_bytes(&url).await?;
        let path = dir.join(format!("{}.txt", sanitize_filename(display_name)));
        write_file(&path, &fetched.bytes).await?;
        Ok(path)
    }

    /// Downloads an image to `dir/<file_name>` without touching the name.
    ///
    /// `file_name` must name a file directly inside `dir`; anything else is
    /// rejected before a request is made.
    pub async fn save_image(
        &self,
        image_url: &Url,
        file_name: &str,
        dir: &Path,
    ) -> Result<PathBuf, DownloadError> {
        if !is_plain_file_name(file_name) {
            return Err(DownloadError::UnsafeFileName(file_name.to_string()));
        }
        let fetched = self.fetcher.fetch_bytes(image_url).await?;
        let path = dir.join(file_name);
        write_file(&path, &fetched.bytes).await?;
        Ok(path)
    }

    /// Convenience for callers holding the image URL as a string.
    pub async fn save_image_str(
        &self,
        image_url: &str,
        file_name: &str,
        dir: &Path,
    ) -> Result<PathBuf, DownloadError> {
        let url = Url::parse(image_url)
            .map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", image_url, e)))?;
        self.save_image(&url, file_name, dir).await
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\', '\0'])
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| DownloadError::Io {
            path: path.display().to_string(),
            source,
        })
}
