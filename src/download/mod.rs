//! Fetching package archives into the store.

use anyhow::{Context, anyhow};
use log::{debug, info};
use reqwest::Url;
use std::path::{Path, PathBuf};

use crate::archive::ArchiveKind;
use crate::cleanup::{CleanupGuard, SharedCleanupContext};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::runtime::Runtime;
use crate::store::{Store, transient_sibling};

/// Used when the URL does not reveal the archive type.
pub const DEFAULT_EXTENSION: &str = "tar.gz";

/// Result of [`fetch_archive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    pub path: PathBuf,
    /// The archive was already in the store and nothing was transferred.
    pub reused: bool,
}

/// File extension the stored archive gets, taken from the last path segment
/// of `source_url`.
///
/// `https://host/foo-1.0.tgz` gives `tar.gz`, `https://host/foo.rar` gives
/// `rar` and `https://host/download?id=1` gives [`DEFAULT_EXTENSION`].
pub fn archive_extension(source_url: &str) -> String {
    let file_name = Url::parse(source_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .unwrap_or_default();

    if let Some((_, kind)) = ArchiveKind::split(&file_name) {
        return kind.extension().to_string();
    }

    Path::new(&file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Make the archive for `identity` available in the store.
///
/// An archive already present under `<identity>.<ext>` is returned as is.
/// Otherwise the resource is written to a hidden `.part` file and renamed
/// into place once complete; on failure the partial file is removed.
#[tracing::instrument(skip(runtime, store, http_client, cleanup))]
pub async fn fetch_archive<R: Runtime>(
    runtime: &R,
    store: &Store,
    http_client: &HttpClient,
    cleanup: &SharedCleanupContext,
    source_url: &str,
    identity: &str,
) -> Result<FetchedArchive> {
    let archive_path = store.archive_path(identity, &archive_extension(source_url));
    if runtime.exists(&archive_path) {
        info!("Archive {:?} already present, skipping download.", archive_path);
        return Ok(FetchedArchive {
            path: archive_path,
            reused: true,
        });
    }

    let fetch_error = |source| Error::Fetch {
        package: identity.to_string(),
        url: source_url.to_string(),
        source,
    };

    let url = Url::parse(source_url)
        .with_context(|| format!("Invalid URL '{}'", source_url))
        .map_err(fetch_error)?;

    let part_path = transient_sibling(&archive_path, "part");
    let guard = CleanupGuard::new(cleanup.clone(), part_path.clone());

    let result = transfer(runtime, http_client, &url, &part_path).await;
    let result = result.and_then(|_| runtime.rename(&part_path, &archive_path));
    if result.is_err() && (runtime.exists(&part_path) || runtime.is_symlink(&part_path)) {
        if let Err(e) = runtime.remove_file(&part_path) {
            debug!("Failed to remove partial download {:?}: {:#}", part_path, e);
        }
    }
    guard.success();
    result.map_err(fetch_error)?;

    info!("Stored {} as {:?}", source_url, archive_path);
    Ok(FetchedArchive {
        path: archive_path,
        reused: false,
    })
}

async fn transfer<R: Runtime>(
    runtime: &R,
    http_client: &HttpClient,
    url: &Url,
    part_path: &Path,
) -> anyhow::Result<()> {
    match url.scheme() {
        "http" | "https" => {
            info!("Downloading {}...", url);
            http_client
                .download_file(url.as_str(), || {
                    runtime
                        .create_file(part_path)
                        .with_context(|| format!("Failed to create {:?}", part_path))
                })
                .await?;
        }
        "file" => {
            let source = url
                .to_file_path()
                .map_err(|_| anyhow!("'{}' is not a local file path", url))?;
            if !runtime.exists(&source) {
                return Err(anyhow!("{:?} does not exist", source));
            }
            debug!("Copying {:?} to {:?}", source, part_path);
            runtime.copy(&source, part_path)?;
        }
        scheme => return Err(anyhow!("unsupported URL scheme '{}'", scheme)),
    }
    Ok(())
}
