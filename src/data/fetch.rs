use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::error::DataError;

/// Make sure the input table exists on disk and return its path.
///
/// Remote sources are downloaded once into `cache`; later runs reuse the
/// cached file whenever it exists, without looking at its content. Local
/// sources are returned unchanged.
pub fn ensure_local(source: &str, cache: &Path, timeout: Option<Duration>) -> Result<PathBuf> {
    if !is_remote(source) {
        return Ok(PathBuf::from(source));
    }

    if cache.exists() {
        log::info!("Using cached copy {}", cache.display());
        return Ok(cache.to_path_buf());
    }

    log::info!("Downloading {source} → {}", cache.display());
    let bytes = download(source, timeout)?;

    if let Some(parent) = cache.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    // Write next to the target and rename, so a crash never leaves a
    // truncated file that later runs would trust.
    let partial = partial_path(cache);
    std::fs::write(&partial, &bytes)
        .with_context(|| format!("writing {}", partial.display()))?;
    std::fs::rename(&partial, cache)
        .with_context(|| format!("moving download into {}", cache.display()))?;

    log::info!("Saved {} bytes", bytes.len());
    Ok(cache.to_path_buf())
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn download(url: &str, timeout: Option<Duration>) -> Result<Vec<u8>, DataError> {
    let retrieval = |reason: String| DataError::Retrieval {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| retrieval(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| retrieval(e.to_string()))?;

    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| retrieval(e.to_string()))
}

fn partial_path(cache: &Path) -> PathBuf {
    let mut name = cache
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    cache.with_file_name(name)
}
