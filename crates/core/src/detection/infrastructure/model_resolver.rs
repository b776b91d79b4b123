//! Resolution of the pretrained stage models (PNet, RNet, ONet).
//!
//! The ONNX files are release artifacts, not repository content. Each is
//! resolved in order: user cache directory, optional bundled directory,
//! download-to-cache.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::{
    ONET_MODEL_NAME, ONET_MODEL_URL, PNET_MODEL_NAME, PNET_MODEL_URL, RNET_MODEL_NAME,
    RNET_MODEL_URL,
};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Filesystem paths of the three resolved stage models.
pub struct StageModels {
    pub pnet: PathBuf,
    pub rnet: PathBuf,
    pub onet: PathBuf,
}

/// Resolve all three cascade models, reporting per-model progress.
pub fn resolve_stage_models(
    bundled_dir: Option<&Path>,
    mut progress: impl FnMut(&'static str) -> Option<ProgressFn>,
) -> Result<StageModels, ModelResolveError> {
    let pnet = resolve(
        PNET_MODEL_NAME,
        PNET_MODEL_URL,
        bundled_dir,
        progress(PNET_MODEL_NAME),
    )?;
    let rnet = resolve(
        RNET_MODEL_NAME,
        RNET_MODEL_URL,
        bundled_dir,
        progress(RNET_MODEL_NAME),
    )?;
    let onet = resolve(
        ONET_MODEL_NAME,
        ONET_MODEL_URL,
        bundled_dir,
        progress(ONET_MODEL_NAME),
    )?;
    Ok(StageModels { pnet, rnet, onet })
}

/// Resolve a model file by name, checking cache locations before downloading.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. Bundled path (for development / pre-packaged installs)
/// 3. Download from URL to cache
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(dir) = bundled_dir {
        let bundled_path = dir.join(name);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    log::info!("model {name} not cached, downloading from {url}");
    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/mtcnn/models/`
/// - Linux: `$XDG_CACHE_HOME/mtcnn/models/` or `~/.cache/mtcnn/models/`
/// - Windows: `%LOCALAPPDATA%/mtcnn/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("mtcnn").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("mtcnn").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url).map_err(|e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    // Write to a temp file first, then rename for atomicity
    let temp_path = dest.with_extension("part");
    let mut file = fs::File::create(&temp_path).map_err(|e| ModelResolveError::Write {
        path: temp_path.clone(),
        source: e,
    })?;

    let bytes = response.bytes().map_err(|e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;

    // Report progress in chunks to avoid excessive callbacks
    let chunk_size = 1024 * 1024; // 1MB
    for chunk in bytes.chunks(chunk_size) {
        file.write_all(chunk)
            .map_err(|e| ModelResolveError::Write {
                path: temp_path.clone(),
                source: e,
            })?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(|e| ModelResolveError::Write {
        path: temp_path.clone(),
        source: e,
    })?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_model_cache_dir_returns_path() {
        let dir = model_cache_dir().unwrap();
        assert!(dir.to_string_lossy().contains("mtcnn"));
        assert!(dir.to_string_lossy().contains("models"));
    }

    #[test]
    fn test_resolve_prefers_bundled_over_download() {
        let tmp = TempDir::new().unwrap();
        let bundled_dir = tmp.path().join("bundled");
        fs::create_dir_all(&bundled_dir).unwrap();
        let bundled_path = bundled_dir.join("stage_model.onnx");
        fs::write(&bundled_path, b"bundled model").unwrap();

        // An unreachable URL proves no download is attempted when the
        // bundled file exists (unless a stale cache copy shadows it).
        let result = resolve(
            "stage_model.onnx",
            "http://invalid.nonexistent.example.com/stage_model.onnx",
            Some(&bundled_dir),
            None,
        );
        if let Ok(path) = result {
            assert!(path.exists());
        }
        assert_eq!(fs::read(&bundled_path).unwrap(), b"bundled model");
    }

    #[test]
    fn test_download_invalid_url_returns_error() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let _ = download("http://invalid.nonexistent.example.com/model", &dest, None);
        // Neither the dest nor the .part file should exist after failure
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn test_resolve_stage_models_from_bundled_dir() {
        // With all three files bundled, resolution never needs the network.
        let tmp = TempDir::new().unwrap();
        for name in [PNET_MODEL_NAME, RNET_MODEL_NAME, ONET_MODEL_NAME] {
            fs::write(tmp.path().join(name), b"stub").unwrap();
        }

        let models = resolve_stage_models(Some(tmp.path()), |_| None).unwrap();
        assert!(models.pnet.ends_with(PNET_MODEL_NAME));
        assert!(models.rnet.ends_with(RNET_MODEL_NAME));
        assert!(models.onet.ends_with(ONET_MODEL_NAME));
    }
}
