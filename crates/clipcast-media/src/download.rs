//! Source acquirer + cache (§4.4): resolve a URL to a local media file, idempotent per URL.
//!
//! On cache hit, the cached file's existence is re-verified; a stale entry (file removed from
//! under the cache) is evicted and treated as a miss. On miss, `yt-dlp` is invoked with retry
//! (up to 10 attempts, multiplicative backoff) and a fallback format selector. Cache metadata
//! is a JSON file written replace-on-rename for crash safety. A per-URL `Mutex` (keyed by URL
//! hash) serializes concurrent fetches of the same URL so the second caller reuses the first's
//! result instead of racing it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex as StdMutex};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Minimum video file size threshold (50MB) to consider a prior download complete.
const MIN_VIDEO_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Maximum fetch attempts before giving up with `fetch_error` (§4.4).
const MAX_FETCH_ATTEMPTS: u32 = 10;

/// Format selectors tried in order; later entries are progressively more permissive fallbacks.
const FORMAT_SELECTORS: &[&str] = &[
    "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]",
    "bestvideo+bestaudio/best",
    "best",
];

/// Result of a successful acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquiredSource {
    pub local_path: PathBuf,
    pub title: String,
    pub source_id: String,
}

/// One cache row keyed by URL hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    url: String,
    local_path: PathBuf,
    title: String,
    source_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheIndex {
    entries: HashMap<String, CacheEntry>,
}

/// Per-URL exclusion locks, so two concurrent `acquire` calls for the same URL share the
/// result of the first fetch instead of racing (§5 Shared resources).
static URL_LOCKS: Lazy<StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>> =
    Lazy::new(|| StdMutex::new(HashMap::new()));

fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}

fn url_lock(url_key: &str) -> Arc<AsyncMutex<()>> {
    let mut locks = URL_LOCKS.lock().expect("url lock registry poisoned");
    locks
        .entry(url_key.to_string())
        .or_insert_with(|| Arc::new(AsyncMutex::new(())))
        .clone()
}

/// Resolve `url` to a local file under `downloads_dir`, consulting and updating
/// `downloads_dir/video_cache.json`.
pub async fn acquire(url: &str, downloads_dir: impl AsRef<Path>) -> MediaResult<AcquiredSource> {
    let downloads_dir = downloads_dir.as_ref();
    let url_key = url_hash(url);
    let lock = url_lock(&url_key);
    let _guard = lock.lock().await;

    let cache_path = downloads_dir.join("video_cache.json");

    if let Some(entry) = load_cache_entry(&cache_path, &url_key).await {
        if tokio::fs::metadata(&entry.local_path).await.is_ok() {
            debug!(url, path = %entry.local_path.display(), "source acquirer cache hit");
            return Ok(AcquiredSource {
                local_path: entry.local_path,
                title: entry.title,
                source_id: entry.source_id,
            });
        }
        warn!(url, "cached source file missing, evicting stale entry");
        evict_cache_entry(&cache_path, &url_key).await;
    }

    let source_id = url_key.clone();
    let output_path = downloads_dir.join(format!("{source_id}.mp4"));
    tokio::fs::create_dir_all(downloads_dir).await?;

    let title = fetch_with_retry(url, &output_path).await?;

    let entry = CacheEntry {
        url: url.to_string(),
        local_path: output_path.clone(),
        title: title.clone(),
        source_id: source_id.clone(),
    };
    save_cache_entry(&cache_path, &url_key, entry).await?;

    Ok(AcquiredSource {
        local_path: output_path,
        title,
        source_id,
    })
}

async fn fetch_with_retry(url: &str, output_path: &Path) -> MediaResult<String> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    let mut last_error = None;
    let mut delay_ms: u64 = 500;

    for attempt in 1..=MAX_FETCH_ATTEMPTS {
        let selector = FORMAT_SELECTORS[(attempt as usize - 1).min(FORMAT_SELECTORS.len() - 1)];
        match try_fetch(url, output_path, selector).await {
            Ok(title) => return Ok(title),
            Err(e) => {
                warn!(attempt, selector, "yt-dlp attempt failed: {}", e);
                last_error = Some(e);
                if attempt < MAX_FETCH_ATTEMPTS {
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    delay_ms = delay_ms.saturating_mul(2).min(30_000);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| MediaError::download_failed("exhausted all fetch attempts")))
}

async fn try_fetch(url: &str, output_path: &Path, format_selector: &str) -> MediaResult<String> {
    if output_path.exists() {
        if let Ok(metadata) = output_path.metadata() {
            if metadata.len() > MIN_VIDEO_FILE_SIZE {
                info!("Using existing video file: {}", output_path.display());
                return Ok(title_from_path(output_path));
            }
            tokio::fs::remove_file(output_path).await?;
        }
    }

    info!(url, format_selector, "downloading via yt-dlp");

    let output = Command::new("yt-dlp")
        .args(["--remote-components", "ejs:github", "-f", format_selector, "-o"])
        .arg(output_path)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr: {}", stderr);
        return Err(MediaError::download_failed(format!(
            "yt-dlp failed: {}",
            stderr.lines().last().unwrap_or("Unknown error")
        )));
    }

    if !output_path.exists() {
        return Err(MediaError::download_failed("Output file not created"));
    }

    let file_size = output_path.metadata()?.len();
    info!(
        "Downloaded video: {} ({:.1} MB)",
        output_path.display(),
        file_size as f64 / (1024.0 * 1024.0)
    );

    Ok(title_from_path(output_path))
}

fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

async fn load_cache_entry(cache_path: &Path, key: &str) -> Option<CacheEntry> {
    let data = tokio::fs::read(cache_path).await.ok()?;
    let index: CacheIndex = serde_json::from_slice(&data).ok()?;
    index.entries.get(key).cloned()
}

async fn evict_cache_entry(cache_path: &Path, key: &str) {
    if let Ok(data) = tokio::fs::read(cache_path).await {
        if let Ok(mut index) = serde_json::from_slice::<CacheIndex>(&data) {
            index.entries.remove(key);
            let _ = write_cache_index_atomic(cache_path, &index).await;
        }
    }
}

async fn save_cache_entry(cache_path: &Path, key: &str, entry: CacheEntry) -> MediaResult<()> {
    let mut index = match tokio::fs::read(cache_path).await {
        Ok(data) => serde_json::from_slice(&data).unwrap_or_default(),
        Err(_) => CacheIndex::default(),
    };
    index.entries.insert(key.to_string(), entry);
    write_cache_index_atomic(cache_path, &index).await
}

/// Write `index` to `cache_path` via a temp file + rename, so a crash mid-write never leaves
/// a truncated cache file behind.
async fn write_cache_index_atomic(cache_path: &Path, index: &CacheIndex) -> MediaResult<()> {
    if let Some(parent) = cache_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = cache_path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(index)?;
    tokio::fs::write(&tmp_path, body).await?;
    tokio::fs::rename(&tmp_path, cache_path).await?;
    Ok(())
}

/// Check if a URL is a supported video platform.
pub fn is_supported_url(url: &str) -> bool {
    clipcast_models::is_youtube_domain(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipcast_models::extract_youtube_id;
    use tempfile::TempDir;

    #[test]
    fn test_url_hash_is_stable() {
        assert_eq!(url_hash("https://youtu.be/abc"), url_hash("https://youtu.be/abc"));
        assert_ne!(url_hash("https://youtu.be/abc"), url_hash("https://youtu.be/xyz"));
    }

    #[test]
    fn test_is_supported_url() {
        assert!(is_supported_url("https://youtube.com/watch?v=abc"));
        assert!(is_supported_url("https://youtu.be/abc"));
        assert!(!is_supported_url("https://vimeo.com/123"));
    }

    #[test]
    fn test_extract_youtube_id() {
        assert_eq!(
            extract_youtube_id("https://youtube.com/watch?v=abc123def45"),
            Ok("abc123def45".to_string())
        );
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("video_cache.json");

        let entry = CacheEntry {
            url: "https://youtu.be/abc".into(),
            local_path: dir.path().join("abc.mp4"),
            title: "abc".into(),
            source_id: "abc".into(),
        };
        save_cache_entry(&cache_path, "key1", entry.clone()).await.unwrap();

        let loaded = load_cache_entry(&cache_path, "key1").await.unwrap();
        assert_eq!(loaded.url, entry.url);
    }

    #[tokio::test]
    async fn test_cache_eviction_removes_entry() {
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("video_cache.json");

        let entry = CacheEntry {
            url: "https://youtu.be/abc".into(),
            local_path: dir.path().join("abc.mp4"),
            title: "abc".into(),
            source_id: "abc".into(),
        };
        save_cache_entry(&cache_path, "key1", entry).await.unwrap();
        evict_cache_entry(&cache_path, "key1").await;

        assert!(load_cache_entry(&cache_path, "key1").await.is_none());
    }
}
