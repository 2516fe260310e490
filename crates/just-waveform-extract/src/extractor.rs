//! Cached waveform extraction

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use just_waveform::{decode, encode, Envelope};
use tokio::fs;
use tracing::{debug, info};

use crate::error::ExtractError;
use crate::options::ExtractOptions;
use crate::source::reduce_file;

/// Waveform extractor
#[derive(Debug, Clone)]
pub struct WaveformExtractor {
    /// Cache directory
    cache_dir: Option<PathBuf>,
}

impl WaveformExtractor {
    /// Create a new WaveformExtractor using the per-user cache directory
    pub fn new() -> Self {
        let cache_dir = ProjectDirs::from("com", "just-waveform", "JustWaveform")
            .map(|dirs| dirs.cache_dir().join("waveforms"));

        Self { cache_dir }
    }

    /// Create WaveformExtractor with custom cache directory
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir: Some(cache_dir),
        }
    }

    /// Disable caching
    pub fn without_cache() -> Self {
        Self { cache_dir: None }
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Extract an envelope from an audio file.
    ///
    /// Decoding runs on the blocking pool. `progress_callback` receives values
    /// in [0.0, 1.0] and sees 1.0 exactly once, on success.
    pub async fn extract<F>(
        &self,
        audio_path: &str,
        options: &ExtractOptions,
        progress_callback: F,
    ) -> Result<Envelope, ExtractError>
    where
        F: Fn(f64) + Send + 'static,
    {
        if !Path::new(audio_path).exists() {
            return Err(ExtractError::FileNotFound(audio_path.to_string()));
        }

        if options.use_cache {
            if let Some(cached) = self.load_from_cache(audio_path, options).await? {
                info!("Loaded waveform from cache");
                progress_callback(1.0);
                return Ok(cached);
            }
        }

        info!("Extracting waveform for: {}", audio_path);

        let path = PathBuf::from(audio_path);
        let opts = options.clone();
        let envelope = tokio::task::spawn_blocking(move || {
            progress_callback(0.0);
            let envelope = reduce_file(&path, &opts, &progress_callback)?;
            progress_callback(1.0);
            Ok::<_, ExtractError>(envelope)
        })
        .await
        .map_err(|e| ExtractError::GenerationFailed(e.to_string()))??;

        debug!(
            "Extracted {} points at {} samples per point",
            envelope.len(),
            envelope.samples_per_point()
        );

        if options.use_cache {
            if let Err(e) = self.save_to_cache(audio_path, options, &envelope).await {
                debug!("Failed to cache waveform: {}", e);
            }
        }

        Ok(envelope)
    }

    /// Extract an envelope and write it in binary form to `wave_out_path`.
    pub async fn extract_to_file<F>(
        &self,
        audio_in_path: &str,
        wave_out_path: &str,
        options: &ExtractOptions,
        progress_callback: F,
    ) -> Result<Envelope, ExtractError>
    where
        F: Fn(f64) + Send + 'static,
    {
        let envelope = self.extract(audio_in_path, options, progress_callback).await?;

        if let Some(parent) = Path::new(wave_out_path).parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(wave_out_path, encode(&envelope)?).await?;
        info!("Wrote waveform to: {}", wave_out_path);

        Ok(envelope)
    }

    /// Get cache path for an audio file
    fn cache_path(&self, audio_path: &str, options: &ExtractOptions) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| {
            let hash = compute_file_hash(audio_path);
            dir.join(format!("{}_{}.wave", hash, options.cache_tag()))
        })
    }

    /// Load waveform from cache
    async fn load_from_cache(
        &self,
        audio_path: &str,
        options: &ExtractOptions,
    ) -> Result<Option<Envelope>, ExtractError> {
        let cache_path = match self.cache_path(audio_path, options) {
            Some(p) => p,
            None => return Ok(None),
        };

        if !cache_path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&cache_path).await?;
        match decode(&bytes) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                debug!("Ignoring unreadable cache entry {}: {}", cache_path.display(), e);
                Ok(None)
            }
        }
    }

    /// Save waveform to cache
    async fn save_to_cache(
        &self,
        audio_path: &str,
        options: &ExtractOptions,
        envelope: &Envelope,
    ) -> Result<(), ExtractError> {
        let cache_path = match self.cache_path(audio_path, options) {
            Some(p) => p,
            None => return Ok(()),
        };

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let bytes = encode(envelope).map_err(|e| ExtractError::CacheError(e.to_string()))?;
        fs::write(&cache_path, bytes).await?;
        Ok(())
    }

    /// Clear waveform cache
    pub async fn clear_cache(&self) -> Result<(), ExtractError> {
        if let Some(cache_dir) = &self.cache_dir {
            if cache_dir.exists() {
                fs::remove_dir_all(cache_dir).await?;
            }
        }
        Ok(())
    }
}

impl Default for WaveformExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute a short hash for cache key
///
/// Covers the path plus the file's size and modification time, so an edited
/// file gets a new key.
fn compute_file_hash(path: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::time::UNIX_EPOCH;

    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    if let Ok(metadata) = std::fs::metadata(path) {
        hasher.update(metadata.len().to_le_bytes());
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        hasher.update(modified.to_le_bytes());
    }
    hex::encode(&hasher.finalize()[..8])
}
