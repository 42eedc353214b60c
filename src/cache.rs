//! Experiment run cache
//!
//! Result files are addressed purely by the content hash of the run
//! configuration's canonical serialization (never a counter or
//! timestamp), so repeated invocations with identical parameters reuse
//! the same file. For a fixed key the trainer is invoked at most once
//! across a sweep unless a retrain is forced; every later `resolve`
//! is a pure file read.
//!
//! A cached file that fails validation on load is a fatal
//! [`Error::CorruptCacheEntry`]. The cache does not fall back to
//! retraining in that case: bad cached data means a bug wrote it, and
//! masking that with a retrain would hide the bug.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{CacheKey, RunConfig};
use crate::outcome::TrainingOutcomes;
use crate::trainer::Trainer;
use crate::{Error, Result};

/// Content-addressed cache of trainer result files.
///
/// Owns its cache directory and the result files within it; callers
/// only ever read through [`TrainingOutcomes`]. Single-threaded by
/// design: one writer per cache key at a time is assumed.
pub struct RunCache<T: Trainer> {
    cache_dir: PathBuf,
    trainer: T,
}

impl<T: Trainer> RunCache<T> {
    /// Open a cache rooted at `cache_dir`, creating the directory if
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created.
    pub fn new(cache_dir: impl Into<PathBuf>, trainer: T) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir, trainer })
    }

    /// Path of the result file for `config`: `run-<key>.json`.
    #[must_use]
    pub fn result_path(&self, config: &RunConfig) -> PathBuf {
        self.cache_dir
            .join(format!("run-{}.json", CacheKey::of(config)))
    }

    /// Path of the informational manifest sidecar for `config`:
    /// `run-<key>.meta.json`. Never consulted for the hit/miss
    /// decision.
    #[must_use]
    pub fn manifest_path(&self, config: &RunConfig) -> PathBuf {
        self.cache_dir
            .join(format!("run-{}.meta.json", CacheKey::of(config)))
    }

    /// Resolve a config to validated outcomes, training only on a
    /// cache miss (or when `force_retrain` is set).
    ///
    /// # Errors
    ///
    /// - [`Error::CorruptCacheEntry`] if a cached result file exists
    ///   but fails parsing or validation on load.
    /// - [`Error::TrainerExecution`] if the trainer fails, or exits
    ///   cleanly without writing the result file.
    /// - [`Error::SchemaViolation`] if a freshly trained payload is
    ///   malformed.
    /// - [`Error::Io`] on filesystem failures.
    pub fn resolve(&self, config: &RunConfig, force_retrain: bool) -> Result<TrainingOutcomes> {
        let key = CacheKey::of(config);
        let path = self.result_path(config);

        if !force_retrain && path.exists() {
            info!(%key, "cache hit; loading cached result");
            return match load_outcomes(&path) {
                Ok(outcomes) => Ok(outcomes),
                // An unreadable file is an IO problem, not corruption.
                Err(err @ Error::Io(_)) => Err(err),
                Err(source) => Err(Error::CorruptCacheEntry {
                    path,
                    source: Box::new(source),
                }),
            };
        }

        info!(%key, forced = force_retrain, "cache miss; invoking trainer");
        let trained_at = Utc::now();
        let started = Instant::now();
        self.trainer.invoke(config, &path)?;
        let train_seconds = started.elapsed().as_secs_f64();

        if !path.exists() {
            return Err(Error::TrainerExecution(format!(
                "trainer succeeded but wrote no result file at {}",
                path.display()
            )));
        }
        info!(%key, train_seconds, "trainer finished");

        let manifest = RunManifest {
            config: config.clone(),
            cache_key: key.to_string(),
            trained_at,
            train_seconds,
        };
        manifest.write(&self.manifest_path(config))?;

        // Fresh payload: a mismatch here is a plain SchemaViolation,
        // not a corrupt cache entry.
        load_outcomes(&path)
    }
}

/// Informational record of one training invocation, written next to
/// the result file on every cache miss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// The configuration that was trained
    pub config: RunConfig,
    /// Hex rendering of the cache key
    pub cache_key: String,
    /// When the invocation started
    pub trained_at: DateTime<Utc>,
    /// Training wall-clock duration in seconds
    pub train_seconds: f64,
}

impl RunManifest {
    /// Read a manifest sidecar.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read or
    /// [`Error::Json`] if it does not parse.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn load_outcomes(path: &Path) -> Result<TrainingOutcomes> {
    let contents = fs::read_to_string(path)?;
    TrainingOutcomes::from_json(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingTrainer {
        invocations: Cell<usize>,
        payload: &'static str,
    }

    impl CountingTrainer {
        fn new(payload: &'static str) -> Self {
            Self {
                invocations: Cell::new(0),
                payload,
            }
        }
    }

    impl Trainer for CountingTrainer {
        fn invoke(&self, _config: &RunConfig, output_path: &Path) -> Result<()> {
            self.invocations.set(self.invocations.get() + 1);
            fs::write(output_path, self.payload)?;
            Ok(())
        }
    }

    const PAYLOAD: &str = r#"{"games_played": [{"score": 12, "gen_id": 0}]}"#;

    #[test]
    fn test_resolve_trains_once_then_reads() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RunCache::new(dir.path(), CountingTrainer::new(PAYLOAD)).unwrap();
        let config = RunConfig::builder().num_generations(3).build();

        let first = cache.resolve(&config, false).unwrap();
        let second = cache.resolve(&config, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.trainer.invocations.get(), 1);
    }

    #[test]
    fn test_force_retrain_reinvokes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RunCache::new(dir.path(), CountingTrainer::new(PAYLOAD)).unwrap();
        let config = RunConfig::default();

        cache.resolve(&config, false).unwrap();
        cache.resolve(&config, true).unwrap();
        assert_eq!(cache.trainer.invocations.get(), 2);
    }

    #[test]
    fn test_result_path_is_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RunCache::new(dir.path(), CountingTrainer::new(PAYLOAD)).unwrap();
        let config = RunConfig::builder().explore_rate(0.1).build();

        let path = cache.result_path(&config);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, format!("run-{}.json", CacheKey::of(&config)));
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RunCache::new(dir.path(), CountingTrainer::new(PAYLOAD)).unwrap();
        let config = RunConfig::builder().learning_rate(0.25).build();

        cache.resolve(&config, false).unwrap();
        let manifest = RunManifest::read(&cache.manifest_path(&config)).unwrap();
        assert_eq!(manifest.config, config);
        assert_eq!(manifest.cache_key, CacheKey::of(&config).to_string());
        assert!(manifest.train_seconds >= 0.0);
    }
}
