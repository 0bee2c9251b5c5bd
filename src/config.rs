use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default embedding model; 384 dimensions, small and fast.
const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
/// Default enrichment worker count.
const DEFAULT_WORKERS: usize = 4;
/// Default per-provider-call timeout.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
/// Default minimum interval between title-fallback lookups.
const DEFAULT_THROTTLE_MILLIS: u64 = 120;
/// Default result count when the requested count is unusable.
pub const DEFAULT_RESULT_COUNT: usize = 10;

/// Cover resolution settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoverConfig {
    /// Per provider-call timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Minimum milliseconds between title-fallback lookups (0 disables)
    #[serde(default = "default_throttle_millis")]
    pub throttle_millis: u64,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            throttle_millis: DEFAULT_THROTTLE_MILLIS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Embedding model name (e.g. "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Enrichment worker pool size
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub covers: CoverConfig,

    /// Default number of query results
    #[serde(default = "default_result_count")]
    pub result_count: usize,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            workers: DEFAULT_WORKERS,
            covers: CoverConfig::default(),
            result_count: DEFAULT_RESULT_COUNT,
            base_path: PathBuf::new(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_throttle_millis() -> u64 {
    DEFAULT_THROTTLE_MILLIS
}

fn default_result_count() -> usize {
    DEFAULT_RESULT_COUNT
}

impl Config {
    fn validate(&mut self) {
        if self.workers == 0 {
            self.workers = 1;
        }

        if self.covers.http_timeout_secs == 0 {
            panic!("covers.http_timeout_secs must be greater than 0");
        }

        if self.result_count == 0 {
            self.result_count = DEFAULT_RESULT_COUNT;
        }
    }

    /// Load config.yaml from the base directory, creating a default one on
    /// first run. The base directory also holds model caches.
    pub fn load_with(base_path: PathBuf) -> Self {
        let config_path = base_path.join("config.yaml");

        if !config_path.exists() {
            let _ = std::fs::create_dir_all(&base_path);
            let _ = std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default()).unwrap(),
            );
        }

        let config_str =
            std::fs::read_to_string(&config_path).expect("config file is not readable");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path;
        config.validate();
        config
    }

    /// Default config rooted at `~/.config/bookvibe` (or the cwd when no
    /// home directory can be determined).
    pub fn load() -> Self {
        let base = homedir::my_home()
            .ok()
            .flatten()
            .map(|h| h.join(".config").join("bookvibe"))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::load_with(base)
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_run_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with(dir.path().to_path_buf());

        assert!(dir.path().join("config.yaml").exists());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.result_count, DEFAULT_RESULT_COUNT);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "model: bge-base-en-v1.5\n").unwrap();

        let config = Config::load_with(dir.path().to_path_buf());
        assert_eq!(config.model, "bge-base-en-v1.5");
        assert_eq!(config.covers.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn test_zero_workers_coerced_to_one() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "workers: 0\n").unwrap();

        let config = Config::load_with(dir.path().to_path_buf());
        assert_eq!(config.workers, 1);
    }

    #[test]
    #[should_panic(expected = "http_timeout_secs")]
    fn test_zero_timeout_panics() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "covers:\n  http_timeout_secs: 0\n",
        )
        .unwrap();
        Config::load_with(dir.path().to_path_buf());
    }
}
