//! INI configuration file.
//!
//! Settings live in `<config dir>/blockpress/config.ini`:
//!
//! ```ini
//! [compression]
//! format = bptc
//! threads = auto
//! job_size = 32
//! max_threads = 16
//! bc7_quality = basic
//! ```
//!
//! A missing file means defaults. Every value is validated on load, so a
//! [`ConfigFile`] in memory is always usable. Command-line flags take
//! precedence over the file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::codec::{Bc7Quality, EncodeOptions};
use crate::format::CompressionFormat;
use crate::scheduler::{
    available_threads, SchedulerConfig, DEFAULT_JOB_SIZE, DEFAULT_MAX_WORKER_THREADS,
};

const SECTION_COMPRESSION: &str = "compression";

/// Errors from loading, validating or saving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Could not determine the user configuration directory")]
    NoConfigDir,
}

/// `[compression]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionSettings {
    /// Default output format.
    pub format: CompressionFormat,
    /// Worker threads; `None` uses the available parallelism.
    pub threads: Option<usize>,
    /// Blocks per pull.
    pub job_size: usize,
    /// Upper bound on worker threads.
    pub max_threads: usize,
    /// BPTC encoder preset.
    pub bc7_quality: Bc7Quality,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            format: CompressionFormat::Bptc,
            threads: None,
            job_size: DEFAULT_JOB_SIZE,
            max_threads: DEFAULT_MAX_WORKER_THREADS,
            bc7_quality: Bc7Quality::default(),
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub compression: CompressionSettings,
}

/// Path of the configuration file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("blockpress").join("config.ini"))
        .ok_or(ConfigError::NoConfigDir)
}

impl ConfigFile {
    /// Load from the default location, falling back to defaults if the file
    /// does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = text.parse::<Self>()?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save to a specific file, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        self.to_ini().write_to_file(path).map_err(io_err)
    }

    /// Scheduler settings described by this file.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let settings = &self.compression;
        let threads = settings
            .threads
            .unwrap_or_else(|| available_threads(settings.max_threads));
        SchedulerConfig::new(threads)
            .with_job_size(settings.job_size)
            .with_max_threads(settings.max_threads)
    }

    /// Encoder settings described by this file.
    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions::default().with_bc7_quality(self.compression.bc7_quality)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.set_to(Some(key.section()), key.key_name().to_string(), key.get(self));
        }
        ini
    }
}

impl FromStr for ConfigFile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ini = Ini::load_from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = ConfigFile::default();

        if let Some(section) = ini.section(Some(SECTION_COMPRESSION)) {
            for key in ConfigKey::all() {
                if let Some(value) = section.get(key.key_name()) {
                    key.set(&mut config, value)?;
                }
            }
        }

        Ok(config)
    }
}

/// A settable configuration key, addressed as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Format,
    Threads,
    JobSize,
    MaxThreads,
    Bc7Quality,
}

impl ConfigKey {
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::Format,
            ConfigKey::Threads,
            ConfigKey::JobSize,
            ConfigKey::MaxThreads,
            ConfigKey::Bc7Quality,
        ]
    }

    pub fn section(&self) -> &'static str {
        SECTION_COMPRESSION
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::Format => "format",
            ConfigKey::Threads => "threads",
            ConfigKey::JobSize => "job_size",
            ConfigKey::MaxThreads => "max_threads",
            ConfigKey::Bc7Quality => "bc7_quality",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value rendered as it is written to the file.
    pub fn get(&self, config: &ConfigFile) -> String {
        let settings = &config.compression;
        match self {
            ConfigKey::Format => settings.format.name().to_string(),
            ConfigKey::Threads => settings
                .threads
                .map(|t| t.to_string())
                .unwrap_or_else(|| "auto".to_string()),
            ConfigKey::JobSize => settings.job_size.to_string(),
            ConfigKey::MaxThreads => settings.max_threads.to_string(),
            ConfigKey::Bc7Quality => settings.bc7_quality.to_string(),
        }
    }

    /// Validate and store `value`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            section: self.section().to_string(),
            key: self.key_name().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let positive = || match value.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(invalid("expected a positive integer")),
        };

        let settings = &mut config.compression;
        match self {
            ConfigKey::Format => {
                settings.format = value
                    .parse()
                    .map_err(|_| invalid("expected dxt1, dxt5, bptc or pvrtc"))?;
            }
            ConfigKey::Threads => {
                settings.threads = if value.eq_ignore_ascii_case("auto") {
                    None
                } else {
                    Some(positive()?)
                };
            }
            ConfigKey::JobSize => settings.job_size = positive()?,
            ConfigKey::MaxThreads => settings.max_threads = positive()?,
            ConfigKey::Bc7Quality => {
                settings.bc7_quality = value
                    .parse()
                    .map_err(|_| invalid("expected ultrafast, veryfast, fast, basic or slow"))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.strip_prefix("compression.").unwrap_or(s);
        ConfigKey::all()
            .iter()
            .copied()
            .find(|k| k.key_name() == key)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config: ConfigFile = "[compression]\n\
             format = dxt5\n\
             threads = 8\n\
             job_size = 64\n\
             max_threads = 12\n\
             bc7_quality = slow\n"
            .parse()
            .unwrap();

        assert_eq!(config.compression.format, CompressionFormat::Dxt5);
        assert_eq!(config.compression.threads, Some(8));
        assert_eq!(config.compression.job_size, 64);
        assert_eq!(config.compression.max_threads, 12);
        assert_eq!(config.compression.bc7_quality, Bc7Quality::Slow);
    }

    #[test]
    fn test_parse_empty_file_is_default() {
        let config: ConfigFile = "".parse().unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_threads_auto() {
        let config: ConfigFile = "[compression]\nthreads = Auto\n".parse().unwrap();
        assert_eq!(config.compression.threads, None);
    }

    #[test]
    fn test_parse_invalid_value_names_key() {
        let err = "[compression]\njob_size = 0\n"
            .parse::<ConfigFile>()
            .unwrap_err();
        match err {
            ConfigError::InvalidValue {
                section, key, value, ..
            } => {
                assert_eq!(section, "compression");
                assert_eq!(key, "job_size");
                assert_eq!(value, "0");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_format() {
        let err = "[compression]\nformat = astc\n"
            .parse::<ConfigFile>()
            .unwrap_err();
        assert!(err.to_string().contains("astc"));
    }

    #[test]
    fn test_scheduler_config_from_file() {
        let mut config = ConfigFile::default();
        config.compression.threads = Some(3);
        config.compression.job_size = 7;
        config.compression.max_threads = 4;

        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.threads, 3);
        assert_eq!(scheduler.job_size, 7);
        assert_eq!(scheduler.max_threads, 4);
    }

    #[test]
    fn test_scheduler_config_auto_threads_follow_max_threads() {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let mut config = ConfigFile::default();
        config.compression.threads = None;

        config.compression.max_threads = 1024;
        assert_eq!(config.scheduler_config().threads, cpus.min(1024));

        config.compression.max_threads = 1;
        assert_eq!(config.scheduler_config().threads, 1);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.compression.format = CompressionFormat::Pvrtc;
        config.compression.threads = Some(2);
        config.compression.bc7_quality = Bc7Quality::VeryFast;

        config.save_to(&path).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigFile::load_from(&dir.path().join("none.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_config_key_parse() {
        assert_eq!(
            "compression.job_size".parse::<ConfigKey>().unwrap(),
            ConfigKey::JobSize
        );
        assert_eq!("format".parse::<ConfigKey>().unwrap(), ConfigKey::Format);
        assert!("compression.color".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_config_key_get_set() {
        let mut config = ConfigFile::default();
        ConfigKey::MaxThreads.set(&mut config, "6").unwrap();
        assert_eq!(ConfigKey::MaxThreads.get(&config), "6");
        assert_eq!(ConfigKey::Threads.get(&config), "auto");
        assert_eq!(ConfigKey::Format.name(), "compression.format");
    }
}
