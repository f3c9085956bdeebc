//! External sorter configuration.
//!
//! Configuration is built in code with [`SorterConfig::default`] and the
//! `with_*` methods, or loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `SORTKIT_MAX_CACHE_RECORDS`: records held in memory before a spill (default: `10000`)
//! - `SORTKIT_MAX_OPEN_FILES`: spill files merged at once (default: `16`)
//! - `SORTKIT_TEMP_DIR`: directory for spill files (default: `{system temp}/sortkit`)
//! - `SORTKIT_FILE_PREFIX`: spill file name prefix (default: `sortkit-`)
//!
//! # Invariants
//!
//! A validated configuration has `max_cache_record_num >= 1` and
//! `max_open_file_num >= 2`.

use std::path::PathBuf;

/// External sorter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SorterConfig {
    /// Records buffered in memory before the buffer is sorted and spilled.
    pub max_cache_record_num: usize,
    /// Maximum spill files read at once, both in intermediate merge rounds
    /// and in the final merge.
    pub max_open_file_num: usize,
    /// Directory for spill files. Created on first spill.
    pub temp_dir: PathBuf,
    /// Prefix of spill file names.
    pub file_prefix: String,
}

/// Error returned when configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            max_cache_record_num: Self::DEFAULT_MAX_CACHE_RECORD_NUM,
            max_open_file_num: Self::DEFAULT_MAX_OPEN_FILE_NUM,
            temp_dir: std::env::temp_dir().join(Self::DEFAULT_TEMP_SUBDIR),
            file_prefix: Self::DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

impl SorterConfig {
    /// Default in-memory buffer size.
    pub const DEFAULT_MAX_CACHE_RECORD_NUM: usize = 10_000;
    /// Default merge width.
    pub const DEFAULT_MAX_OPEN_FILE_NUM: usize = 16;
    /// Default directory under the system temp directory.
    pub const DEFAULT_TEMP_SUBDIR: &'static str = "sortkit";
    /// Default spill file prefix.
    pub const DEFAULT_FILE_PREFIX: &'static str = "sortkit-";

    #[must_use]
    pub fn with_max_cache_record_num(mut self, records: usize) -> Self {
        self.max_cache_record_num = records;
        self
    }

    #[must_use]
    pub fn with_max_open_file_num(mut self, files: usize) -> Self {
        self.max_open_file_num = files;
        self
    }

    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Check the invariants listed in the module docs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cache_record_num < 1 {
            return Err(ConfigError::InvalidValue {
                name: "max_cache_record_num".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_open_file_num < 2 {
            return Err(ConfigError::InvalidValue {
                name: "max_open_file_num".to_string(),
                message: format!("{} is below the minimum of 2", self.max_open_file_num),
            });
        }
        if self.file_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "file_prefix".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Load configuration from environment variables, falling back to the
    /// defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable value or the
    /// result fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(records) = Self::load_usize("SORTKIT_MAX_CACHE_RECORDS")? {
            config.max_cache_record_num = records;
        }
        if let Some(files) = Self::load_usize("SORTKIT_MAX_OPEN_FILES")? {
            config.max_open_file_num = files;
        }
        if let Ok(dir) = std::env::var("SORTKIT_TEMP_DIR") {
            config.temp_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = std::env::var("SORTKIT_FILE_PREFIX") {
            config.file_prefix = prefix;
        }
        config.validate()?;
        Ok(config)
    }

    fn load_usize(name: &str) -> Result<Option<usize>, ConfigError> {
        match std::env::var(name) {
            Ok(value) => parse_usize(name, &value).map(Some),
            Err(_) => Ok(None),
        }
    }
}

fn parse_usize(name: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        message: format!("'{value}' is not a non-negative integer"),
    })
}
