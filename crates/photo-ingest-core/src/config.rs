use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::store::validate_collection;

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Map a `-v` count to a level
    pub fn from_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => Self::Info,
            1 => Self::Debug,
            _ => Self::Trace,
        }
    }

    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

/// Configuration for an ingest run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory whose contents get replaced by the validated images
    pub source_dir: PathBuf,

    /// Path to the SQLite database holding photo records
    pub database_path: PathBuf,

    /// Table that receives the records
    pub collection: String,

    /// Clear existing records before inserting; `None` means ask
    pub clear_existing: Option<bool>,

    /// Write logs to rotating files in this directory instead of stderr
    pub log_dir: Option<PathBuf>,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            database_path: PathBuf::from("photos.db"),
            collection: "photos".to_string(),
            clear_existing: None,
            log_dir: None,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn with_source_dir(mut self, source_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = source_dir.into();
        self
    }

    pub fn with_database(mut self, database_path: impl Into<PathBuf>) -> Self {
        self.database_path = database_path.into();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_clear_existing(mut self, clear: Option<bool>) -> Self {
        self.clear_existing = clear;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "Source directory must be specified".to_string(),
            ));
        }

        if !self.source_dir.is_absolute() {
            return Err(Error::Configuration(format!(
                "Source directory must be an absolute path: {}",
                self.source_dir.display()
            )));
        }

        if !self.source_dir.is_dir() {
            return Err(Error::FileNotFound(self.source_dir.clone()));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "Database path must be specified".to_string(),
            ));
        }

        validate_collection(&self.collection)
            .map_err(|e| Error::Configuration(e.to_string()))?;

        Ok(())
    }
}

/// Create `path` if needed and check that it is a writable directory
pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::io("create directory", path, e))?;

    let meta = fs::metadata(path).map_err(|e| Error::io("metadata", path, e))?;
    if !meta.is_dir() {
        return Err(Error::Configuration(format!(
            "Not a directory: {}",
            path.display()
        )));
    }
    if meta.permissions().readonly() {
        return Err(Error::Configuration(format!(
            "Directory is not writable: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo-ingest.json");
        let config = Config::default()
            .with_source_dir(dir.path())
            .with_collection("pictures")
            .with_clear_existing(Some(true));

        config.save_to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "source_dir": "/srv/photos" }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.source_dir, PathBuf::from("/srv/photos"));
        assert_eq!(config.collection, "photos");
        assert_eq!(config.clear_existing, None);
    }

    #[test]
    fn test_validate() {
        let dir = tempdir().unwrap();
        assert!(Config::default().validate().is_err());
        assert!(Config::default()
            .with_source_dir("relative/photos")
            .validate()
            .is_err());
        assert!(matches!(
            Config::default()
                .with_source_dir(dir.path().join("missing"))
                .validate(),
            Err(Error::FileNotFound(_))
        ));
        assert!(Config::default()
            .with_source_dir(dir.path())
            .with_collection("bad name")
            .validate()
            .is_err());
        assert!(Config::default().with_source_dir(dir.path()).validate().is_ok());
    }

    #[test]
    fn test_ensure_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());

        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(ensure_directory(&file).is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(1), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(5).to_level_filter(), LevelFilter::Trace);
    }
}
