use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Journal settings. Every field has a default, so an empty JSON object is a
/// valid config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JournalConfig {
    /// Directory holding the database and exports. `./data` when unset.
    pub data_dir: Option<PathBuf>,
    /// Database file name, relative to `data_dir` unless absolute.
    pub db_file: String,
    /// Export directory, relative to `data_dir` unless absolute.
    pub export_dir: String,
    /// Read ambiguous `01/02/2024` dates as 1 February.
    pub day_first: bool,
    /// Extra chrono formats tried after the built-in ones.
    pub timestamp_formats: Vec<String>,
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig {
            data_dir: None,
            db_file: "trading_journal.db".to_string(),
            export_dir: "exports".to_string(),
            day_first: true,
            timestamp_formats: Vec::new(),
        }
    }
}

impl JournalConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Err(AppError::FileNotFound(path.display().to_string()));
        }
        let text = fs::read_to_string(path)?;
        let config: JournalConfig = serde_json::from_str(&text)
            .map_err(|e| AppError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.db_file.trim().is_empty() {
            return Err(AppError::InvalidConfig("db_file cannot be empty".into()));
        }
        if self.export_dir.trim().is_empty() {
            return Err(AppError::InvalidConfig("export_dir cannot be empty".into()));
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| PathBuf::from("./data"))
    }

    pub fn db_path(&self) -> PathBuf {
        resolve(&self.data_dir(), &self.db_file)
    }

    pub fn export_path(&self) -> PathBuf {
        resolve(&self.data_dir(), &self.export_dir)
    }
}

fn resolve(base: &Path, name: &str) -> PathBuf {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
