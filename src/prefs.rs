//! Volume preference persistence.
//!
//! The engine only needs one integer (0–100). Where and how it is stored is
//! up to the [`VolumeStore`] implementation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PrefsError;

/// Preferences file name inside the config directory
const PREFS_FILE: &str = "preferences.json";

/// Preferences file format version
const PREFS_VERSION: u32 = 1;

/// Read/write access to the stored volume percent.
pub trait VolumeStore: Send {
    /// Stored volume, or `None` if nothing has been saved yet.
    fn load_volume(&self) -> Result<Option<u8>, PrefsError>;

    fn save_volume(&mut self, percent: u8) -> Result<(), PrefsError>;
}

/// Keeps the preference in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemoryVolumeStore {
    volume: Option<u8>,
}

impl MemoryVolumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume(percent: u8) -> Self {
        MemoryVolumeStore {
            volume: Some(percent.min(100)),
        }
    }
}

impl VolumeStore for MemoryVolumeStore {
    fn load_volume(&self) -> Result<Option<u8>, PrefsError> {
        Ok(self.volume)
    }

    fn save_volume(&mut self, percent: u8) -> Result<(), PrefsError> {
        self.volume = Some(percent.min(100));
        Ok(())
    }
}

/// On-disk preferences document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Preferences {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    volume: Option<u8>,
}

fn default_version() -> u32 {
    PREFS_VERSION
}

/// Persists the preference as a small JSON document.
#[derive(Debug, Clone)]
pub struct JsonVolumeStore {
    path: PathBuf,
}

impl JsonVolumeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonVolumeStore { path: path.into() }
    }

    /// Store in the platform config directory.
    pub fn default_location() -> Result<Self, PrefsError> {
        let dirs = ProjectDirs::from("", "", "tonestation").ok_or(PrefsError::NoConfigDir)?;
        Ok(Self::new(dirs.config_dir().join(PREFS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<Preferences>, PrefsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // Empty file is treated as non-existent
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }
}

impl VolumeStore for JsonVolumeStore {
    fn load_volume(&self) -> Result<Option<u8>, PrefsError> {
        Ok(self.read()?.and_then(|p| p.volume).map(|v| v.min(100)))
    }

    fn save_volume(&mut self, percent: u8) -> Result<(), PrefsError> {
        let mut prefs = self.read()?.unwrap_or(Preferences {
            version: PREFS_VERSION,
            volume: None,
        });
        prefs.volume = Some(percent.min(100));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&prefs)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), volume = percent, "saved volume preference");
        Ok(())
    }
}
