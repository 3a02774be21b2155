//! User settings (`~/.config/romset/settings.toml`).
//!
//! Every field is optional; flags given on the command line win over the
//! file, and the file wins over built-in defaults.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use romset_core::util::parse_size;

pub const DEFAULT_THREADS: usize = 4;
pub const DEFAULT_CHUNK_SIZE: u64 = 32 * 1024 * 1024;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Canonical path to the settings file: `~/.config/romset/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("romset").join("settings.toml")
}

/// Directory searched for header detectors referenced by a DAT.
pub fn headers_dir() -> PathBuf {
    settings_path()
        .parent()
        .map(|p| p.join("headers"))
        .unwrap_or_else(|| PathBuf::from("headers"))
}

/// A byte count written either as an integer or as text like `"32MiB"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ByteSize {
    Bytes(u64),
    Text(String),
}

impl ByteSize {
    pub fn bytes(&self) -> Option<u64> {
        match self {
            Self::Bytes(n) => Some(*n),
            Self::Text(s) => parse_size(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<ByteSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<ByteSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub defaults: Defaults,
}

impl Settings {
    pub fn threads(&self) -> usize {
        self.defaults.threads.unwrap_or(DEFAULT_THREADS)
    }

    pub fn chunk_size(&self) -> u64 {
        size_or(self.defaults.chunk_size.as_ref(), "chunk_size", DEFAULT_CHUNK_SIZE)
    }

    pub fn max_file_size(&self) -> u64 {
        size_or(
            self.defaults.max_file_size.as_ref(),
            "max_file_size",
            DEFAULT_MAX_FILE_SIZE,
        )
    }

    /// Parse settings text. Unknown keys are ignored.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

fn size_or(value: Option<&ByteSize>, key: &str, default: u64) -> u64 {
    match value {
        None => default,
        Some(v) => v.bytes().unwrap_or_else(|| {
            log::warn!("settings: {key} = {v:?} is not a size, using default");
            default
        }),
    }
}

/// Load settings from `path`. A missing file gives defaults; an unreadable
/// or corrupt one logs a warning and gives defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Settings::default(),
        Err(e) => {
            log::warn!("Could not read {}: {e}", path.display());
            return Settings::default();
        }
    };
    Settings::from_toml(&text).unwrap_or_else(|e| {
        log::warn!("Ignoring {}: {e}", path.display());
        Settings::default()
    })
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

/// Resolved settings as pretty-printed TOML for display.
pub fn settings_string(settings: &Settings) -> io::Result<String> {
    toml::to_string_pretty(settings).map_err(io::Error::other)
}

/// Write `settings` to `path`, replacing the file atomically.
pub fn save_settings_to(path: &Path, settings: &Settings) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let serialized = settings_string(settings)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, serialized)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("settings.toml"));
        assert_eq!(s, Settings::default());
        assert_eq!(s.threads(), DEFAULT_THREADS);
        assert_eq!(s.chunk_size(), DEFAULT_CHUNK_SIZE);
        assert_eq!(s.max_file_size(), DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[defaults\nthreads = ").unwrap();
        assert_eq!(load_settings_from(&path), Settings::default());
    }

    #[test]
    fn test_sizes_accept_numbers_and_text() {
        let s = Settings::from_toml(
            r#"
            [defaults]
            regions = ["USA", "EUR"]
            threads = 8
            chunk_size = "1MiB"
            max_file_size = 4096
            "#,
        )
        .unwrap();
        assert_eq!(s.defaults.regions, vec!["USA", "EUR"]);
        assert_eq!(s.threads(), 8);
        assert_eq!(s.chunk_size(), 1024 * 1024);
        assert_eq!(s.max_file_size(), 4096);
    }

    #[test]
    fn test_bad_size_falls_back() {
        let s = Settings::from_toml("[defaults]\nchunk_size = \"lots\"\n").unwrap();
        assert_eq!(s.chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let mut s = Settings::default();
        s.defaults.languages = vec!["en".into()];
        s.defaults.language_weight = Some(5);
        save_settings_to(&path, &s).unwrap();
        assert_eq!(load_settings_from(&path), s);
    }
}
