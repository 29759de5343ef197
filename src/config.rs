//! Optional TOML configuration.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use figment::providers::{Format as _, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::format::Format;

const CONFIG_ENV: &str = "FOLDVIEW_CONFIG";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Spaces per indentation level, also the width of a tab.
    pub tab_size: usize,
    /// Formats tried, in order, when none is forced on the command line.
    pub formats: Vec<Format>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tab_size: 2,
            formats: Format::ALL.to_vec(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Config = Figment::from(Toml::file(path))
            .extract()
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tab_size == 0 {
            bail!("tab_size must be at least 1");
        }
        if self.formats.is_empty() {
            bail!("formats must name at least one format");
        }
        Ok(())
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    let base = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
        .ok()?;
    let path = base.join("foldview/config.toml");
    path.is_file().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn reads_tab_size_and_format_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "tab_size = 4\nformats = [\"yaml\", \"raw\"]\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.tab_size, 4);
        assert_eq!(config.formats, vec![Format::Yaml, Format::Raw]);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "tab_size = 8\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.tab_size, 8);
        assert_eq!(config.formats, Format::ALL.to_vec());
    }

    #[test]
    fn rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "tab_size = 0\n").unwrap();
        assert!(Config::from_file(&path).is_err());

        fs::write(&path, "formats = []\n").unwrap();
        assert!(Config::from_file(&path).is_err());

        fs::write(&path, "formats = [\"csv\"]\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }
}
