use crate::model::DEFAULT_THEME;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Optional user settings read from `config.yml`.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub default_theme: Option<String>,
}

impl Config {
    pub fn default_theme(&self) -> &str {
        self.default_theme.as_deref().unwrap_or(DEFAULT_THEME)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

/// Reads the config at `explicit`, or the per-user one. A missing file is the
/// default config; a malformed one is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok(Config::default()),
        },
    };
    if !path.exists() {
        if explicit.is_some() {
            anyhow::bail!("config file {:?} does not exist", path);
        }
        return Ok(Config::default());
    }
    let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
    parse_config(&data).with_context(|| format!("parsing {:?}", path))
}

fn parse_config(data: &str) -> Result<Config> {
    if data.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(data)?)
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "planner").map(|dirs| dirs.config_dir().join("config.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.default_theme(), "default");
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn partial_yaml_fills_the_rest() {
        let config = parse_config("default_theme: spring\nlog_level: debug\n").unwrap();
        assert_eq!(config.default_theme(), "spring");
        assert_eq!(config.log_level(), "debug");
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(parse_config("default_theme: [unclosed").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.yml"))).is_err());

        let path = dir.path().join("config.yml");
        fs::write(&path, "data_dir: /srv/planner\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/planner")));
    }
}
