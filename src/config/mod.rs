use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::DEFAULT_BASE_URL;
use crate::summary::FontBounds;
use crate::table::DEFAULT_PAGE_LENGTH;

/// Top-level trialdash config file structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DashConfig {
    pub base_url: Option<String>,
    pub page_length: usize,
    pub viewport_width: u32,
    pub font_min: u32,
    pub font_max: u32,
    pub timeout_secs: u64,
}

impl Default for DashConfig {
    fn default() -> Self {
        let fonts = FontBounds::default();
        Self {
            base_url: None,
            page_length: DEFAULT_PAGE_LENGTH,
            viewport_width: 1024,
            font_min: fonts.min,
            font_max: fonts.max,
            timeout_secs: 30,
        }
    }
}

impl DashConfig {
    /// Load config from ~/.trialdash/config.toml. Returns default if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(DashConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: DashConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;
        Ok(config)
    }

    pub fn font_bounds(&self) -> FontBounds {
        FontBounds {
            min: self.font_min,
            max: self.font_max.max(self.font_min),
        }
    }

    /// Display the effective config.
    pub fn display(&self, base_url: &str) -> String {
        [
            format!("base_url = \"{base_url}\""),
            format!("page_length = {}", self.page_length),
            format!("viewport_width = {}", self.viewport_width),
            format!("font_min = {}", self.font_min),
            format!("font_max = {}", self.font_max),
            format!("timeout_secs = {}", self.timeout_secs),
        ]
        .join("\n")
    }
}

/// Resolve the API base URL through the chain: CLI flag > env var > config > default.
pub fn resolve_base_url(cli_flag: Option<&str>, env_var_name: &str, config: &DashConfig) -> String {
    // 1. CLI flag
    if let Some(url) = cli_flag {
        if !url.is_empty() {
            return url.to_string();
        }
    }

    // 2. Environment variable
    if let Ok(val) = std::env::var(env_var_name) {
        if !val.is_empty() {
            return val;
        }
    }

    // 3. Config file
    if let Some(ref url) = config.base_url {
        if !url.is_empty() {
            return url.clone();
        }
    }

    DEFAULT_BASE_URL.to_string()
}

/// Path to the config file: ~/.trialdash/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".trialdash").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.trialdash/config.toml
# Base URL resolution order: --base-url > TRIALDASH_URL > base_url

# base_url = "https://fdaaa.trialstracker.net"
# page_length = 100
# viewport_width = 1024
# font_min = 10
# font_max = 150
# timeout_secs = 30
"#
}

/// Create the config file at `path` if it doesn't already exist.
pub fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, default_config_template())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DashConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg.page_length, DEFAULT_PAGE_LENGTH);
        assert_eq!(cfg.font_bounds(), FontBounds::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"http://localhost:8000\"\npage_length = 25\n").unwrap();
        let cfg = DashConfig::load_from(&path).unwrap();
        assert_eq!(cfg.page_length, 25);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(
            resolve_base_url(None, "TRIALDASH_TEST_UNSET_VAR", &cfg),
            "http://localhost:8000"
        );
        assert_eq!(
            resolve_base_url(Some("http://other"), "TRIALDASH_TEST_UNSET_VAR", &cfg),
            "http://other"
        );
    }

    #[test]
    fn init_writes_template_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        assert!(init_config(&path).unwrap());
        assert!(!init_config(&path).unwrap());
        // the template is all comments, so it parses to defaults
        let cfg = DashConfig::load_from(&path).unwrap();
        assert_eq!(cfg.base_url, None);
    }

    #[test]
    fn bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "page_length = \"lots\"").unwrap();
        assert!(DashConfig::load_from(&path).is_err());
    }
}
