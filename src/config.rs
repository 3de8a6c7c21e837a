use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;

/// Environment variable holding the backend base URL
pub const BACKEND_URL_ENV: &str = "RAFIKI_BACKEND_URL";

/// Address the companion backend listens on when nothing else is configured
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001/api";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub backend_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `config.json` from the user's config directory.
    /// A missing file is not an error.
    pub fn load() -> Result<Self> {
        match config_dir() {
            Some(dir) => Self::load_from(&dir.join("config.json")),
            None => Ok(Self::new()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    /// Resolve the backend base URL once at startup: CLI flag, then
    /// `RAFIKI_BACKEND_URL`, then the config file, then the default.
    pub fn resolve_backend_url(&self, flag: Option<&str>) -> String {
        let env = std::env::var(BACKEND_URL_ENV).ok();
        self.resolve_backend_url_with(flag, env.as_deref())
    }

    pub fn resolve_backend_url_with(&self, flag: Option<&str>, env: Option<&str>) -> String {
        let chosen = [flag, env, self.backend_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BACKEND_URL);

        chosen.trim_end_matches('/').to_string()
    }
}

/// `<config_dir>/rafiki`, shared by the config file and the preference store
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rafiki"))
}
