use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const API_KEY_VARS: [&str; 2] = ["ANTHROPIC_API_KEY", "VITE_ANTHROPIC_API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub api_url: Option<String>,
}

fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_url: None,
        }
    }
}

impl AppConfig {
    /// Get the path to the config file in the user's config dir
    pub fn config_path() -> Result<PathBuf, AppError> {
        let data_dir = dirs::config_dir()
            .ok_or_else(|| AppError::ConfigError("Cannot find config directory".into()))?;
        Ok(data_dir.join("chart-roast").join("config.json"))
    }

    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self, AppError> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let config: AppConfig = serde_json::from_str(&contents)
                .map_err(|e| AppError::ConfigError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from disk, then layer process environment overrides on top.
    /// This is what every analysis call uses, so the credential is read at call time.
    pub fn load_with_env() -> Result<Self, AppError> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Save config to disk
    pub fn save(&self) -> Result<(), AppError> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    /// Blank values are treated as unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = API_KEY_VARS.iter().find_map(|name| get(*name)) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(model) = get("CHART_ROAST_MODEL") {
            self.model = model.trim().to_string();
        }
        if let Some(raw) = get("CHART_ROAST_MAX_TOKENS") {
            self.max_tokens = raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!("CHART_ROAST_MAX_TOKENS is not a number: {}", raw))
            })?;
        }
        if let Some(url) = get("CHART_ROAST_API_URL") {
            self.api_url = Some(url.trim().to_string());
        }
        Ok(())
    }

    /// The configured API key, if any non-blank one is present.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
