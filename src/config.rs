use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::util::{is_local_endpoint_url, parse_bool_flag};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub show_tool_results: bool,
    pub settings_path: PathBuf,
    pub working_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_base_url = std::env::var("CCUI_API_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let request_timeout = match std::env::var("CCUI_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid CCUI_REQUEST_TIMEOUT_SECS '{raw}'"))?;
                Duration::from_secs(secs.clamp(1, MAX_REQUEST_TIMEOUT_SECS))
            }
            Err(_) => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let show_tool_results = std::env::var("CCUI_SHOW_TOOL_RESULTS")
            .ok()
            .and_then(parse_bool_flag)
            .unwrap_or(false);

        let settings_path = std::env::var("CCUI_SETTINGS_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_settings_path);

        Ok(Self {
            api_base_url,
            request_timeout,
            show_tool_results,
            settings_path,
            working_dir: std::env::current_dir()?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            bail!(
                "Invalid CCUI_API_BASE_URL '{}': expected http:// or https:// URL",
                self.api_base_url
            );
        }
        Ok(())
    }

    pub fn is_local_backend(&self) -> bool {
        is_local_endpoint_url(&self.api_base_url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            show_tool_results: false,
            settings_path: default_settings_path(),
            working_dir: PathBuf::from("."),
        }
    }
}

fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ccui")
        .join("settings.json")
}
