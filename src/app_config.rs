use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::{
    API_MAX_PAGE_SIZE, OUTPUT_EVENT_LIMIT, OUTPUT_MAX_BUFFER_LENGTH, OUTPUT_ORDER_BY,
    OUTPUT_PAGE_SIZE, OUTPUT_SCROLL_DELAY, OUTPUT_SCROLL_THRESHOLD,
};

const CONFIG_PATH: &str = ".joboutput/config.json";
const URL_ENV: &str = "JOBOUTPUT_URL";
const TOKEN_ENV: &str = "JOBOUTPUT_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub http: HttpConfig,
    pub paging: PagingConfig,
    pub scroll: ScrollConfig,
}

impl OutputConfig {
    /// Load from `.joboutput/config.json` (if present), then overlay environment.
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::load_from(Path::new(CONFIG_PATH))?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn apply_env(&mut self) {
        if let Some(url) = non_empty_env(URL_ENV) {
            self.http.base_url = url;
        }
        if let Some(token) = non_empty_env(TOKEN_ENV) {
            self.http.token = Some(token);
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8013".to_string(),
            token: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub page_size: u64,
    pub max_page_size: u64,
    pub order_by: String,
    pub max_buffer_length: usize,
    pub event_limit: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: OUTPUT_PAGE_SIZE,
            max_page_size: API_MAX_PAGE_SIZE,
            order_by: OUTPUT_ORDER_BY.to_string(),
            max_buffer_length: OUTPUT_MAX_BUFFER_LENGTH,
            event_limit: OUTPUT_EVENT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub delay_ms: u64,
    pub threshold: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            delay_ms: OUTPUT_SCROLL_DELAY,
            threshold: OUTPUT_SCROLL_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_api_constants() {
        let cfg = OutputConfig::default();
        assert_eq!(cfg.paging.page_size, 50);
        assert_eq!(cfg.paging.max_page_size, 200);
        assert_eq!(cfg.paging.order_by, "start_line");
        assert_eq!(cfg.paging.max_buffer_length, 1000);
        assert_eq!(cfg.scroll.delay_ms, 100);
        assert_eq!(cfg.scroll.threshold, 0.1);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = OutputConfig::load_from(&tmp.path().join("config.json")).unwrap();
        assert_eq!(cfg.http.timeout_seconds, 30);
        assert!(cfg.http.token.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "http": { "base_url": "https://tower.example.com" }, "scroll": { "delay_ms": 250 } }"#,
        )
        .unwrap();
        let cfg = OutputConfig::load_from(&path).unwrap();
        assert_eq!(cfg.http.base_url, "https://tower.example.com");
        assert_eq!(cfg.http.timeout_seconds, 30);
        assert_eq!(cfg.scroll.delay_ms, 250);
        assert_eq!(cfg.scroll.threshold, 0.1);
        assert_eq!(cfg.paging.page_size, 50);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(OutputConfig::load_from(&path).is_err());
    }
}
