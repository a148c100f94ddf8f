//! Contract Studio - web front end for an agentic smart contract pipeline
//!
//! This crate provides:
//! - An axum server that renders the onboarding and generator pages
//! - Per-browser session state (onboarding flag, chat history, live log)
//! - Live pipeline logs streamed to the browser over Server-Sent Events
//! - ANSI-stripping and HTML-escaping for log display
//! - Backends for reaching the external pipeline (Python, HTTP, demo)

pub mod api;
pub mod logview;
pub mod pipeline;
pub mod prompts;
pub mod render;
pub mod session;

pub use api::{create_router, ApiState};
pub use pipeline::{ContractPipeline, ContractResult, ModelChoice, PipelineRequest, RawResult};
pub use session::{SessionState, SessionStore};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the studio server
#[derive(Debug, Clone, serde::Deserialize)]
pub struct StudioConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Height of the live log panel (px)
    #[serde(default = "default_log_height_px")]
    pub log_height_px: u32,

    /// Idle time after which a session is discarded
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// How often expired sessions are swept
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Pipeline backend configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_bind_addr() -> String { "0.0.0.0:8501".to_string() }
fn default_log_height_px() -> u32 { logview::LOG_HEIGHT_PX }
fn default_session_ttl_secs() -> u64 { 3600 }
fn default_sweep_interval_secs() -> u64 { 60 }

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_height_px: default_log_height_px(),
            session_ttl_secs: default_session_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl StudioConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Apply `CONTRACT_STUDIO_*` overrides using `lookup` to read variables
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind_addr) = lookup("CONTRACT_STUDIO_BIND") {
            self.bind_addr = bind_addr;
        }
        if let Some(url) = lookup("CONTRACT_STUDIO_PIPELINE_URL") {
            self.pipeline.backend = "http".to_string();
            self.pipeline.base_url = url;
        }
    }
}

/// Configuration for the pipeline backend
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PipelineConfig {
    /// Backend type: "python", "http" or "demo"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Python module holding the pipeline entry point
    #[serde(default = "default_module")]
    pub module: String,

    /// Name of the pipeline function inside `module`
    #[serde(default = "default_function")]
    pub function: String,

    /// Extra directories searched for `module`
    #[serde(default)]
    pub python_path: Vec<String>,

    /// Base URL of the remote agent service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout for the remote agent service
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between log lines of the demo backend (ms)
    #[serde(default = "default_demo_step_delay_ms")]
    pub demo_step_delay_ms: u64,
}

fn default_backend() -> String { "demo".to_string() }
fn default_module() -> String { "agent".to_string() }
fn default_function() -> String { "run_contract_pipeline".to_string() }
fn default_base_url() -> String { "http://localhost:8600".to_string() }
fn default_timeout_secs() -> u64 { 900 }
fn default_demo_step_delay_ms() -> u64 { 150 }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            module: default_module(),
            function: default_function(),
            python_path: Vec::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            demo_step_delay_ms: default_demo_step_delay_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = StudioConfig::from_toml("").unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8501");
        assert_eq!(config.log_height_px, 300);
        assert_eq!(config.session_ttl_secs, 3600);
        assert_eq!(config.pipeline.backend, "demo");
        assert_eq!(config.pipeline.module, "agent");
        assert_eq!(config.pipeline.function, "run_contract_pipeline");
    }

    #[test]
    fn test_partial_pipeline_section() {
        let config = StudioConfig::from_toml(
            r#"
            log_height_px = 480

            [pipeline]
            backend = "python"
            python_path = ["/opt/agent"]
            "#,
        )
        .unwrap();
        assert_eq!(config.log_height_px, 480);
        assert_eq!(config.pipeline.backend, "python");
        assert_eq!(config.pipeline.python_path, vec!["/opt/agent".to_string()]);
        assert_eq!(config.pipeline.timeout_secs, 900);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            StudioConfig::from_toml("log_height_px = \"tall\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = StudioConfig::load(Path::new("/nonexistent/studio.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/studio.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CONTRACT_STUDIO_BIND", "127.0.0.1:9000"),
            ("CONTRACT_STUDIO_PIPELINE_URL", "http://agent:8600"),
        ]
        .into_iter()
        .collect();

        let mut config = StudioConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.pipeline.backend, "http");
        assert_eq!(config.pipeline.base_url, "http://agent:8600");
    }
}
