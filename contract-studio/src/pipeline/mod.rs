//! Contract pipeline abstraction and backends
//!
//! The agent pipeline (generation, compile/deploy validation, refinement)
//! lives outside this crate. Everything here is about reaching it: the call
//! signature, the log callback, and the shapes it returns.

mod demo;
mod http;
#[cfg(feature = "python")]
mod python;
mod result;

pub use demo::DemoPipeline;
pub use http::HttpPipeline;
#[cfg(feature = "python")]
pub use python::PythonPipeline;
pub use result::{
    Clause, ContractResult, RawClause, RawResult, ResultFields, ResultShapeError,
};

use crate::PipelineConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while running the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Pipeline raised an error: {0}")]
    Raised(String),

    #[error("Pipeline finished without returning a result")]
    MissingResult,

    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),

    #[error("Unknown pipeline backend: {0}")]
    UnknownBackend(String),

    #[error("Pipeline backend '{backend}' requires the `{feature}` feature")]
    FeatureDisabled {
        backend: String,
        feature: &'static str,
    },
}

/// Generation model offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelChoice {
    #[default]
    Gemini,
    FsmPretrained,
}

impl ModelChoice {
    /// All options, in the order they are offered
    pub const ALL: [ModelChoice; 2] = [ModelChoice::Gemini, ModelChoice::FsmPretrained];

    /// Identifier passed to the pipeline
    pub fn id(&self) -> &'static str {
        match self {
            ModelChoice::Gemini => "gemini",
            ModelChoice::FsmPretrained => "fsm_pretrained",
        }
    }

    /// Label shown in the model selector
    pub fn label(&self) -> &'static str {
        match self {
            ModelChoice::Gemini => "Gemini 2.0 Flash",
            ModelChoice::FsmPretrained => "FSM Fine-Tuned TinyLlama",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Log callback handed to the pipeline.
///
/// Each call carries the full log text accumulated so far, not a delta.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// A single generation request
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    pub prompt: String,
    pub model: ModelChoice,
}

impl PipelineRequest {
    pub fn new(prompt: impl Into<String>, model: ModelChoice) -> Self {
        Self {
            prompt: prompt.into(),
            model,
        }
    }
}

/// What the pipeline hands back when it returns
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub result: RawResult,
    /// Complete log text, when the pipeline reports one
    pub final_log: Option<String>,
}

/// Trait for contract pipeline backends
#[async_trait]
pub trait ContractPipeline: Send + Sync {
    /// Backend name for logging/identification
    fn name(&self) -> &str;

    /// Run generation, validation and refinement for one prompt.
    ///
    /// `on_log` may be called any number of times before this returns.
    async fn run(
        &self,
        request: &PipelineRequest,
        on_log: LogSink,
    ) -> Result<PipelineRun, PipelineError>;
}

/// Build the backend selected by `config.backend`
pub fn build_pipeline(config: &PipelineConfig) -> Result<Arc<dyn ContractPipeline>, PipelineError> {
    match config.backend.as_str() {
        "demo" => Ok(Arc::new(DemoPipeline::new(Duration::from_millis(
            config.demo_step_delay_ms,
        )))),
        "http" => Ok(Arc::new(HttpPipeline::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?)),
        #[cfg(feature = "python")]
        "python" => Ok(Arc::new(PythonPipeline::new(
            &config.module,
            &config.function,
            config.python_path.clone(),
        ))),
        #[cfg(not(feature = "python"))]
        "python" => Err(PipelineError::FeatureDisabled {
            backend: "python".to_string(),
            feature: "python",
        }),
        other => Err(PipelineError::UnknownBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_choice_ids() {
        assert_eq!(ModelChoice::Gemini.id(), "gemini");
        assert_eq!(ModelChoice::FsmPretrained.id(), "fsm_pretrained");
        assert_eq!(ModelChoice::from_id("fsm_pretrained"), Some(ModelChoice::FsmPretrained));
        assert_eq!(ModelChoice::from_id("gpt4"), None);
        assert_eq!(ModelChoice::default(), ModelChoice::Gemini);
    }

    #[test]
    fn test_model_choice_serde_matches_ids() {
        for model in ModelChoice::ALL {
            let json = serde_json::to_string(&model).unwrap();
            assert_eq!(json, format!("\"{}\"", model.id()));
        }
    }

    #[test]
    fn test_build_pipeline_backends() {
        let mut config = PipelineConfig::default();
        assert_eq!(build_pipeline(&config).unwrap().name(), "demo");

        config.backend = "http".to_string();
        assert!(build_pipeline(&config).unwrap().name().starts_with("http:"));

        config.backend = "carrier-pigeon".to_string();
        assert!(matches!(
            build_pipeline(&config),
            Err(PipelineError::UnknownBackend(name)) if name == "carrier-pigeon"
        ));
    }

    #[cfg(not(feature = "python"))]
    #[test]
    fn test_python_backend_needs_feature() {
        let config = PipelineConfig {
            backend: "python".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            build_pipeline(&config),
            Err(PipelineError::FeatureDisabled { .. })
        ));
    }
}
