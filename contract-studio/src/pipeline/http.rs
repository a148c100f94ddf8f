//! Remote agent service backend
//!
//! Talks to an agent service that wraps the pipeline over HTTP:
//! - `POST {base_url}/run` with `{"prompt": ..., "model_choice": ...}`
//! - the response body is newline-delimited JSON, a run of
//!   `{"type": "log", "text": ...}` frames followed by a single
//!   `{"type": "result", "result": ..., "final_log": ...}` frame
//! - `{"type": "error", "message": ...}` reports a failure inside the pipeline
//!
//! Log frames carry new output only; the backend accumulates them so the
//! log sink always receives the full text.

use super::{ContractPipeline, LogSink, PipelineError, PipelineRequest, PipelineRun, RawResult};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Pipeline reached through a remote agent service
pub struct HttpPipeline {
    client: Client,
    base_url: String,
    name: String,
}

impl HttpPipeline {
    /// Create a backend for the service at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PipelineError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let name = format!("http:{}", base_url);

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            name,
        })
    }
}

/// Request body sent to the agent service
#[derive(Serialize)]
struct RunRequest<'a> {
    prompt: &'a str,
    model_choice: &'a str,
}

/// One line of the response stream
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Frame {
    Log {
        text: String,
    },
    Result {
        result: Value,
        #[serde(default)]
        final_log: Option<String>,
    },
    Error {
        message: String,
    },
}

/// Accumulates streamed frames until the result arrives
#[derive(Default)]
struct FrameReader {
    pending: Vec<u8>,
    log: String,
}

impl FrameReader {
    /// Feed raw body bytes; returns the run once a result frame is seen
    fn feed(
        &mut self,
        bytes: &[u8],
        on_log: &LogSink,
    ) -> Result<Option<PipelineRun>, PipelineError> {
        self.pending.extend_from_slice(bytes);

        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            if let Some(run) = self.handle_line(&line, on_log)? {
                return Ok(Some(run));
            }
        }

        Ok(None)
    }

    /// Flush a final line that had no trailing newline
    fn finish(&mut self, on_log: &LogSink) -> Result<Option<PipelineRun>, PipelineError> {
        let line = std::mem::take(&mut self.pending);
        self.handle_line(&line, on_log)
    }

    fn handle_line(
        &mut self,
        line: &[u8],
        on_log: &LogSink,
    ) -> Result<Option<PipelineRun>, PipelineError> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        match serde_json::from_slice::<Frame>(line)? {
            Frame::Log { text } => {
                self.log.push_str(&text);
                on_log(&self.log);
                Ok(None)
            }
            Frame::Result { result, final_log } => Ok(Some(PipelineRun {
                result: RawResult::from_json(result),
                final_log,
            })),
            Frame::Error { message } => Err(PipelineError::Raised(message)),
        }
    }
}

#[async_trait]
impl ContractPipeline for HttpPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        request: &PipelineRequest,
        on_log: LogSink,
    ) -> Result<PipelineRun, PipelineError> {
        let url = format!("{}/run", self.base_url);
        info!(url = %url, model = %request.model, "Starting remote pipeline run");

        let response = self
            .client
            .post(&url)
            .json(&RunRequest {
                prompt: &request.prompt,
                model_choice: request.model.id(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Raised(format!("HTTP {}: {}", status, body)));
        }

        let mut reader = FrameReader::default();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            if let Some(run) = reader.feed(&chunk?, &on_log)? {
                debug!(log_len = reader.log.len(), "Remote pipeline returned a result");
                return Ok(run);
            }
        }

        reader.finish(&on_log)?.ok_or(PipelineError::MissingResult)
    }
}
