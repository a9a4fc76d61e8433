//! Oracle client abstraction.
//!
//! A single request primitive wrapping a hosted language model, consulted
//! when the association store has no answer. Supports a real HTTP-backed
//! implementation (OpenAI-compatible chat completions) and a scripted client
//! for testing. Prompt construction, response parsing, and validation live
//! in the task layer (`tasks`), not here.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Retry budget for answers that fail validation against the option set.
    pub max_attempts: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5:3b".to_string(),
            api_key: None,
            timeout_secs: 30,
            max_attempts: 3,
        }
    }
}

/// Oracle errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Oracle returned empty response")]
    EmptyResponse,

    #[error("Invalid response payload: {0}")]
    Parse(String),

    #[error("Oracle answered outside the option set: {0}")]
    OutOfOptions(String),
}

/// Blocking request primitive: one prompt in, raw text out.
///
/// Calls run to completion or error; there is no cancellation and no backoff
/// between retries above this layer.
pub trait Oracle: Send + Sync {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, OracleError>;
}

/// Real oracle backed by an OpenAI-compatible chat completions endpoint.
pub struct HttpOracle {
    config: OracleConfig,
    client: reqwest::blocking::Client,
}

impl HttpOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

impl Oracle for HttpOracle {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/v1/chat/completions", self.config.endpoint);

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.3,
            "max_tokens": 200,
        });

        let mut request = self.client.post(&url).json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.config.timeout_secs)
            } else {
                OracleError::Http(format!("Request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(OracleError::Http(format!(
                "HTTP {} from oracle endpoint",
                response.status()
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .map_err(|e| OracleError::Parse(format!("Failed to parse response: {}", e)))?;

        let text = response_json
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .ok_or(OracleError::EmptyResponse)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

/// Scripted oracle for tests: returns pre-defined responses in order,
/// repeating the last one when only one remains.
pub struct ScriptedOracle {
    responses: std::sync::Mutex<Vec<Result<String, OracleError>>>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<Result<String, OracleError>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Script that always answers with the same text.
    pub fn always(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Script that always fails.
    pub fn always_error(error: OracleError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Oracle for ScriptedOracle {
    fn complete(&self, _system: &str, prompt: &str) -> Result<String, OracleError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        if responses.len() == 1 {
            responses[0].clone()
        } else {
            responses.remove(0)
        }
    }
}
