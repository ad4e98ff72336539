//! AI-generated narrative insights.
//!
//! The generator is an external service behind [`InsightGenerator`]. The
//! dashboard hands it at most the newest [`MAX_CONTEXT_ROWS`] rows and runs
//! the call on a background thread through [`InsightTask`], so the
//! aggregation pipeline never waits on it. A failed call is not an error
//! for the dashboard: it turns into [`InsightData::unavailable()`].

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, TryRecvError},
    },
    thread,
    time::Duration,
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{error::InsightError, value::Row};

pub const MAX_CONTEXT_ROWS: usize = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightData {
    pub summary: String,
    #[serde(default)]
    pub trends: Vec<String>,
    #[serde(default)]
    pub anomalies: Vec<String>,
}

impl InsightData {
    /// Placeholder shown when the generator failed.
    pub fn unavailable() -> Self {
        Self {
            summary: "Sorry, insights are unavailable right now. Try refreshing them later."
                .to_string(),
            trends: Vec::new(),
            anomalies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "insights", rename_all = "snake_case")]
pub enum InsightState {
    #[default]
    NotRequested,
    Pending,
    Ready(InsightData),
}

impl InsightState {
    pub fn data(&self) -> Option<&InsightData> {
        match self {
            InsightState::Ready(data) => Some(data),
            _ => None,
        }
    }
}

pub trait InsightGenerator: Send + Sync {
    fn generate(&self, table: &str, rows: &[Row]) -> Result<InsightData, InsightError>;
}

impl<G: InsightGenerator + ?Sized> InsightGenerator for Arc<G> {
    fn generate(&self, table: &str, rows: &[Row]) -> Result<InsightData, InsightError> {
        (**self).generate(table, rows)
    }
}

/// The newest `limit` rows, capped at [`MAX_CONTEXT_ROWS`].
pub fn context_window(rows: &[Row], limit: usize) -> &[Row] {
    let limit = limit.min(MAX_CONTEXT_ROWS);
    &rows[rows.len().saturating_sub(limit)..]
}

/// One in-flight generator call.
#[derive(Debug)]
pub struct InsightTask {
    receiver: Receiver<Result<InsightData, InsightError>>,
    cancelled: Arc<AtomicBool>,
}

impl InsightTask {
    pub fn spawn(
        generator: Arc<dyn InsightGenerator>,
        table: String,
        rows: Vec<Row>,
    ) -> Result<Self, InsightError> {
        let (sender, receiver) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        thread::Builder::new()
            .name("insights".to_string())
            .spawn(move || {
                debug!("Requesting insights for '{table}' over {} row(s)", rows.len());
                let outcome = generator.generate(&table, &rows);
                if !flag.load(Ordering::Acquire) {
                    let _ = sender.send(outcome);
                }
            })
            .map_err(|err| InsightError::Worker(err.to_string()))?;
        Ok(Self {
            receiver,
            cancelled,
        })
    }

    /// The outcome once the call has finished, `None` while still running.
    pub fn try_result(&self) -> Option<Result<InsightData, InsightError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(InsightError::Cancelled)),
        }
    }

    /// Blocks up to `timeout` for the outcome.
    pub fn wait(&self, timeout: Duration) -> Option<Result<InsightData, InsightError>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(Err(InsightError::Cancelled)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Drop for InsightTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Settings for [`HttpInsightGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightSettings {
    /// Base URL of an OpenAI-compatible API.
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub context_rows: usize,
    pub timeout_secs: u64,
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            context_rows: MAX_CONTEXT_ROWS,
            timeout_secs: 30,
        }
    }
}

/// Chat-completions client asking for `{summary, trends, anomalies}` JSON.
#[derive(Debug, Clone)]
pub struct HttpInsightGenerator {
    settings: InsightSettings,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl HttpInsightGenerator {
    pub fn new(settings: InsightSettings, api_key: String) -> Result<Self, InsightError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            settings,
            api_key,
            client,
        })
    }

    /// Reads the API key from the environment variable named in `settings`.
    pub fn from_env(settings: InsightSettings) -> Result<Self, InsightError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                InsightError::NotConfigured(format!(
                    "environment variable {} is not set",
                    settings.api_key_env
                ))
            })?;
        Self::new(settings, api_key)
    }

    fn prompt(table: &str, rows: &[Row]) -> Result<String, InsightError> {
        let sample = serde_json::to_string(rows)
            .map_err(|err| InsightError::Parse(format!("serializing rows: {err}")))?;
        Ok(format!(
            r#"You are a financial analyst. Below are the most recent {count} rows of the table "{table}" as JSON.

{sample}

Describe what the data shows. Return ONLY valid JSON in this exact format:
{{
  "summary": "Two or three sentences on overall performance",
  "trends": ["Trend 1", "Trend 2"],
  "anomalies": ["Anomaly 1"]
}}"#,
            count = rows.len(),
        ))
    }
}

impl InsightGenerator for HttpInsightGenerator {
    fn generate(&self, table: &str, rows: &[Row]) -> Result<InsightData, InsightError> {
        let rows = context_window(rows, self.settings.context_rows);
        let prompt = Self::prompt(table, rows)?;
        let body = json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": "You are a precise JSON-only responder. Always return valid JSON, no other text."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.2,
        });

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.settings.endpoint.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!("Insight service answered {status}");
            return Err(InsightError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let payload: serde_json::Value = response.json()?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| InsightError::Parse("response has no message content".to_string()))?;
        parse_insight_content(content)
    }
}

/// Parses the model's reply, tolerating a surrounding markdown code fence.
pub fn parse_insight_content(content: &str) -> Result<InsightData, InsightError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced.trim()).map_err(|err| InsightError::Parse(err.to_string()))
}
