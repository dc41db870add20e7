//! HTTP client for a Judge0-compatible execution service
//!
//! All runs of a submission are created with a single batch request and then
//! polled at a fixed interval until every run is terminal. There is no
//! backoff; the number of polls is capped and exceeding it is a timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{codec, JudgeClient, JudgeError, JudgeResult, JudgeStatus, JudgeTestCase};
use crate::{
    config::JudgeConfig,
    constants::{JUDGE_AUTH_HEADER, JUDGE_POLL_FIELDS},
    error::{AppError, AppResult},
};

/// Judge0 batch API client
#[derive(Debug, Clone)]
pub struct Judge0Client {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    poll_interval: Duration,
    max_polls: u32,
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    submissions: Vec<WireSubmission>,
}

#[derive(Debug, Serialize)]
struct WireSubmission {
    source_code: String,
    language_id: i32,
    stdin: String,
    expected_output: String,
}

#[derive(Debug, Deserialize)]
struct CreatedRun {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    submissions: Vec<Option<WireResult>>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    token: Option<String>,
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    status: Option<WireStatus>,
    time: Option<WireNumber>,
    memory: Option<WireNumber>,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    id: i32,
}

/// The judge reports `time` as a decimal string and `memory` as a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Number(f64),
    Text(String),
}

impl WireNumber {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl Judge0Client {
    /// Create a client from configuration
    pub fn new(config: &JudgeConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("judge HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            poll_interval: config.poll_interval,
            max_polls: config.max_polls.max(1),
        })
    }

    fn batch_url(&self) -> String {
        format!("{}/submissions/batch", self.base_url)
    }

    /// Send a request and return the body of a successful response
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, JudgeError> {
        let request = match &self.auth_token {
            Some(token) => request.header(JUDGE_AUTH_HEADER, token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| JudgeError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| JudgeError::Unavailable(e.to_string()))?;

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(JudgeError::Unavailable(format!(
                "judge responded {}: {}",
                status,
                truncate(&body)
            )));
        }
        if !status.is_success() {
            return Err(JudgeError::Protocol(format!(
                "judge rejected request with {}: {}",
                status,
                truncate(&body)
            )));
        }

        Ok(body)
    }

    /// Create all runs in one request, returning their tokens in input order
    async fn submit_batch(
        &self,
        source_code: &str,
        language_id: i32,
        test_cases: &[JudgeTestCase],
    ) -> Result<Vec<String>, JudgeError> {
        let encoded_source = codec::encode(source_code);
        let body = BatchRequest {
            submissions: test_cases
                .iter()
                .map(|tc| WireSubmission {
                    source_code: encoded_source.clone(),
                    language_id,
                    stdin: codec::encode(&tc.stdin),
                    expected_output: codec::encode(&tc.expected_output),
                })
                .collect(),
        };

        let raw = self
            .send(
                self.http
                    .post(self.batch_url())
                    .query(&[("base64_encoded", "true")])
                    .json(&body),
            )
            .await?;

        let created: Vec<CreatedRun> = serde_json::from_str(&raw)
            .map_err(|e| JudgeError::Protocol(format!("malformed batch creation response: {}", e)))?;

        if created.len() != test_cases.len() {
            return Err(JudgeError::Protocol(format!(
                "judge created {} runs for {} test cases",
                created.len(),
                test_cases.len()
            )));
        }

        created
            .into_iter()
            .enumerate()
            .map(|(i, run)| {
                run.token
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| JudgeError::Protocol(format!("judge returned no token for run {}", i)))
            })
            .collect()
    }

    /// Fetch the current state of every run in the batch
    async fn fetch_batch(&self, tokens: &[String]) -> Result<Vec<JudgeResult>, JudgeError> {
        let joined = tokens.join(",");
        let raw = self
            .send(self.http.get(self.batch_url()).query(&[
                ("tokens", joined.as_str()),
                ("base64_encoded", "true"),
                ("fields", JUDGE_POLL_FIELDS),
            ]))
            .await?;

        let batch: BatchResponse = serde_json::from_str(&raw)
            .map_err(|e| JudgeError::Protocol(format!("malformed batch response: {}", e)))?;

        if batch.submissions.len() != tokens.len() {
            return Err(JudgeError::Protocol(format!(
                "judge returned {} results for {} tokens",
                batch.submissions.len(),
                tokens.len()
            )));
        }

        batch
            .submissions
            .into_iter()
            .zip(tokens)
            .map(|(item, token)| decode_result(item, token))
            .collect()
    }

    /// Poll until every run is terminal or the poll cap is hit
    async fn wait_for_batch(&self, tokens: &[String]) -> Result<Vec<JudgeResult>, JudgeError> {
        for poll in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let results = self.fetch_batch(tokens).await?;
            let pending = results.iter().filter(|r| !r.status.is_terminal()).count();
            if pending == 0 {
                tracing::debug!(poll, runs = results.len(), "Judge batch finished");
                return Ok(results);
            }

            tracing::debug!(poll, pending, "Judge batch still running");
        }

        tracing::warn!(
            max_polls = self.max_polls,
            runs = tokens.len(),
            "Judge batch exceeded poll cap"
        );
        Err(JudgeError::Timeout {
            polls: self.max_polls,
        })
    }
}

fn decode_result(item: Option<WireResult>, token: &str) -> Result<JudgeResult, JudgeError> {
    let item = item.ok_or_else(|| JudgeError::Protocol(format!("judge lost run {}", token)))?;

    if let Some(returned) = item.token.as_deref() {
        if returned != token {
            return Err(JudgeError::Protocol(format!(
                "judge returned run {} in place of {}",
                returned, token
            )));
        }
    }

    let status_id = item
        .status
        .ok_or_else(|| JudgeError::Protocol(format!("run {} has no status", token)))?
        .id;
    let status = JudgeStatus::from_id(status_id)
        .ok_or_else(|| JudgeError::Protocol(format!("unknown judge status id {}", status_id)))?;

    Ok(JudgeResult {
        token: token.to_string(),
        status,
        stdout: codec::decode("stdout", item.stdout.as_deref())?,
        stderr: codec::decode("stderr", item.stderr.as_deref())?,
        compile_output: codec::decode("compile_output", item.compile_output.as_deref())?,
        time: item.time.as_ref().and_then(WireNumber::as_f64),
        memory: item
            .memory
            .as_ref()
            .and_then(WireNumber::as_f64)
            .map(|m| m as i64),
    })
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}

#[async_trait]
impl JudgeClient for Judge0Client {
    async fn execute(
        &self,
        source_code: &str,
        language_id: i32,
        test_cases: &[JudgeTestCase],
    ) -> Result<Vec<JudgeResult>, JudgeError> {
        if test_cases.is_empty() {
            return Err(JudgeError::Protocol("refusing to submit an empty batch".to_string()));
        }

        let tokens = self.submit_batch(source_code, language_id, test_cases).await?;
        tracing::debug!(runs = tokens.len(), language_id, "Judge batch submitted");

        self.wait_for_batch(&tokens).await
    }
}
