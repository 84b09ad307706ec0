use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::client::{JobsApi, LogBatch};
use crate::config::ApiConfig;
use crate::error::{AppError, Result};
use crate::models::{FetchCursor, JobDetails, RawLogRecord, RunSnapshot};

/// HTTP implementation of [`JobsApi`] backed by reqwest
#[derive(Clone)]
pub struct HttpJobsApi {
    client: Client,
    base_url: String,
}

/// Wire shape of `GET /api/logs/jobs` responses
#[derive(Debug, Deserialize)]
struct LogQueryResponse {
    hits: LogQueryHits,
}

#[derive(Debug, Deserialize)]
struct LogQueryHits {
    #[serde(default)]
    hits: Vec<RawLogRecord>,

    #[serde(default)]
    sort: Option<FetchCursor>,
}

/// Error body shape returned by the API on failures
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl HttpJobsApi {
    /// Create a new API client from configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Encode cursor values as repeated `search_after` query parameters;
    /// an empty cursor produces no parameters (full replay).
    fn cursor_params(cursor: &FetchCursor) -> Vec<(&'static str, String)> {
        cursor
            .iter()
            .map(|value| {
                let encoded = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                ("search_after", encoded)
            })
            .collect()
    }

    /// Check the response status and deserialize the body.
    /// Non-2xx responses surface as `AppError::Api { status, message }`.
    async fn handle<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        Err(AppError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl JobsApi for HttpJobsApi {
    async fn get_job(&self, job_id: Uuid) -> Result<JobDetails> {
        let response = self
            .client
            .get(self.url(&format!("/api/jobs/{}", job_id)))
            .send()
            .await?;
        Self::handle(response).await
    }

    async fn create_run(&self, job_id: Uuid) -> Result<RunSnapshot> {
        debug!(job_id = %job_id, "Triggering manual run");
        let response = self
            .client
            .post(self.url(&format!("/api/jobs/{}/runs", job_id)))
            .send()
            .await?;
        Self::handle(response).await
    }

    async fn get_run(&self, job_id: Uuid, run_id: Uuid) -> Result<RunSnapshot> {
        let response = self
            .client
            .get(self.url(&format!("/api/jobs/{}/runs/{}", job_id, run_id)))
            .send()
            .await?;
        Self::handle(response).await
    }

    async fn fetch_logs(&self, run_id: Uuid, cursor: &FetchCursor) -> Result<LogBatch> {
        let mut query: Vec<(&str, String)> = vec![("q", run_id.to_string())];
        query.extend(Self::cursor_params(cursor));

        let response = self
            .client
            .get(self.url("/api/logs/jobs"))
            .query(&query)
            .send()
            .await?;
        let body: LogQueryResponse = Self::handle(response).await?;

        Ok(LogBatch {
            records: body.hits.hits,
            cursor: body.hits.sort,
        })
    }

    async fn stop_run(&self, stop_url: &str) -> Result<()> {
        debug!(url = %stop_url, "Requesting run cancellation");
        let response = self.client.post(stop_url).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_params_encoding() {
        let cursor: FetchCursor = vec![json!(1741946813000_i64), json!("run-7")];
        let params = HttpJobsApi::cursor_params(&cursor);

        assert_eq!(
            params,
            vec![
                ("search_after", "1741946813000".to_string()),
                ("search_after", "run-7".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_cursor_produces_no_params() {
        assert!(HttpJobsApi::cursor_params(&Vec::new()).is_empty());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = HttpJobsApi::new(&ApiConfig {
            base_url: "http://localhost:5000/".to_string(),
            ..ApiConfig::default()
        })
        .unwrap();

        assert_eq!(api.url("/api/jobs"), "http://localhost:5000/api/jobs");
    }

    #[test]
    fn test_log_query_response_parses() {
        let body: LogQueryResponse = serde_json::from_value(json!({
            "hits": {
                "hits": [
                    {"timestamp": "2025-03-14T09:26:53Z", "level": "INFO", "message": "start"}
                ],
                "sort": [1741946813000_i64, "run-7"]
            }
        }))
        .unwrap();

        assert_eq!(body.hits.hits.len(), 1);
        assert_eq!(body.hits.sort.unwrap().len(), 2);
    }

    #[test]
    fn test_log_query_response_tolerates_missing_sort() {
        let body: LogQueryResponse = serde_json::from_value(json!({
            "hits": {"hits": []}
        }))
        .unwrap();

        assert!(body.hits.hits.is_empty());
        assert!(body.hits.sort.is_none());
    }
}
