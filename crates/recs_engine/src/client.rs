use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use recs_core::{
    EndpointError, Endpoints, JobId, JobStatus, SavePropertyRequest, SubmitJobRequest,
    SubmitJobResponse,
};
use recs_logging::{recs_debug, recs_warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::{ApiError, EngineEvent, FailureKind, TokenProvider};

const ERROR_BODY_PREVIEW: usize = 300;
/// Most bytes read from a non-2xx body.
const ERROR_BODY_LIMIT: usize = 4 * 1024;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_result_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_result_bytes: 10 * 1024 * 1024,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// REST surface of the recommendations service.
#[async_trait::async_trait]
pub trait RecommendationsApi: Send + Sync {
    async fn submit_job(&self, request: &SubmitJobRequest) -> Result<JobId, ApiError>;

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatus, ApiError>;

    async fn job_result(&self, job_id: &JobId) -> Result<Value, ApiError>;

    async fn save_property(&self, property_id: &str) -> Result<(), ApiError>;

    async fn unsave_property(&self, property_id: &str) -> Result<(), ApiError>;
}

pub struct ReqwestApi {
    client: reqwest::Client,
    endpoints: Endpoints,
    tokens: Arc<dyn TokenProvider>,
    settings: ClientSettings,
}

impl ReqwestApi {
    pub fn new(
        settings: ClientSettings,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ApiError> {
        let endpoints = Endpoints::new(&settings.base_url).map_err(invalid_url)?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            endpoints,
            tokens,
            settings,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn with_json<T: Serialize>(
        request: reqwest::RequestBuilder,
        body: &T,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        Ok(request.header(CONTENT_TYPE, "application/json").body(bytes))
    }

    /// Sends the request and returns the body of a 2xx response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = self
            .authorize(request)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                error_detail(&body).unwrap_or_else(|| status.to_string()),
            ));
        }

        let max_bytes = self.settings.max_result_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let bytes = self.send(request).await?;
        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl RecommendationsApi for ReqwestApi {
    async fn submit_job(&self, request: &SubmitJobRequest) -> Result<JobId, ApiError> {
        let url = self.endpoints.submit();
        recs_debug!(
            "POST {} profile_id={} enriched={}",
            url,
            request.profile_id,
            request.enriched
        );
        let builder = Self::with_json(self.client.post(url), request)?;
        let response: SubmitJobResponse = self.send_json(builder).await?;
        if response.job_id.as_str().trim().is_empty() {
            return Err(ApiError::new(
                FailureKind::Decode,
                "submit response has an empty job_id",
            ));
        }
        Ok(response.job_id)
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatus, ApiError> {
        let url = self.endpoints.status(job_id).map_err(invalid_url)?;
        recs_debug!("GET {}", url);
        self.send_json(self.client.get(url)).await
    }

    async fn job_result(&self, job_id: &JobId) -> Result<Value, ApiError> {
        let url = self.endpoints.result(job_id).map_err(invalid_url)?;
        recs_debug!("GET {}", url);
        self.send_json(self.client.get(url)).await
    }

    async fn save_property(&self, property_id: &str) -> Result<(), ApiError> {
        let url = self.endpoints.save();
        recs_debug!("POST {} property_id={}", url, property_id);
        let body = SavePropertyRequest {
            property_id: property_id.to_string(),
        };
        let builder = Self::with_json(self.client.post(url), &body)?;
        self.send(builder).await.map(|_| ())
    }

    async fn unsave_property(&self, property_id: &str) -> Result<(), ApiError> {
        let url = self.endpoints.unsave(property_id).map_err(invalid_url)?;
        recs_debug!("DELETE {}", url);
        self.send(self.client.delete(url)).await.map(|_| ())
    }
}

async fn read_error_body(response: reqwest::Response) -> String {
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(Ok(chunk)) = stream.next().await {
        let room = ERROR_BODY_LIMIT - bytes.len();
        bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if bytes.len() >= ERROR_BODY_LIMIT {
            break;
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Pulls a human-readable message out of an error body.
fn error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = ["detail", "message", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str));
        if let Some(message) = message {
            return Some(message.to_string());
        }
    }
    Some(trimmed.chars().take(ERROR_BODY_PREVIEW).collect())
}

fn invalid_url(err: EndpointError) -> ApiError {
    ApiError::new(FailureKind::InvalidUrl, err.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        recs_warn!("Failed to decode response body: {}", err);
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
