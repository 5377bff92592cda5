use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::http_client::organize_client;
use super::types::*;
use crate::error::ApiError;
use crate::models::OrganizeResult;

const ANALYZE_PATH: &str = "/auto-organize/analyze";
const EXTRACT_CONTENT_PATH: &str = "/auto-organize/extract-content";
const GENERATE_RULES_PATH: &str = "/auto-organize/generate-rules";
const ACTION_LOG_PATH: &str = "/actions/log";

/// Remote organize service. Every call carries the caller's bearer token.
#[async_trait]
pub trait OrganizeApi: Send + Sync {
    async fn analyze(
        &self,
        token: &str,
        request: &AnalyzeRequest,
    ) -> Result<OrganizeResult, ApiError>;

    async fn extract_content(
        &self,
        token: &str,
        request: &ExtractContentRequest,
    ) -> Result<ExtractContentResponse, ApiError>;

    async fn generate_rules(
        &self,
        token: &str,
        request: &GenerateRulesRequest,
    ) -> Result<GenerateRulesResponse, ApiError>;

    /// Only success or failure matters; the acknowledgment body is ignored
    async fn log_action(&self, token: &str, request: &ActionLogRequest) -> Result<(), ApiError>;
}

/// HTTP implementation of [`OrganizeApi`]
pub struct HttpOrganizeApi {
    client: Client,
    /// e.g. `http://localhost:8085/api`
    base_url: String,
}

impl HttpOrganizeApi {
    /// Use the shared pooled client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(organize_client().clone(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send `body` and fail on any non-success status
    async fn send<B>(&self, path: &str, token: &str, body: &B) -> Result<Response, ApiError>
    where
        B: Serialize + Sync,
    {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(path, status = status.as_u16(), "Organize service returned error");
            return Err(status_error(status, body));
        }
        Ok(response)
    }

    async fn post<B, R>(&self, path: &str, token: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.send(path, token, body)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Classify a non-success status
pub fn status_error(status: StatusCode, body: String) -> ApiError {
    if status == StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized
    } else {
        ApiError::Service {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl OrganizeApi for HttpOrganizeApi {
    async fn analyze(
        &self,
        token: &str,
        request: &AnalyzeRequest,
    ) -> Result<OrganizeResult, ApiError> {
        self.post(ANALYZE_PATH, token, request).await
    }

    async fn extract_content(
        &self,
        token: &str,
        request: &ExtractContentRequest,
    ) -> Result<ExtractContentResponse, ApiError> {
        self.post(EXTRACT_CONTENT_PATH, token, request).await
    }

    async fn generate_rules(
        &self,
        token: &str,
        request: &GenerateRulesRequest,
    ) -> Result<GenerateRulesResponse, ApiError> {
        self.post(GENERATE_RULES_PATH, token, request).await
    }

    async fn log_action(&self, token: &str, request: &ActionLogRequest) -> Result<(), ApiError> {
        self.send(ACTION_LOG_PATH, token, request).await?;
        Ok(())
    }
}
