use std::env;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingo_core::model::{
    Exercise, ExerciseId, LeaderboardEntry, StepAnswer, StepFeedback, XpAward,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::BackendError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Error code the backend uses when user-written text is rejected by moderation.
pub const INAPPROPRIATE_CONTENT_CODE: &str = "inappropriate_content";

/// Final report sent when a session is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSubmission {
    pub answers: Vec<StepAnswer>,
    pub correct: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Remote content and progress backend.
#[async_trait]
pub trait ExerciseBackend: Send + Sync {
    /// Fetch an exercise with all of its steps.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the payload cannot be decoded.
    async fn fetch_exercise(&self, id: ExerciseId) -> Result<Exercise, BackendError>;

    /// Submit the answer for one step.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the answer is rejected.
    async fn submit_step(
        &self,
        id: ExerciseId,
        step_index: usize,
        answer: &StepAnswer,
    ) -> Result<StepFeedback, BackendError>;

    /// Mark a session as completed and collect the XP award.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    async fn complete_session(
        &self,
        id: ExerciseId,
        submission: &SessionSubmission,
    ) -> Result<XpAward, BackendError>;

    /// Fetch the top `limit` leaderboard entries.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    async fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, BackendError>;
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: Url,
    pub api_token: Option<String>,
}

impl BackendConfig {
    /// # Errors
    ///
    /// Returns `BackendError::InvalidBaseUrl` if `base_url` does not parse as an http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let trimmed = base_url.trim();
        let url =
            Url::parse(trimmed).map_err(|_| BackendError::InvalidBaseUrl(trimmed.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BackendError::InvalidBaseUrl(trimmed.to_string()));
        }
        Ok(Self {
            base_url: url,
            api_token: None,
        })
    }

    /// Read `LINGO_API_BASE_URL` and `LINGO_API_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidBaseUrl` if the configured URL is malformed.
    pub fn from_env() -> Result<Self, BackendError> {
        let base_url =
            env::var("LINGO_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.into());
        let token = env::var("LINGO_API_TOKEN").ok();
        Ok(Self::new(&base_url)?.with_token(token))
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.api_token = token
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty());
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// `ExerciseBackend` over the REST API.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.api_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[derive(Debug, Serialize)]
struct StepSubmission<'a> {
    answer: &'a StepAnswer,
}

#[derive(Debug, Deserialize)]
struct LeaderboardResponse {
    entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Map a non-success response body onto a `BackendError`.
pub(crate) fn error_from_body(status: StatusCode, body: &str) -> BackendError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return BackendError::HttpStatus(status);
    };

    let ErrorBody { code, message } = envelope.error;
    if code == INAPPROPRIATE_CONTENT_CODE {
        return BackendError::InappropriateContent { message };
    }

    BackendError::Api {
        status,
        code,
        message,
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(error_from_body(status, &body));
    }
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl ExerciseBackend for HttpBackend {
    async fn fetch_exercise(&self, id: ExerciseId) -> Result<Exercise, BackendError> {
        let url = self.config.endpoint(&format!("exercises/{id}"));
        tracing::debug!(%url, "fetching exercise");
        let response = self.authorize(self.client.get(url)).send().await?;
        read_json(response).await
    }

    async fn submit_step(
        &self,
        id: ExerciseId,
        step_index: usize,
        answer: &StepAnswer,
    ) -> Result<StepFeedback, BackendError> {
        let url = self
            .config
            .endpoint(&format!("exercises/{id}/steps/{step_index}"));
        tracing::debug!(%url, "submitting step");
        let response = self
            .authorize(self.client.post(url))
            .json(&StepSubmission { answer })
            .send()
            .await?;
        read_json(response).await
    }

    async fn complete_session(
        &self,
        id: ExerciseId,
        submission: &SessionSubmission,
    ) -> Result<XpAward, BackendError> {
        let url = self.config.endpoint(&format!("exercises/{id}/complete"));
        tracing::debug!(%url, "completing session");
        let response = self
            .authorize(self.client.post(url))
            .json(submission)
            .send()
            .await?;
        read_json(response).await
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, BackendError> {
        let url = self.config.endpoint("leaderboard");
        let response = self
            .authorize(self.client.get(url))
            .query(&[("limit", limit)])
            .send()
            .await?;
        let body: LeaderboardResponse = read_json(response).await?;
        Ok(body.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_inappropriate_content_error() {
        let body = r#"{ "error": { "code": "inappropriate_content", "message": "Please rephrase." } }"#;
        let err = error_from_body(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert!(matches!(
            err,
            BackendError::InappropriateContent { ref message } if message == "Please rephrase."
        ));
    }

    #[test]
    fn maps_other_structured_errors() {
        let body = r#"{ "error": { "code": "not_found", "message": "no such exercise" } }"#;
        let err = error_from_body(StatusCode::NOT_FOUND, body);
        assert!(matches!(
            err,
            BackendError::Api { status, ref code, .. }
                if status == StatusCode::NOT_FOUND && code == "not_found"
        ));
    }

    #[test]
    fn unstructured_body_falls_back_to_status() {
        let err = error_from_body(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert!(matches!(
            err,
            BackendError::HttpStatus(status) if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = BackendConfig::new("https://api.example.com/v1/").unwrap();
        assert_eq!(
            config.endpoint("/exercises/3"),
            "https://api.example.com/v1/exercises/3"
        );
    }

    #[test]
    fn rejects_non_http_base_url() {
        assert!(matches!(
            BackendConfig::new("ftp://example.com"),
            Err(BackendError::InvalidBaseUrl(_))
        ));
        assert!(BackendConfig::new("not a url").is_err());
    }

    #[test]
    fn blank_token_is_dropped() {
        let config = BackendConfig::new(DEFAULT_API_BASE_URL)
            .unwrap()
            .with_token(Some("  ".into()));
        assert!(config.api_token.is_none());
    }
}
