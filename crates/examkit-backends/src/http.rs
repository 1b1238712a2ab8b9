//! REST backend for a hosted exam service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use tracing::instrument;

use examkit_core::model::ExamDocument;
use examkit_core::report::SubmissionResult;
use examkit_core::traits::{ContentBackend, GradingBackend, SubmitRequest};

use crate::error::{from_status, from_transport, BackendError};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the exam service REST API.
///
/// Serves both exam content and grading.
pub struct HttpBackend {
    base_url: Url,
    api_key: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "base url '{base_url}' cannot hold endpoint paths"
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout_secs,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Endpoint under the base url; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.client.request(method, self.endpoint(segments));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Send a request, mapping transport failures and error statuses.
    async fn send(
        &self,
        builder: RequestBuilder,
        not_found: impl FnOnce() -> BackendError,
    ) -> Result<Response, BackendError> {
        let response = builder
            .send()
            .await
            .map_err(|e| from_transport(e, self.timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(from_status(status, body, not_found))
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let status = response.status().as_u16();
        response.json().await.map_err(|e| BackendError::ApiError {
            status,
            message: format!("failed to parse response: {e}"),
        })
    }
}

#[async_trait]
impl ContentBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn get_exam(&self, test_id: &str) -> anyhow::Result<ExamDocument> {
        let response = self
            .send(
                self.request(Method::GET, &["tests", test_id]),
                || BackendError::ExamNotFound(test_id.to_string()),
            )
            .await?;
        Ok(Self::parse(response).await?)
    }
}

#[async_trait]
impl GradingBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(answers = request.answers.len()))]
    async fn submit(
        &self,
        test_id: &str,
        request: &SubmitRequest,
    ) -> anyhow::Result<SubmissionResult> {
        let response = self
            .send(
                self.request(Method::POST, &["tests", test_id, "submissions"])
                    .json(request),
                || BackendError::ExamNotFound(test_id.to_string()),
            )
            .await?;
        Ok(Self::parse(response).await?)
    }

    #[instrument(skip(self))]
    async fn score_writing_with_ai(&self, submission_id: &str) -> anyhow::Result<SubmissionResult> {
        let response = self
            .send(
                self.request(Method::POST, &["submissions", submission_id, "ai-score"]),
                || BackendError::SubmissionNotFound(submission_id.to_string()),
            )
            .await?;
        Ok(Self::parse(response).await?)
    }
}
