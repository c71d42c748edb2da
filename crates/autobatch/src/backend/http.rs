//! HTTP implementation of [`JobBackend`] over the batch-automation REST API.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use super::{
    CloneJobRequest, CreateJobRequest, JobBackend, JobRecord, JobStatusRecord, RequestError,
    StatusUpdateRequest,
};
use crate::config::OrchestratorConfig;

/// Maximum length for error bodies carried in errors and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Path prefix for every batch-automation endpoint.
const API_PREFIX: &str = "batch-automation";

fn truncate_error_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    }
}

/// Backend client talking to `{base_url}/batch-automation/...`.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, RequestError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            RequestError::Client(format!("Invalid backend URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RequestError::Client(format!(
                "Backend URL '{}' cannot be used as a base",
                base_url
            )));
        }

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| RequestError::Client(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, RequestError> {
        Self::new(
            &config.backend_url,
            config.connect_timeout(),
            config.request_timeout(),
        )
    }

    /// Builds `{base}/batch-automation/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RequestError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                RequestError::Client(format!(
                    "Backend URL '{}' cannot be used as a base",
                    self.base_url
                ))
            })?;
            path.pop_if_empty().push(API_PREFIX).extend(segments);
        }
        Ok(url)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<reqwest::Response, RequestError> {
        let response = request.send().await.map_err(|e| RequestError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<T, RequestError> {
        let response = self.send(request, url).await?;
        response.json::<T>().await.map_err(|e| RequestError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl JobBackend for HttpBackend {
    async fn list_jobs(&self, owner_id: &str) -> Result<Vec<JobRecord>, RequestError> {
        let url = self.endpoint(&["jobs"])?;
        debug!("Listing jobs for owner {}", owner_id);
        let request = self.client.get(url.clone()).query(&[("user_id", owner_id)]);
        self.send_json(request, &url).await
    }

    async fn fetch_status(
        &self,
        job_id: &str,
        owner_id: &str,
    ) -> Result<JobStatusRecord, RequestError> {
        let url = self.endpoint(&["jobs", job_id, "status"])?;
        let request = self.client.get(url.clone()).query(&[("user_id", owner_id)]);
        self.send_json(request, &url).await
    }

    async fn create_job(
        &self,
        request: &CreateJobRequest,
    ) -> Result<JobStatusRecord, RequestError> {
        let url = self.endpoint(&["jobs"])?;
        debug!(
            "Creating {} job '{}' for folder {}",
            request.process_type, request.title, request.folder_path
        );
        let builder = self.client.post(url.clone()).json(request);
        self.send_json(builder, &url).await
    }

    async fn clone_job(
        &self,
        request: &CloneJobRequest,
    ) -> Result<JobStatusRecord, RequestError> {
        let url = self.endpoint(&["jobs", &request.source_job_id, "clone"])?;
        let builder = self.client.post(url.clone()).json(request);
        self.send_json(builder, &url).await
    }

    async fn update_status(
        &self,
        request: &StatusUpdateRequest,
    ) -> Result<JobStatusRecord, RequestError> {
        let url = self.endpoint(&["jobs", &request.job_id, "status"])?;
        let builder = self.client.put(url.clone()).json(request);
        self.send_json(builder, &url).await
    }

    async fn delete_job(&self, job_id: &str, owner_id: &str) -> Result<(), RequestError> {
        let url = self.endpoint(&["jobs", job_id])?;
        let request = self
            .client
            .delete(url.clone())
            .query(&[("user_id", owner_id)]);
        self.send(request, &url).await?;
        Ok(())
    }
}
