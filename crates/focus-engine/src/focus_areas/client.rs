use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::api::{ApiError, FocusAreaApi};
use super::domain::{
    EvaluationConfig, FocusArea, FocusAreaId, FocusAreaSelection, Program, ProgramId,
};
use crate::config::PortalConfig;

/// `reqwest`-backed portal client.
#[derive(Debug, Clone)]
pub struct HttpFocusAreaApi {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpFocusAreaApi {
    /// Without a timeout the transport default applies.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &PortalConfig) -> Result<Self, ApiError> {
        Self::new(config.base_url.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|parsed| parsed.error)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl FocusAreaApi for HttpFocusAreaApi {
    async fn list_focus_areas(&self, program_id: &ProgramId) -> Result<Vec<FocusArea>, ApiError> {
        debug!(%program_id, "fetching organization focus areas");
        let url = self.url(&format!("/api/programs/focusAreas/{program_id}"));
        self.send(self.client.get(url)).await
    }

    async fn fetch_program(&self, program_id: &ProgramId) -> Result<Program, ApiError> {
        debug!(%program_id, "fetching program record");
        let url = self.url(&format!("/api/programs/{program_id}"));
        self.send(self.client.get(url)).await
    }

    async fn save_focus_area(&self, area: &FocusArea) -> Result<FocusArea, ApiError> {
        let url = self.url("/api/programs/focusAreas");
        self.send(self.client.post(url).json(area)).await
    }

    async fn delete_focus_area(&self, area_id: &FocusAreaId) -> Result<Vec<FocusArea>, ApiError> {
        let url = self.url(&format!("/api/programs/focusAreas/{area_id}"));
        self.send(self.client.delete(url)).await
    }

    async fn set_program_focus_areas(
        &self,
        program_id: &ProgramId,
        focus_area_ids: &[FocusAreaId],
    ) -> Result<Vec<FocusArea>, ApiError> {
        let url = self.url(&format!("/api/programs/focusAreas/{program_id}"));
        let body = FocusAreaSelection {
            focus_area_ids: focus_area_ids.to_vec(),
        };
        self.send(self.client.put(url).json(&body)).await
    }

    async fn update_evaluation(
        &self,
        focus_area_id: &FocusAreaId,
        config: &EvaluationConfig,
    ) -> Result<EvaluationConfig, ApiError> {
        let url = self.url(&format!("/api/programs/focusAreas/{focus_area_id}/eval"));
        self.send(self.client.put(url).json(config)).await
    }
}
