use async_trait::async_trait;

use super::domain::{EvaluationConfig, FocusArea, FocusAreaId, Program, ProgramId};

/// The portal endpoints the focus area screens talk to.
///
/// Responses are returned exactly as the server sends them; callers normalize.
#[async_trait]
pub trait FocusAreaApi: Send + Sync {
    /// `GET /api/programs/focusAreas/{programId}`
    async fn list_focus_areas(&self, program_id: &ProgramId) -> Result<Vec<FocusArea>, ApiError>;

    /// `GET /api/programs/{programId}`
    async fn fetch_program(&self, program_id: &ProgramId) -> Result<Program, ApiError>;

    /// `POST /api/programs/focusAreas`; a payload without `id` creates.
    async fn save_focus_area(&self, area: &FocusArea) -> Result<FocusArea, ApiError>;

    /// `DELETE /api/programs/focusAreas/{areaId}`
    async fn delete_focus_area(&self, area_id: &FocusAreaId) -> Result<Vec<FocusArea>, ApiError>;

    /// `PUT /api/programs/focusAreas/{programId}` with the full selected id set.
    async fn set_program_focus_areas(
        &self,
        program_id: &ProgramId,
        focus_area_ids: &[FocusAreaId],
    ) -> Result<Vec<FocusArea>, ApiError>;

    /// `PUT /api/programs/focusAreas/{focusAreaId}/eval`
    async fn update_evaluation(
        &self,
        focus_area_id: &FocusAreaId,
        config: &EvaluationConfig,
    ) -> Result<EvaluationConfig, ApiError>;
}

/// Failure talking to the portal API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("portal unreachable: {0}")]
    Transport(String),
    #[error("portal responded {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected portal payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}
