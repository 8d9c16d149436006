use serde::Serialize;

use super::api::FocusAreaApi;
use super::domain::{EvaluationConfig, FocusAreaId};
use super::evaluation::{EvaluationDraft, EvaluationErrors, EvaluationField, ThresholdRanges};
use super::sync::FocusAreaCoordinator;

/// Lifecycle of the evaluation settings dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorState {
    Closed,
    Open,
    Editing,
    Saving,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    #[error("cannot {action} while the editor is {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: EditorState,
    },
    #[error("evaluation settings are invalid: {0}")]
    Invalid(EvaluationErrors),
    #[error("evaluation settings were not saved: {0}")]
    SaveFailed(String),
}

/// What the editor hands to the persistence layer once validation passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub focus_area_id: FocusAreaId,
    pub config: EvaluationConfig,
}

/// Edits one node's evaluation config: `Closed -> Open -> Editing -> Saving -> Closed`.
///
/// A rejected save keeps the editor where it was and exposes per-field errors. A failed
/// save returns to `Editing` with a transient notice instead.
#[derive(Debug, Clone)]
pub struct EvaluationEditor {
    state: EditorState,
    target: Option<FocusAreaId>,
    draft: EvaluationDraft,
    ranges: ThresholdRanges,
    errors: EvaluationErrors,
    notice: Option<String>,
}

impl Default for EvaluationEditor {
    fn default() -> Self {
        let draft = EvaluationDraft::from(&EvaluationConfig::default());
        Self {
            state: EditorState::Closed,
            target: None,
            ranges: ThresholdRanges::compute(&draft),
            draft,
            errors: EvaluationErrors::default(),
            notice: None,
        }
    }
}

impl EvaluationEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn target(&self) -> Option<&FocusAreaId> {
        self.target.as_ref()
    }

    pub fn draft(&self) -> &EvaluationDraft {
        &self.draft
    }

    pub fn ranges(&self) -> ThresholdRanges {
        self.ranges
    }

    pub fn errors(&self) -> &EvaluationErrors {
        &self.errors
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Dismiss the transient save-failure notice.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    fn transition_error(&self, action: &'static str) -> EditorError {
        EditorError::InvalidTransition {
            action,
            state: self.state,
        }
    }

    /// Load a node's config, or the default when it has none.
    pub fn open(
        &mut self,
        focus_area_id: FocusAreaId,
        current: Option<&EvaluationConfig>,
    ) -> Result<(), EditorError> {
        if self.state != EditorState::Closed {
            return Err(self.transition_error("open"));
        }

        let config = current
            .cloned()
            .unwrap_or_else(|| EvaluationConfig::default_for(Some(focus_area_id.clone())));
        self.draft = EvaluationDraft::from(&config);
        self.ranges = ThresholdRanges::compute(&self.draft);
        self.errors = EvaluationErrors::default();
        self.notice = None;
        self.target = Some(focus_area_id);
        self.state = EditorState::Open;
        Ok(())
    }

    /// Change one field (`None` clears it) and return the recomputed slider bounds.
    pub fn edit(
        &mut self,
        field: EvaluationField,
        value: Option<i32>,
    ) -> Result<ThresholdRanges, EditorError> {
        if !matches!(self.state, EditorState::Open | EditorState::Editing) {
            return Err(self.transition_error("edit"));
        }

        self.draft.set(field, value);
        self.ranges = ThresholdRanges::compute(&self.draft);
        // Shown errors only ever disappear while editing; new ones wait for the next save.
        let current = self.draft.validate();
        self.errors.retain(|shown| shown != field && current.contains(shown));
        self.state = EditorState::Editing;
        Ok(self.ranges)
    }

    /// Validate and move to `Saving`, or stay put with the field errors recorded.
    pub fn begin_save(&mut self) -> Result<SaveRequest, EditorError> {
        if !matches!(self.state, EditorState::Open | EditorState::Editing) {
            return Err(self.transition_error("save"));
        }
        let Some(focus_area_id) = self.target.clone() else {
            return Err(self.transition_error("save"));
        };

        let errors = self.draft.validate();
        let config = match self.draft.to_config(Some(focus_area_id.clone())) {
            Some(config) if errors.is_empty() => config,
            _ => {
                self.errors = errors.clone();
                return Err(EditorError::Invalid(errors));
            }
        };

        self.errors = EvaluationErrors::default();
        self.notice = None;
        self.state = EditorState::Saving;
        Ok(SaveRequest {
            focus_area_id,
            config,
        })
    }

    /// Settle a save: close and hand back the stored config, or return to `Editing`.
    pub fn finish_save(
        &mut self,
        result: Result<EvaluationConfig, String>,
    ) -> Result<EvaluationConfig, EditorError> {
        if self.state != EditorState::Saving {
            return Err(self.transition_error("finish saving"));
        }

        match result {
            Ok(saved) => {
                self.reset();
                Ok(saved)
            }
            Err(message) => {
                self.notice = Some(message.clone());
                self.state = EditorState::Editing;
                Err(EditorError::SaveFailed(message))
            }
        }
    }

    /// Run a full save through the coordinator, which also patches and reconciles its
    /// collections.
    pub async fn save<A>(
        &mut self,
        coordinator: &FocusAreaCoordinator<A>,
    ) -> Result<EvaluationConfig, EditorError>
    where
        A: FocusAreaApi + 'static,
    {
        let request = self.begin_save()?;
        let result = coordinator
            .save_evaluation(&request.focus_area_id, request.config)
            .await
            .map_err(|err| err.to_string());
        self.finish_save(result)
    }

    /// Close from any state, discarding unsaved edits.
    pub fn close(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
