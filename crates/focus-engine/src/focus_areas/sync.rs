use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::api::{ApiError, FocusAreaApi};
use super::domain::{EvaluationConfig, FocusArea, FocusAreaId, ProgramId};
use super::draft::{DraftErrors, FocusAreaDraft};
use super::evaluation::{self, EvaluationErrors};
use super::tree::{normalize, select_top_level, FocusAreaNode, FocusAreaTree};

/// How loud a notification should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSeverity {
    Success,
    /// The mutation went through but the local view may be stale.
    Warning,
    Error,
}

/// One-shot, dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: NotificationSeverity,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Mutating actions that carry an in-flight flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationAction {
    Save,
    Delete,
    Evaluation,
    Selection,
}

/// Identifies one triggering control: an action, optionally on one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InFlightKey {
    pub action: MutationAction,
    pub target: Option<FocusAreaId>,
}

impl InFlightKey {
    pub fn new(action: MutationAction, target: Option<FocusAreaId>) -> Self {
        Self { action, target }
    }
}

/// Which of the two server views failed to refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("organization focus areas could not be refreshed: {0}")]
    Organization(ApiError),
    #[error("program focus areas could not be refreshed: {0}")]
    Program(ApiError),
    #[error("focus areas could not be refreshed: {organization}; {program}")]
    Both {
        organization: ApiError,
        program: ApiError,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinatorError {
    #[error("focus area form is invalid: {0}")]
    InvalidDraft(DraftErrors),
    #[error("evaluation settings are invalid: {0}")]
    InvalidEvaluation(EvaluationErrors),
    #[error("{:?} is already in progress", .0.action)]
    InFlight(InFlightKey),
    #[error("focus area {0} cannot be selected for a program")]
    NotSelectable(FocusAreaId),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

#[derive(Debug, Default)]
struct CoordinatorState {
    all: FocusAreaTree,
    selected: FocusAreaTree,
    in_flight: HashSet<InFlightKey>,
    notifications: Vec<Notification>,
}

/// Keeps the organization-wide focus area list and a program's selected focus areas in
/// step with the portal.
///
/// Every create, update, delete, and evaluation save is followed by [`reconcile`], which
/// fetches the organization list, then the program record, then merges both. Responses
/// replace the corresponding collection wholesale, so a slow refresh can overwrite a newer
/// local patch.
///
/// [`reconcile`]: FocusAreaCoordinator::reconcile
pub struct FocusAreaCoordinator<A> {
    api: Arc<A>,
    program_id: ProgramId,
    state: Mutex<CoordinatorState>,
}

/// Clears its in-flight flag when the mutation finishes, however it finishes.
struct InFlightGuard<'a> {
    state: &'a Mutex<CoordinatorState>,
    key: InFlightKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .remove(&self.key);
    }
}

impl<A> FocusAreaCoordinator<A>
where
    A: FocusAreaApi + 'static,
{
    pub fn new(api: Arc<A>, program_id: ProgramId) -> Self {
        Self {
            api,
            program_id,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    pub fn program_id(&self) -> &ProgramId {
        &self.program_id
    }

    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every focus area of the organization, for the selection dropdown.
    pub fn all_focus_areas(&self) -> Vec<FocusArea> {
        self.state().all.to_focus_areas()
    }

    /// The program's selected focus areas, for the tree display.
    pub fn selected_focus_areas(&self) -> Vec<FocusArea> {
        self.state().selected.to_focus_areas()
    }

    /// Parents that may be attached to the program.
    pub fn selectable_focus_areas(&self) -> Vec<FocusArea> {
        select_top_level(&self.all_focus_areas())
    }

    pub fn selected_ids(&self) -> Vec<FocusAreaId> {
        self.state()
            .selected
            .roots()
            .map(|node| node.id.clone())
            .collect()
    }

    /// Look a node up in the organization list first, then the program's selection.
    pub fn find(&self, id: &FocusAreaId) -> Option<FocusAreaNode> {
        let state = self.state();
        state.all.get(id).or_else(|| state.selected.get(id)).cloned()
    }

    pub fn is_in_flight(&self, key: &InFlightKey) -> bool {
        self.state().in_flight.contains(key)
    }

    /// Drain pending notifications; each is delivered once.
    pub fn take_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut self.state().notifications)
    }

    fn notify(&self, severity: NotificationSeverity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            NotificationSeverity::Error | NotificationSeverity::Warning => {
                warn!(program_id = %self.program_id, ?severity, %message, "focus area notification")
            }
            NotificationSeverity::Success => {
                debug!(program_id = %self.program_id, %message, "focus area notification")
            }
        }
        self.state().notifications.push(Notification {
            severity,
            message,
            raised_at: Utc::now(),
        });
    }

    fn begin(&self, key: InFlightKey) -> Result<InFlightGuard<'_>, CoordinatorError> {
        let mut state = self.state();
        if !state.in_flight.insert(key.clone()) {
            return Err(CoordinatorError::InFlight(key));
        }
        Ok(InFlightGuard {
            state: &self.state,
            key,
        })
    }

    /// Fetch the organization list, fetch the program record, then merge both.
    ///
    /// Each successful fetch replaces its collection even when the other one failed.
    pub async fn reconcile(&self) -> Result<(), ReconcileError> {
        let organization = self.api.list_focus_areas(&self.program_id).await;
        let program = self.api.fetch_program(&self.program_id).await;

        let mut state = self.state();
        let organization = organization.map(|areas| {
            state.all = FocusAreaTree::from_focus_areas(&normalize(areas));
        });
        let program = program.map(|program| {
            state.selected = FocusAreaTree::from_focus_areas(&normalize(program.focus_areas));
        });
        debug!(
            program_id = %self.program_id,
            all = state.all.len(),
            selected = state.selected.len(),
            "focus areas reconciled"
        );
        drop(state);

        match (organization, program) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(err), Ok(())) => Err(ReconcileError::Organization(err)),
            (Ok(()), Err(err)) => Err(ReconcileError::Program(err)),
            (Err(organization), Err(program)) => Err(ReconcileError::Both {
                organization,
                program,
            }),
        }
    }

    /// Initial or manual load; failures surface as an error notification.
    pub async fn refresh(&self) -> Result<(), CoordinatorError> {
        self.reconcile().await.map_err(|err| {
            self.notify(NotificationSeverity::Error, err.to_string());
            CoordinatorError::from(err)
        })
    }

    /// Refresh after a mutation the server already accepted.
    async fn reconcile_after(&self, done: &str) {
        if let Err(err) = self.reconcile().await {
            self.notify(
                NotificationSeverity::Warning,
                format!("{done}, but the list could not be refreshed: {err}"),
            );
        }
    }

    /// Create (draft without `id`) or update a focus area.
    pub async fn save_focus_area(
        &self,
        draft: FocusAreaDraft,
    ) -> Result<FocusArea, CoordinatorError> {
        let mut payload = draft.into_payload().map_err(CoordinatorError::InvalidDraft)?;
        if payload.program_id.is_none() {
            payload.program_id = Some(self.program_id.clone());
        }
        let creating = payload.id.is_none();

        let _guard = self.begin(InFlightKey::new(MutationAction::Save, payload.id.clone()))?;
        let saved = match self.api.save_focus_area(&payload).await {
            Ok(saved) => saved,
            Err(err) => {
                let verb = if creating { "create" } else { "update" };
                self.notify(
                    NotificationSeverity::Error,
                    format!("Failed to {verb} focus area: {err}"),
                );
                return Err(err.into());
            }
        };

        let done = if creating {
            "Focus area created"
        } else {
            "Focus area updated"
        };
        info!(id = ?saved.id, name = %saved.name, creating, "focus area saved");
        self.notify(NotificationSeverity::Success, done);
        self.reconcile_after(done).await;

        let mut normalized = normalize(vec![saved]);
        Ok(normalized.remove(0))
    }

    /// Delete a focus area; the server cascades to its children.
    pub async fn delete_focus_area(&self, id: &FocusAreaId) -> Result<(), CoordinatorError> {
        let _guard = self.begin(InFlightKey::new(MutationAction::Delete, Some(id.clone())))?;
        let remaining = match self.api.delete_focus_area(id).await {
            Ok(remaining) => remaining,
            Err(err) => {
                self.notify(
                    NotificationSeverity::Error,
                    format!("Failed to delete focus area: {err}"),
                );
                return Err(err.into());
            }
        };

        self.state().all = FocusAreaTree::from_focus_areas(&normalize(remaining));
        info!(%id, "focus area deleted");
        self.notify(NotificationSeverity::Success, "Focus area deleted");
        // The delete response does not carry the program's selection.
        self.reconcile_after("Focus area deleted").await;
        Ok(())
    }

    /// Replace the program's selection with `ids`, deduplicated in first-seen order.
    ///
    /// The whole set goes to the portal, which rejects anything that is not a top-level
    /// parent. Its answer becomes the selected collection.
    pub async fn set_selection(
        &self,
        ids: Vec<FocusAreaId>,
    ) -> Result<Vec<FocusArea>, CoordinatorError> {
        let mut seen = HashSet::new();
        let ids: Vec<FocusAreaId> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();

        let _guard = self.begin(InFlightKey::new(MutationAction::Selection, None))?;
        match self
            .api
            .set_program_focus_areas(&self.program_id, &ids)
            .await
        {
            Ok(selected) => {
                let selected = normalize(selected);
                self.state().selected = FocusAreaTree::from_focus_areas(&selected);
                info!(program_id = %self.program_id, count = ids.len(), "program focus areas updated");
                Ok(selected)
            }
            Err(err) => {
                self.notify(
                    NotificationSeverity::Error,
                    format!("Failed to update program focus areas: {err}"),
                );
                Err(err.into())
            }
        }
    }

    /// Add `id` to the selection, or remove it if already selected.
    ///
    /// Selected ids the organization list no longer holds are left out of the request. A
    /// known child is refused before anything is sent.
    pub async fn toggle_selection(
        &self,
        id: &FocusAreaId,
    ) -> Result<Vec<FocusArea>, CoordinatorError> {
        let ids = {
            let state = self.state();
            let mut ids: Vec<FocusAreaId> =
                state.selected.roots().map(|node| node.id.clone()).collect();
            if ids.contains(id) {
                ids.retain(|selected| selected != id);
            } else {
                if state.all.contains(id) && !state.all.selectable_ids().contains(id) {
                    return Err(CoordinatorError::NotSelectable(id.clone()));
                }
                ids.push(id.clone());
            }
            if !state.all.is_empty() {
                ids.retain(|selected| selected == id || state.all.contains(selected));
            }
            ids
        };
        self.set_selection(ids).await
    }

    /// Patch one node's evaluation config in both collections without a round trip.
    ///
    /// The node may be top-level or nested under any parent. Returns `false` when neither
    /// collection holds it.
    pub fn update_eval_settings(&self, id: &FocusAreaId, config: EvaluationConfig) -> bool {
        let mut state = self.state();
        let in_all = state.all.set_eval(id, config.clone());
        let in_selected = state.selected.set_eval(id, config);
        in_all || in_selected
    }

    /// Validate, persist, patch locally, then reconcile.
    pub async fn save_evaluation(
        &self,
        id: &FocusAreaId,
        config: EvaluationConfig,
    ) -> Result<EvaluationConfig, CoordinatorError> {
        let errors = evaluation::validate(&config);
        if !errors.is_empty() {
            return Err(CoordinatorError::InvalidEvaluation(errors));
        }

        let _guard = self.begin(InFlightKey::new(MutationAction::Evaluation, Some(id.clone())))?;
        let saved = match self.api.update_evaluation(id, &config).await {
            Ok(saved) => saved,
            Err(err) => {
                self.notify(
                    NotificationSeverity::Error,
                    format!("Failed to save evaluation settings: {err}"),
                );
                return Err(err.into());
            }
        };

        if !saved.same_bands(&config) {
            warn!(%id, "portal stored different evaluation bands than requested");
        }
        if !self.update_eval_settings(id, saved.clone()) {
            debug!(%id, "saved evaluation for a focus area not present locally");
        }
        info!(%id, "evaluation settings saved");
        self.notify(NotificationSeverity::Success, "Evaluation settings saved");
        self.reconcile_after("Evaluation settings saved").await;
        Ok(saved)
    }
}
