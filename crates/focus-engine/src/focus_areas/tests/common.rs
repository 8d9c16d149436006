use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::Notify;

use crate::focus_areas::api::{ApiError, FocusAreaApi};
use crate::focus_areas::domain::{EvaluationConfig, FocusArea, FocusAreaId, Program, ProgramId};
use crate::focus_areas::draft::FocusAreaDraft;
use crate::focus_areas::repository::{FocusAreaStore, InMemoryFocusAreaStore, StoreError};
use crate::focus_areas::sync::FocusAreaCoordinator;

pub(super) fn program_id() -> ProgramId {
    ProgramId("prog-1".to_string())
}

pub(super) fn id(raw: &str) -> FocusAreaId {
    FocusAreaId(raw.to_string())
}

pub(super) fn config(min: i32, max: i32, t1: i32, t2: i32, t3: i32) -> EvaluationConfig {
    EvaluationConfig {
        focus_area_id: None,
        min_score: min,
        max_score: max,
        threshold1: t1,
        threshold2: t2,
        threshold3: t3,
    }
}

pub(super) fn default_config() -> EvaluationConfig {
    config(-1, 10, 2, 4, 6)
}

pub(super) fn area(raw_id: &str, name: &str, parent: Option<&str>) -> FocusArea {
    FocusArea {
        id: Some(id(raw_id)),
        program_id: Some(program_id()),
        name: name.to_string(),
        objective: None,
        description: None,
        criteria: None,
        is_parent: parent.is_none(),
        parent_id: parent.map(id),
        children: Vec::new(),
        eval: None,
    }
}

pub(super) fn parent_with(raw_id: &str, name: &str, children: Vec<FocusArea>) -> FocusArea {
    let mut parent = area(raw_id, name, None);
    parent.children = children;
    parent
}

/// Ids handed out by the seeded store, in creation order.
pub(super) struct Seeded {
    pub(super) leadership: FocusAreaId,
    pub(super) communication: FocusAreaId,
    pub(super) delegation: FocusAreaId,
    pub(super) feedback: FocusAreaId,
    pub(super) listening: FocusAreaId,
}

/// Two parents with children; only Leadership is selected and only Communication has
/// stored evaluation settings.
pub(super) fn seeded_store() -> (InMemoryFocusAreaStore, Seeded) {
    let store = InMemoryFocusAreaStore::new();
    store.add_program(program_id(), "Emerging Leaders");

    let save = |draft: FocusAreaDraft| {
        store
            .save(draft.into_payload().expect("valid draft"))
            .expect("store accepts draft")
            .id
            .expect("store assigns ids")
    };

    let leadership = save(FocusAreaDraft::new_parent(program_id(), "Leadership"));
    let communication = save(FocusAreaDraft::new_parent(program_id(), "Communication"));
    let delegation = save(FocusAreaDraft::new_child(
        program_id(),
        leadership.clone(),
        "Delegation",
    ));
    let feedback = save(FocusAreaDraft::new_child(
        program_id(),
        leadership.clone(),
        "Giving Feedback",
    ));
    let listening = save(FocusAreaDraft::new_child(
        program_id(),
        communication.clone(),
        "Active Listening",
    ));

    store
        .update_evaluation(&communication, config(0, 5, 1, 2, 4))
        .expect("valid evaluation");
    store
        .set_selection(&program_id(), &[leadership.clone()])
        .expect("leadership is selectable");

    (
        store,
        Seeded {
            leadership,
            communication,
            delegation,
            feedback,
            listening,
        },
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum Call {
    List,
    Program,
    Save,
    Delete,
    Selection,
    Evaluation,
}

/// Holds a call open until the test releases it.
#[derive(Clone, Default)]
pub(super) struct Gate {
    pub(super) entered: Arc<Notify>,
    pub(super) release: Arc<Notify>,
}

/// Portal double backed by the in-memory store, with failure injection and gates.
#[derive(Default)]
pub(super) struct FakePortal {
    pub(super) store: InMemoryFocusAreaStore,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<Call, usize>>,
    gates: Mutex<HashMap<Call, Gate>>,
}

impl FakePortal {
    pub(super) fn with_store(store: InMemoryFocusAreaStore) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    pub(super) fn fail_next(&self, call: Call, times: usize) {
        self.failures
            .lock()
            .expect("failure mutex poisoned")
            .insert(call, times);
    }

    /// The next `call` blocks until `gate.release` is notified.
    pub(super) fn gate(&self, call: Call) -> Gate {
        let gate = Gate::default();
        self.gates
            .lock()
            .expect("gate mutex poisoned")
            .insert(call, gate.clone());
        gate
    }

    pub(super) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("call mutex poisoned").clone()
    }

    pub(super) fn reset_calls(&self) {
        self.calls.lock().expect("call mutex poisoned").clear();
    }

    async fn enter(&self, call: Call) -> Result<(), ApiError> {
        self.calls.lock().expect("call mutex poisoned").push(call);

        let gate = self.gates.lock().expect("gate mutex poisoned").remove(&call);
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let mut failures = self.failures.lock().expect("failure mutex poisoned");
        match failures.get_mut(&call) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(ApiError::Status {
                    status: 503,
                    message: "portal offline".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

fn store_error(error: StoreError) -> ApiError {
    let status = match &error {
        StoreError::ProgramNotFound(_) | StoreError::NotFound(_) => 404,
        StoreError::Unavailable(_) => 500,
        _ => 422,
    };
    ApiError::Status {
        status,
        message: error.to_string(),
    }
}

#[async_trait]
impl FocusAreaApi for FakePortal {
    async fn list_focus_areas(&self, program_id: &ProgramId) -> Result<Vec<FocusArea>, ApiError> {
        self.enter(Call::List).await?;
        self.store.list(program_id).map_err(store_error)
    }

    async fn fetch_program(&self, program_id: &ProgramId) -> Result<Program, ApiError> {
        self.enter(Call::Program).await?;
        self.store.program(program_id).map_err(store_error)
    }

    async fn save_focus_area(&self, area: &FocusArea) -> Result<FocusArea, ApiError> {
        self.enter(Call::Save).await?;
        self.store.save(area.clone()).map_err(store_error)
    }

    async fn delete_focus_area(&self, area_id: &FocusAreaId) -> Result<Vec<FocusArea>, ApiError> {
        self.enter(Call::Delete).await?;
        self.store.delete(area_id).map_err(store_error)
    }

    async fn set_program_focus_areas(
        &self,
        program_id: &ProgramId,
        focus_area_ids: &[FocusAreaId],
    ) -> Result<Vec<FocusArea>, ApiError> {
        self.enter(Call::Selection).await?;
        self.store
            .set_selection(program_id, focus_area_ids)
            .map_err(store_error)
    }

    async fn update_evaluation(
        &self,
        focus_area_id: &FocusAreaId,
        config: &EvaluationConfig,
    ) -> Result<EvaluationConfig, ApiError> {
        self.enter(Call::Evaluation).await?;
        self.store
            .update_evaluation(focus_area_id, config.clone())
            .map_err(store_error)
    }
}

pub(super) fn seeded_portal() -> (Arc<FakePortal>, Seeded) {
    let (store, seeded) = seeded_store();
    (Arc::new(FakePortal::with_store(store)), seeded)
}

pub(super) async fn loaded_coordinator() -> (
    FocusAreaCoordinator<FakePortal>,
    Arc<FakePortal>,
    Seeded,
) {
    let (portal, seeded) = seeded_portal();
    let coordinator = FocusAreaCoordinator::new(portal.clone(), program_id());
    coordinator.reconcile().await.expect("initial load");
    portal.reset_calls();
    (coordinator, portal, seeded)
}

pub(super) fn find_area<'a>(areas: &'a [FocusArea], target: &FocusAreaId) -> Option<&'a FocusArea> {
    areas.iter().find_map(|area| {
        if area.id.as_ref() == Some(target) {
            Some(area)
        } else {
            area.children
                .iter()
                .find(|child| child.id.as_ref() == Some(target))
        }
    })
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
