use focus_engine::focus_areas::{
    EvaluationConfig, FocusAreaDraft, FocusAreaId, FocusAreaStore, InMemoryFocusAreaStore,
    ProgramId, StoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) const DEMO_PROGRAM_ID: &str = "coaching-essentials";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory portal with two parent focus areas, their children, and one selection.
///
/// Only Communication carries stored evaluation settings so clients see both stored and
/// defaulted configs.
pub(crate) fn seed_store(program_id: ProgramId) -> Result<InMemoryFocusAreaStore, StoreError> {
    let store = InMemoryFocusAreaStore::new();
    store.add_program(program_id.clone(), "Coaching Essentials");

    let save = |draft: FocusAreaDraft| -> Result<FocusAreaId, StoreError> {
        let payload = draft
            .into_payload()
            .map_err(|errors| StoreError::Invalid(errors.to_string()))?;
        store
            .save(payload)?
            .id
            .ok_or_else(|| StoreError::Invalid("stored focus area has no id".to_string()))
    };

    let leadership = save(FocusAreaDraft::new_parent(program_id.clone(), "Leadership"))?;
    let communication = save(FocusAreaDraft::new_parent(program_id.clone(), "Communication"))?;
    for name in ["Delegation", "Giving Feedback", "Setting Direction"] {
        save(FocusAreaDraft::new_child(
            program_id.clone(),
            leadership.clone(),
            name,
        ))?;
    }
    for name in ["Active Listening", "Presenting Ideas"] {
        save(FocusAreaDraft::new_child(
            program_id.clone(),
            communication.clone(),
            name,
        ))?;
    }

    store.update_evaluation(
        &communication,
        EvaluationConfig {
            focus_area_id: None,
            min_score: 0,
            max_score: 5,
            threshold1: 1,
            threshold2: 2,
            threshold3: 4,
        },
    )?;
    store.set_selection(&program_id, &[leadership])?;
    Ok(store)
}
