use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::domain::{EvaluationConfig, FocusArea, FocusAreaId, Program, ProgramId};
use super::evaluation::{self, EvaluationErrors};

/// Server-side storage for focus areas and program selections.
pub trait FocusAreaStore: Send + Sync {
    /// Top-level focus areas of a program with their children nested.
    fn list(&self, program_id: &ProgramId) -> Result<Vec<FocusArea>, StoreError>;
    fn program(&self, program_id: &ProgramId) -> Result<Program, StoreError>;
    /// Create when `id` is absent, otherwise update the descriptive fields.
    fn save(&self, area: FocusArea) -> Result<FocusArea, StoreError>;
    /// Remove a focus area, its children, and any selection of them; returns what is left
    /// of the owning program's list.
    fn delete(&self, id: &FocusAreaId) -> Result<Vec<FocusArea>, StoreError>;
    fn set_selection(
        &self,
        program_id: &ProgramId,
        ids: &[FocusAreaId],
    ) -> Result<Vec<FocusArea>, StoreError>;
    fn update_evaluation(
        &self,
        id: &FocusAreaId,
        config: EvaluationConfig,
    ) -> Result<EvaluationConfig, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("program {0} not found")]
    ProgramNotFound(ProgramId),
    #[error("focus area {0} not found")]
    NotFound(FocusAreaId),
    #[error("focus area {0} is not a top-level parent")]
    InvalidParent(FocusAreaId),
    #[error("invalid focus area: {0}")]
    Invalid(String),
    #[error("invalid evaluation settings: {0}")]
    InvalidEvaluation(EvaluationErrors),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
struct StoredProgram {
    name: String,
    selected: Vec<FocusAreaId>,
}

#[derive(Debug, Default)]
struct StoreState {
    programs: BTreeMap<ProgramId, StoredProgram>,
    /// Flat, in creation order; `children` is always empty here.
    areas: Vec<FocusArea>,
    sequence: u64,
}

impl StoreState {
    fn position(&self, id: &FocusAreaId) -> Option<usize> {
        self.areas
            .iter()
            .position(|area| area.id.as_ref() == Some(id))
    }

    fn find(&self, id: &FocusAreaId) -> Option<&FocusArea> {
        self.position(id).map(|index| &self.areas[index])
    }

    fn next_id(&mut self) -> FocusAreaId {
        self.sequence += 1;
        FocusAreaId(format!("fa-{:06}", self.sequence))
    }

    fn nested(&self, area: &FocusArea) -> FocusArea {
        let mut area = area.clone();
        if area.is_parent {
            area.children = self
                .areas
                .iter()
                .filter(|child| child.parent_id.is_some() && child.parent_id == area.id)
                .cloned()
                .collect();
        }
        area
    }

    fn list(&self, program_id: &ProgramId) -> Vec<FocusArea> {
        self.areas
            .iter()
            .filter(|area| area.program_id.as_ref() == Some(program_id))
            .filter(|area| area.parent_id.is_none())
            .map(|area| self.nested(area))
            .collect()
    }

    fn selected(&self, program_id: &ProgramId) -> Result<Vec<FocusArea>, StoreError> {
        let program = self
            .programs
            .get(program_id)
            .ok_or_else(|| StoreError::ProgramNotFound(program_id.clone()))?;
        Ok(program
            .selected
            .iter()
            .filter_map(|id| self.find(id))
            .map(|area| self.nested(area))
            .collect())
    }

    fn check_parent(&self, parent_id: &FocusAreaId) -> Result<(), StoreError> {
        match self.find(parent_id) {
            Some(parent) if parent.is_parent && parent.parent_id.is_none() => Ok(()),
            Some(_) => Err(StoreError::InvalidParent(parent_id.clone())),
            None => Err(StoreError::NotFound(parent_id.clone())),
        }
    }
}

/// Mutex-guarded store used by the bundled server and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFocusAreaStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryFocusAreaStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a program so focus areas can be attached to it.
    pub fn add_program(&self, program_id: ProgramId, name: impl Into<String>) {
        self.state().programs.insert(
            program_id,
            StoredProgram {
                name: name.into(),
                selected: Vec::new(),
            },
        );
    }
}

impl FocusAreaStore for InMemoryFocusAreaStore {
    fn list(&self, program_id: &ProgramId) -> Result<Vec<FocusArea>, StoreError> {
        let state = self.state();
        if !state.programs.contains_key(program_id) {
            return Err(StoreError::ProgramNotFound(program_id.clone()));
        }
        Ok(state.list(program_id))
    }

    fn program(&self, program_id: &ProgramId) -> Result<Program, StoreError> {
        let state = self.state();
        let focus_areas = state.selected(program_id)?;
        let name = state
            .programs
            .get(program_id)
            .map(|program| program.name.clone())
            .unwrap_or_default();
        Ok(Program {
            id: program_id.clone(),
            name,
            focus_areas,
        })
    }

    fn save(&self, mut area: FocusArea) -> Result<FocusArea, StoreError> {
        let mut state = self.state();

        area.name = area.name.trim().to_string();
        if area.name.is_empty() {
            return Err(StoreError::Invalid("name is required".to_string()));
        }
        if area.is_parent && area.parent_id.is_some() {
            return Err(StoreError::Invalid(
                "a parent focus area cannot have a parent".to_string(),
            ));
        }
        if !area.is_parent && area.parent_id.is_none() {
            return Err(StoreError::Invalid(
                "a child focus area needs a parent".to_string(),
            ));
        }
        if let Some(parent_id) = &area.parent_id {
            if area.id.as_ref() == Some(parent_id) {
                return Err(StoreError::Invalid(
                    "a focus area cannot be its own parent".to_string(),
                ));
            }
            state.check_parent(parent_id)?;
        }
        area.children.clear();

        let stored = match area.id.clone() {
            None => {
                let program_id = area
                    .program_id
                    .clone()
                    .ok_or_else(|| StoreError::Invalid("programId is required".to_string()))?;
                if !state.programs.contains_key(&program_id) {
                    return Err(StoreError::ProgramNotFound(program_id));
                }
                if let Some(parent_id) = &area.parent_id {
                    let parent_program = state
                        .find(parent_id)
                        .and_then(|parent| parent.program_id.clone());
                    if parent_program.as_ref() != Some(&program_id) {
                        return Err(StoreError::InvalidParent(parent_id.clone()));
                    }
                }
                area.id = Some(state.next_id());
                // Evaluation settings have their own endpoint; new nodes start without.
                area.eval = None;
                state.areas.push(area.clone());
                area
            }
            Some(id) => {
                let index = state
                    .position(&id)
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                let has_children = state
                    .areas
                    .iter()
                    .any(|other| other.parent_id.as_ref() == Some(&id));
                if !area.is_parent && has_children {
                    return Err(StoreError::Invalid(
                        "a focus area with children must stay a parent".to_string(),
                    ));
                }

                let existing = &mut state.areas[index];
                existing.name = area.name;
                existing.objective = area.objective;
                existing.description = area.description;
                existing.criteria = area.criteria;
                existing.is_parent = area.is_parent;
                existing.parent_id = area.parent_id;
                let updated = existing.clone();

                if !updated.is_parent || updated.parent_id.is_some() {
                    for program in state.programs.values_mut() {
                        program.selected.retain(|selected| selected != &id);
                    }
                }
                updated
            }
        };

        Ok(state.nested(&stored))
    }

    fn delete(&self, id: &FocusAreaId) -> Result<Vec<FocusArea>, StoreError> {
        let mut state = self.state();
        let target = state
            .find(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let mut removed: HashSet<FocusAreaId> = HashSet::new();
        removed.insert(id.clone());
        for area in &state.areas {
            if area.parent_id.as_ref() == Some(id) {
                if let Some(child_id) = &area.id {
                    removed.insert(child_id.clone());
                }
            }
        }

        state
            .areas
            .retain(|area| area.id.as_ref().map_or(true, |area_id| !removed.contains(area_id)));
        for program in state.programs.values_mut() {
            program.selected.retain(|selected| !removed.contains(selected));
        }

        Ok(match &target.program_id {
            Some(program_id) => state.list(program_id),
            None => Vec::new(),
        })
    }

    fn set_selection(
        &self,
        program_id: &ProgramId,
        ids: &[FocusAreaId],
    ) -> Result<Vec<FocusArea>, StoreError> {
        let mut state = self.state();
        if !state.programs.contains_key(program_id) {
            return Err(StoreError::ProgramNotFound(program_id.clone()));
        }

        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for id in ids {
            let area = state.find(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
            if !area.is_parent
                || area.parent_id.is_some()
                || area.program_id.as_ref() != Some(program_id)
            {
                return Err(StoreError::InvalidParent(id.clone()));
            }
            if seen.insert(id.clone()) {
                selected.push(id.clone());
            }
        }

        if let Some(program) = state.programs.get_mut(program_id) {
            program.selected = selected;
        }
        state.selected(program_id)
    }

    fn update_evaluation(
        &self,
        id: &FocusAreaId,
        mut config: EvaluationConfig,
    ) -> Result<EvaluationConfig, StoreError> {
        let errors = evaluation::validate(&config);
        if !errors.is_empty() {
            return Err(StoreError::InvalidEvaluation(errors));
        }

        let mut state = self.state();
        let index = state
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        config.focus_area_id = Some(id.clone());
        state.areas[index].eval = Some(config.clone());
        Ok(config)
    }
}
