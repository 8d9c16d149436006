use serde::{Deserialize, Serialize};

use super::domain::{FocusArea, FocusAreaId, ProgramId};
use super::fields::FieldErrors;

pub const OBJECTIVE_PLACEHOLDER: &str = "Focus area objective will be added later";
pub const DESCRIPTION_PLACEHOLDER: &str = "Focus area description will be added later";
pub const CRITERIA_PLACEHOLDER: &str = "Focus area criteria will be added later";

/// Fields of the create/edit focus area form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
    Name,
    ParentId,
}

pub type DraftErrors = FieldErrors<DraftField>;

/// Form data for creating (no `id`) or editing a focus area.
///
/// Rich text is only editable once the node exists, so creation submits placeholders for
/// objective, description, and criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusAreaDraft {
    #[serde(default)]
    pub id: Option<FocusAreaId>,
    #[serde(default)]
    pub program_id: Option<ProgramId>,
    pub name: String,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub criteria: Option<String>,
    #[serde(default)]
    pub is_parent: Option<bool>,
    #[serde(default)]
    pub parent_id: Option<FocusAreaId>,
}

impl FocusAreaDraft {
    pub fn new_parent(program_id: ProgramId, name: impl Into<String>) -> Self {
        Self {
            program_id: Some(program_id),
            name: name.into(),
            is_parent: Some(true),
            ..Self::default()
        }
    }

    pub fn new_child(program_id: ProgramId, parent_id: FocusAreaId, name: impl Into<String>) -> Self {
        Self {
            program_id: Some(program_id),
            name: name.into(),
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }

    /// Prefill an edit form from an existing node.
    pub fn editing(area: &FocusArea) -> Self {
        Self {
            id: area.id.clone(),
            program_id: area.program_id.clone(),
            name: area.name.clone(),
            objective: area.objective.clone(),
            description: area.description.clone(),
            criteria: area.criteria.clone(),
            is_parent: Some(area.is_parent),
            parent_id: area.parent_id.clone(),
        }
    }

    pub fn is_create(&self) -> bool {
        self.id.is_none()
    }

    /// Parent status is implied by `parent_id` when not given explicitly.
    pub fn resolved_is_parent(&self) -> bool {
        self.is_parent.unwrap_or(self.parent_id.is_none())
    }

    pub fn validate(&self) -> DraftErrors {
        let mut errors = DraftErrors::default();
        if self.name.trim().is_empty() {
            errors.add(DraftField::Name, "Name is required");
        }
        match (self.resolved_is_parent(), &self.parent_id) {
            (true, Some(_)) => {
                errors.add(
                    DraftField::ParentId,
                    "A parent focus area cannot belong to another parent",
                );
            }
            (false, None) => {
                errors.add(DraftField::ParentId, "Select a parent focus area");
            }
            _ => {}
        }
        if let (Some(id), Some(parent_id)) = (&self.id, &self.parent_id) {
            if id == parent_id {
                errors.add(DraftField::ParentId, "A focus area cannot be its own parent");
            }
        }
        errors
    }

    /// Validated request body for the create/update endpoint.
    pub fn into_payload(self) -> Result<FocusArea, DraftErrors> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let is_parent = self.resolved_is_parent();
        let creating = self.is_create();
        let text = |value: Option<String>, placeholder: &str| {
            if creating {
                Some(placeholder.to_string())
            } else {
                value
            }
        };

        Ok(FocusArea {
            objective: text(self.objective, OBJECTIVE_PLACEHOLDER),
            description: text(self.description, DESCRIPTION_PLACEHOLDER),
            criteria: text(self.criteria, CRITERIA_PLACEHOLDER),
            id: self.id,
            program_id: self.program_id,
            name: self.name.trim().to_string(),
            is_parent,
            parent_id: if is_parent { None } else { self.parent_id },
            children: Vec::new(),
            eval: None,
        })
    }
}
