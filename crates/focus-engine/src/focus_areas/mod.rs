//! Focus area hierarchy for coaching programs.
//!
//! Covers the two-level tree and its evaluation thresholds, the settings editor, the
//! coordinator that keeps the organization list and a program's selection in step with the
//! portal, and a portal-compatible router for serving the same endpoints.

pub mod api;
pub mod client;
pub mod domain;
pub mod draft;
pub mod editor;
pub mod evaluation;
mod fields;
pub mod repository;
pub mod router;
pub mod sync;
pub mod tree;

#[cfg(test)]
mod tests;

pub use api::{ApiError, FocusAreaApi};
pub use client::HttpFocusAreaApi;
pub use domain::{
    EvaluationConfig, FocusArea, FocusAreaId, FocusAreaSelection, Program, ProgramId,
};
pub use draft::{
    DraftErrors, DraftField, FocusAreaDraft, CRITERIA_PLACEHOLDER, DESCRIPTION_PLACEHOLDER,
    OBJECTIVE_PLACEHOLDER,
};
pub use editor::{EditorError, EditorState, EvaluationEditor, SaveRequest};
pub use evaluation::{
    classify_configured, classify_fixed, legal_range, legend, validate, EvaluationDraft,
    EvaluationErrors, EvaluationField, LegendBand, PerformanceLevel, ScoreRange,
    ThresholdRanges,
};
pub use fields::FieldErrors;
pub use repository::{FocusAreaStore, InMemoryFocusAreaStore, StoreError};
pub use router::focus_area_router;
pub use sync::{
    CoordinatorError, FocusAreaCoordinator, InFlightKey, MutationAction, Notification,
    NotificationSeverity, ReconcileError,
};
pub use tree::{normalize, select_top_level, FocusAreaNode, FocusAreaTree};
