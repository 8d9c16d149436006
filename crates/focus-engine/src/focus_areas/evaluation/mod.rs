//! Scoring bands for focus areas: threshold validation, slider ranges, and the two
//! performance-level classifiers.
//!
//! The fixed 0-10 classifier and the per-node legend classifier use different bands for
//! different screens.

mod classifier;
mod thresholds;

pub use classifier::{classify_configured, classify_fixed, legend, LegendBand, PerformanceLevel};
pub use thresholds::{
    is_valid, legal_range, validate, EvaluationDraft, EvaluationErrors, EvaluationField,
    ScoreRange, ThresholdRanges,
};
