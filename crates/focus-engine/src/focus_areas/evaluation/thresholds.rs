use serde::{Deserialize, Serialize};

use super::super::domain::{EvaluationConfig, FocusAreaId};
use super::super::fields::FieldErrors;

/// Editable fields of an evaluation config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvaluationField {
    MinScore,
    MaxScore,
    Threshold1,
    Threshold2,
    Threshold3,
}

impl EvaluationField {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::MinScore,
            Self::MaxScore,
            Self::Threshold1,
            Self::Threshold2,
            Self::Threshold3,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::MinScore => "Min Score",
            Self::MaxScore => "Max Score",
            Self::Threshold1 => "Threshold 1",
            Self::Threshold2 => "Threshold 2",
            Self::Threshold3 => "Threshold 3",
        }
    }

    pub const fn is_threshold(self) -> bool {
        matches!(self, Self::Threshold1 | Self::Threshold2 | Self::Threshold3)
    }
}

pub type EvaluationErrors = FieldErrors<EvaluationField>;

/// Working copy of an evaluation config while the user is typing; any field may be blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDraft {
    pub min_score: Option<i32>,
    pub max_score: Option<i32>,
    pub threshold1: Option<i32>,
    pub threshold2: Option<i32>,
    pub threshold3: Option<i32>,
}

impl EvaluationDraft {
    pub fn get(&self, field: EvaluationField) -> Option<i32> {
        match field {
            EvaluationField::MinScore => self.min_score,
            EvaluationField::MaxScore => self.max_score,
            EvaluationField::Threshold1 => self.threshold1,
            EvaluationField::Threshold2 => self.threshold2,
            EvaluationField::Threshold3 => self.threshold3,
        }
    }

    pub fn set(&mut self, field: EvaluationField, value: Option<i32>) {
        let slot = match field {
            EvaluationField::MinScore => &mut self.min_score,
            EvaluationField::MaxScore => &mut self.max_score,
            EvaluationField::Threshold1 => &mut self.threshold1,
            EvaluationField::Threshold2 => &mut self.threshold2,
            EvaluationField::Threshold3 => &mut self.threshold3,
        };
        *slot = value;
    }

    /// Blank min/max fall back to the default score range for bound computation.
    fn score_bounds(&self) -> (i32, i32) {
        (
            self.min_score.unwrap_or(EvaluationConfig::DEFAULT_MIN_SCORE),
            self.max_score.unwrap_or(EvaluationConfig::DEFAULT_MAX_SCORE),
        )
    }

    pub fn validate(&self) -> EvaluationErrors {
        let mut errors = EvaluationErrors::default();
        for field in EvaluationField::ordered() {
            if self.get(field).is_none() {
                errors.add(field, format!("{} is required", field.label()));
            }
        }
        check_ordering(self, &mut errors);
        errors
    }

    /// Complete config, or `None` while any field is blank.
    pub fn to_config(&self, focus_area_id: Option<FocusAreaId>) -> Option<EvaluationConfig> {
        Some(EvaluationConfig {
            focus_area_id,
            min_score: self.min_score?,
            max_score: self.max_score?,
            threshold1: self.threshold1?,
            threshold2: self.threshold2?,
            threshold3: self.threshold3?,
        })
    }
}

impl From<&EvaluationConfig> for EvaluationDraft {
    fn from(config: &EvaluationConfig) -> Self {
        Self {
            min_score: Some(config.min_score),
            max_score: Some(config.max_score),
            threshold1: Some(config.threshold1),
            threshold2: Some(config.threshold2),
            threshold3: Some(config.threshold3),
        }
    }
}

/// Check the ordering invariant, reporting every violated rule at once.
pub fn validate(config: &EvaluationConfig) -> EvaluationErrors {
    let mut errors = EvaluationErrors::default();
    check_ordering(&EvaluationDraft::from(config), &mut errors);
    errors
}

pub fn is_valid(config: &EvaluationConfig) -> bool {
    validate(config).is_empty()
}

// Each rule only fires when both of its operands are present.
fn check_ordering(draft: &EvaluationDraft, errors: &mut EvaluationErrors) {
    if let (Some(t1), Some(t2)) = (draft.threshold1, draft.threshold2) {
        if t1 >= t2 {
            errors.add(
                EvaluationField::Threshold1,
                "Threshold 1 must be less than Threshold 2",
            );
        }
    }
    if let (Some(t2), Some(t3)) = (draft.threshold2, draft.threshold3) {
        if t2 >= t3 {
            errors.add(
                EvaluationField::Threshold2,
                "Threshold 2 must be less than Threshold 3",
            );
        }
    }
    if let (Some(t3), Some(max)) = (draft.threshold3, draft.max_score) {
        if t3 > max {
            errors.add(
                EvaluationField::Threshold3,
                "Threshold 3 must be less than or equal to Max Score",
            );
        }
    }
    if let (Some(min), Some(t1)) = (draft.min_score, draft.threshold1) {
        if min >= t1 {
            errors.add(
                EvaluationField::MinScore,
                "Min Score must be less than Threshold 1",
            );
        }
    }
}

/// Inclusive input bounds for one threshold field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: i32,
    pub max: i32,
}

impl ScoreRange {
    /// Collapses an inverted pair onto `min`; only reachable with a degenerate score span.
    fn new(min: i32, max: i32) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }
}

/// Slider bounds for all three thresholds at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdRanges {
    pub threshold1: ScoreRange,
    pub threshold2: ScoreRange,
    pub threshold3: ScoreRange,
}

impl ThresholdRanges {
    pub fn compute(draft: &EvaluationDraft) -> Self {
        let (min, max) = draft.score_bounds();
        Self {
            threshold1: threshold1_range(min, max, draft.threshold2),
            threshold2: threshold2_range(min, max, draft.threshold1, draft.threshold3),
            threshold3: threshold3_range(min, max, draft.threshold2),
        }
    }

    pub fn get(&self, field: EvaluationField) -> Option<ScoreRange> {
        match field {
            EvaluationField::Threshold1 => Some(self.threshold1),
            EvaluationField::Threshold2 => Some(self.threshold2),
            EvaluationField::Threshold3 => Some(self.threshold3),
            EvaluationField::MinScore | EvaluationField::MaxScore => None,
        }
    }
}

/// Legal input range for `field` with every other field held fixed.
///
/// Min and max scores are free-form inputs and have no derived range.
pub fn legal_range(draft: &EvaluationDraft, field: EvaluationField) -> Option<ScoreRange> {
    ThresholdRanges::compute(draft).get(field)
}

// A neighbour-derived bound is used only when it leaves a non-empty span; otherwise the
// fixed fallback derived from the score range applies.

fn threshold1_range(min: i32, max: i32, threshold2: Option<i32>) -> ScoreRange {
    let lower = min.saturating_add(1);
    let upper = match threshold2.map(|t2| t2.saturating_sub(1)) {
        Some(candidate) if candidate > lower => candidate,
        _ => max.saturating_sub(2),
    };
    ScoreRange::new(lower, upper)
}

fn threshold2_range(
    min: i32,
    max: i32,
    threshold1: Option<i32>,
    threshold3: Option<i32>,
) -> ScoreRange {
    let fallback_lower = min.saturating_add(2);
    let fallback_upper = max.saturating_sub(1);

    let lower = threshold1.map_or(fallback_lower, |t1| t1.saturating_add(1));
    let upper = threshold3.map_or(fallback_upper, |t3| t3.saturating_sub(1));
    if upper > lower {
        ScoreRange::new(lower, upper)
    } else {
        ScoreRange::new(fallback_lower, fallback_upper)
    }
}

fn threshold3_range(min: i32, max: i32, threshold2: Option<i32>) -> ScoreRange {
    let lower = match threshold2.map(|t2| t2.saturating_add(1)) {
        Some(candidate) if max > candidate => candidate,
        _ => min.saturating_add(3),
    };
    ScoreRange::new(lower, max)
}
