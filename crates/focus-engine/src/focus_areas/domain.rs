use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned identifier of a focus area.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FocusAreaId(pub String);

impl fmt::Display for FocusAreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the coaching program a focus area list belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub String);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scoring band definition for one focus area.
///
/// A persisted config satisfies `min_score < threshold1 < threshold2 < threshold3 <= max_score`.
/// `focus_area_id` is the owning node when the server echoes it back; it is not part of the
/// band definition and takes no part in validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_area_id: Option<FocusAreaId>,
    pub min_score: i32,
    pub max_score: i32,
    pub threshold1: i32,
    pub threshold2: i32,
    pub threshold3: i32,
}

impl EvaluationConfig {
    pub const DEFAULT_MIN_SCORE: i32 = -1;
    pub const DEFAULT_MAX_SCORE: i32 = 10;
    pub const DEFAULT_THRESHOLDS: [i32; 3] = [2, 4, 6];

    /// The configuration injected wherever a node arrives without one.
    pub fn default_for(focus_area_id: Option<FocusAreaId>) -> Self {
        let [threshold1, threshold2, threshold3] = Self::DEFAULT_THRESHOLDS;
        Self {
            focus_area_id,
            min_score: Self::DEFAULT_MIN_SCORE,
            max_score: Self::DEFAULT_MAX_SCORE,
            threshold1,
            threshold2,
            threshold3,
        }
    }

    pub fn thresholds(&self) -> [i32; 3] {
        [self.threshold1, self.threshold2, self.threshold3]
    }

    /// Same bands, regardless of which node the config was echoed for.
    pub fn same_bands(&self, other: &EvaluationConfig) -> bool {
        self.min_score == other.min_score
            && self.max_score == other.max_score
            && self.thresholds() == other.thresholds()
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self::default_for(None)
    }
}

/// A competency area a program can be scored against, exactly as the portal API ships it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusArea {
    pub id: Option<FocusAreaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<ProgramId>,
    pub name: String,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub criteria: Option<String>,
    #[serde(default)]
    pub is_parent: bool,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parent_id: Option<FocusAreaId>,
    #[serde(default)]
    pub children: Vec<FocusArea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval: Option<EvaluationConfig>,
}

impl FocusArea {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// The slice of the program record the focus area screens read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: ProgramId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub focus_areas: Vec<FocusArea>,
}

/// Request body for replacing a program's selected focus areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusAreaSelection {
    pub focus_area_ids: Vec<FocusAreaId>,
}

/// Parent ids arrive as `null`, `""`, or absent for top-level nodes.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<FocusAreaId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(FocusAreaId))
}
