use serde::{Deserialize, Serialize};

use super::super::domain::EvaluationConfig;

/// Named band a score falls into, worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Poor,
    Fair,
    Good,
    VeryGood,
    Excellent,
}

impl PerformanceLevel {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Poor,
            Self::Fair,
            Self::Good,
            Self::VeryGood,
            Self::Excellent,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Poor => "Poor",
            Self::Fair => "Fair",
            Self::Good => "Good",
            Self::VeryGood => "Very Good",
            Self::Excellent => "Excellent",
        }
    }

    /// Severity colour token used by report chips.
    pub const fn color(self) -> &'static str {
        match self {
            Self::Poor => "error",
            Self::Fair => "warning",
            Self::Good => "info",
            Self::VeryGood => "primary",
            Self::Excellent => "success",
        }
    }

    /// Display weight, 1 (Poor) through 5 (Excellent).
    pub const fn weight(self) -> u8 {
        match self {
            Self::Poor => 1,
            Self::Fair => 2,
            Self::Good => 3,
            Self::VeryGood => 4,
            Self::Excellent => 5,
        }
    }
}

/// Fixed 0-10 display scale applied to raw question and answer scores.
///
/// Ignores any per-node thresholds. NaN has no nearest band and lands in `Poor`.
pub fn classify_fixed(score: f64) -> PerformanceLevel {
    if score.is_nan() || score < 2.0 {
        PerformanceLevel::Poor
    } else if score < 4.0 {
        PerformanceLevel::Fair
    } else if score < 6.0 {
        PerformanceLevel::Good
    } else if score < 8.0 {
        PerformanceLevel::VeryGood
    } else {
        PerformanceLevel::Excellent
    }
}

/// Four-band classification against a node's own thresholds.
///
/// Scores below `min_score` clamp into `Poor`, scores above `max_score` into `Excellent`.
/// `VeryGood` is never produced here.
pub fn classify_configured(score: f64, config: &EvaluationConfig) -> PerformanceLevel {
    if score.is_nan() || score <= f64::from(config.threshold1) {
        PerformanceLevel::Poor
    } else if score <= f64::from(config.threshold2) {
        PerformanceLevel::Fair
    } else if score <= f64::from(config.threshold3) {
        PerformanceLevel::Good
    } else {
        PerformanceLevel::Excellent
    }
}

/// One row of a node's performance-level legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendBand {
    pub level: PerformanceLevel,
    /// Lower bound; exclusive for every band but the first.
    pub from: i32,
    pub from_inclusive: bool,
    /// Upper bound, always inclusive.
    pub to: i32,
}

impl LegendBand {
    pub fn describe(&self) -> String {
        let open = if self.from_inclusive { '[' } else { '(' };
        format!("{} {}{}, {}]", self.level.label(), open, self.from, self.to)
    }
}

pub fn legend(config: &EvaluationConfig) -> [LegendBand; 4] {
    let band = |level, from, from_inclusive, to| LegendBand {
        level,
        from,
        from_inclusive,
        to,
    };
    [
        band(PerformanceLevel::Poor, config.min_score, true, config.threshold1),
        band(
            PerformanceLevel::Fair,
            config.threshold1,
            false,
            config.threshold2,
        ),
        band(
            PerformanceLevel::Good,
            config.threshold2,
            false,
            config.threshold3,
        ),
        band(
            PerformanceLevel::Excellent,
            config.threshold3,
            false,
            config.max_score,
        ),
    ]
}
