use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported when danger-field tuning cannot drive a rebuild.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TuningError {
    /// A value that must be positive was zero or negative.
    #[error("{field} must be positive, found {value}")]
    NotPositive {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: i64,
    },
    /// A value that may be zero was negative.
    #[error("{field} must not be negative, found {value}")]
    Negative {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: i64,
    },
    /// The neutral fallback lies above the score ceiling.
    #[error("neutral_score ({neutral}) exceeds score_ceiling ({ceiling})")]
    NeutralAboveCeiling {
        /// Neutral score that was supplied.
        neutral: u32,
        /// Ceiling that was supplied.
        ceiling: u32,
    },
}

/// Knobs controlling how often danger fields are rebuilt and how they are scored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DangerFieldTuning {
    /// Time between periodic rebuilds, in milliseconds.
    pub rebuild_interval_ms: u64,
    /// Cells added around the entity bounding box before searching.
    pub bounds_margin: i32,
    /// Frontier cells processed per step before the builder suspends.
    pub nodes_per_step: usize,
    /// Largest score reported by queries, or `None` for raw distances.
    pub score_ceiling: Option<u32>,
    /// Score reported when no measurement exists for a cell.
    pub neutral_score: u32,
}

impl Default for DangerFieldTuning {
    fn default() -> Self {
        Self {
            rebuild_interval_ms: 5_000,
            bounds_margin: 32,
            nodes_per_step: 4_096,
            score_ceiling: Some(100),
            neutral_score: 50,
        }
    }
}

impl DangerFieldTuning {
    /// Checks that every value can drive a rebuild.
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.rebuild_interval_ms == 0 {
            return Err(TuningError::NotPositive {
                field: "rebuild_interval_ms",
                value: 0,
            });
        }
        if self.bounds_margin < 0 {
            return Err(TuningError::Negative {
                field: "bounds_margin",
                value: i64::from(self.bounds_margin),
            });
        }
        if self.nodes_per_step == 0 {
            return Err(TuningError::NotPositive {
                field: "nodes_per_step",
                value: 0,
            });
        }
        if let Some(ceiling) = self.score_ceiling {
            if ceiling == 0 {
                return Err(TuningError::NotPositive {
                    field: "score_ceiling",
                    value: 0,
                });
            }
            if self.neutral_score > ceiling {
                return Err(TuningError::NeutralAboveCeiling {
                    neutral: self.neutral_score,
                    ceiling,
                });
            }
        }
        Ok(())
    }

    /// Interval between periodic rebuilds.
    #[must_use]
    pub const fn rebuild_interval(&self) -> Duration {
        Duration::from_millis(self.rebuild_interval_ms)
    }
}
